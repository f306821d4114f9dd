use async_trait::async_trait;

use super::error::CollectionError;
use super::models::{RawCollectionPage, ReleaseDetail};

/// A remote catalog holding the user's collection.
///
/// Implementations issue exactly one request per call and never retry;
/// retrying is the caller's business (see [`super::retry`]).
#[async_trait]
pub trait CollectionSource: Send + Sync {
    /// Fetch one page of the collection (1-based).
    async fn fetch_collection_page(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<RawCollectionPage, CollectionError>;

    /// Fetch the full metadata of a single release.
    async fn fetch_release(&self, release_id: &str) -> Result<ReleaseDetail, CollectionError>;
}
