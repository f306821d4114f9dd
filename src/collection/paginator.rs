//! Sequential walk over the paged collection listing.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use super::error::CollectionError;
use super::models::{CollectionPage, CollectionSnapshot, PaginationCursor, ReleaseDetail, ReleaseRecord};
use super::retry::{fetch_with_retry, RetryPolicy};
use super::source::CollectionSource;

/// Records requested per upstream page; the remote catalog caps it at 100.
pub const DEFAULT_PER_PAGE: u32 = 100;
pub const MAX_PER_PAGE: u32 = 100;
/// Pause between two page requests to stay under the upstream rate limit.
pub const DEFAULT_PAGE_PAUSE: Duration = Duration::from_millis(140);

/// Drives page-by-page retrieval of the collection through the retry policy.
#[derive(Clone)]
pub struct Paginator {
    source: Arc<dyn CollectionSource>,
    retry: RetryPolicy,
    per_page: u32,
    page_pause: Duration,
}

impl Paginator {
    pub fn new(
        source: Arc<dyn CollectionSource>,
        retry: RetryPolicy,
        per_page: u32,
        page_pause: Duration,
    ) -> Self {
        Self {
            source,
            retry,
            per_page: per_page.clamp(1, MAX_PER_PAGE),
            page_pause,
        }
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Fetch and normalize a single page.
    pub async fn fetch_page(&self, page: u32, per_page: u32) -> Result<CollectionPage, CollectionError> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, MAX_PER_PAGE);
        let raw = fetch_with_retry(&self.retry, &format!("Collection page {}", page), |_| {
            self.source.fetch_collection_page(page, per_page)
        })
        .await?;
        Ok(raw.into_page())
    }

    /// Fetch the detail of one release.
    pub async fn fetch_release(&self, release_id: &str) -> Result<ReleaseDetail, CollectionError> {
        fetch_with_retry(&self.retry, &format!("Release {}", release_id), |_| {
            self.source.fetch_release(release_id)
        })
        .await
    }

    /// Retrieve the whole collection.
    pub async fn sync_all(&self) -> Result<CollectionSnapshot, CollectionError> {
        self.sync_pages(None, |_, _| {}).await
    }

    /// Walk pages `1..` in order, calling `on_page` as soon as each page is
    /// normalized.
    ///
    /// The page count is re-read from every response. The walk stops after the
    /// last page, or after `max_pages` when given. Any page failing past its
    /// retries aborts the walk; nothing partial is returned.
    pub async fn sync_pages<F>(
        &self,
        max_pages: Option<u32>,
        mut on_page: F,
    ) -> Result<CollectionSnapshot, CollectionError>
    where
        F: FnMut(&[ReleaseRecord], &PaginationCursor),
    {
        let mut snapshot = CollectionSnapshot::new();
        let mut page = 1;

        loop {
            let raw = fetch_with_retry(&self.retry, &format!("Collection page {}", page), |_| {
                self.source.fetch_collection_page(page, self.per_page)
            })
            .await?;

            let records = raw.normalize();
            let cursor = PaginationCursor {
                current_page: page,
                ..raw.pagination
            };
            debug!(
                "Collection page {}/{}: {} records",
                page,
                cursor.total_pages,
                records.len()
            );

            on_page(&records, &cursor);
            snapshot.extend(records);

            let bounded = PaginationCursor {
                total_pages: max_pages.map_or(cursor.total_pages, |max| max.min(cursor.total_pages)),
                ..cursor
            };
            if !bounded.has_next() {
                break;
            }

            tokio::time::sleep(self.page_pause).await;
            page += 1;
        }

        info!("Fetched {} records over {} pages", snapshot.len(), page);
        Ok(snapshot)
    }
}
