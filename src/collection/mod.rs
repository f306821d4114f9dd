//! Collection synchronization engine and its browse pipeline.

pub mod cache;
pub mod discogs_client;
pub mod error;
pub mod facets;
pub mod favorites;
pub mod filter;
pub mod live;
pub mod models;
pub mod paginator;
pub mod render;
pub mod retry;
pub mod source;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{CollectionCache, DEFAULT_CACHE_TTL};
pub use discogs_client::{DiscogsClient, DiscogsSettings};
pub use error::{CollectionError, FavoritesStoreError};
pub use facets::{FacetSet, SampledFacets};
pub use favorites::{
    FavoriteSet, FavoritesReconciler, FavoritesStore, FileFavoritesStore, MemoryFavoritesStore,
    RemoteFavoritesStore,
};
pub use filter::{FilterState, SortKey};
pub use live::{LiveCollection, LiveSnapshot, SyncProgress, SyncState};
pub use models::{CollectionPage, CollectionSnapshot, PaginationCursor, ReleaseDetail, ReleaseRecord};
pub use paginator::Paginator;
pub use render::{RenderEvent, RenderFrame, ViewSession};
pub use retry::RetryPolicy;
pub use source::CollectionSource;
