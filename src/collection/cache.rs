//! Time-bounded cache of the full collection snapshot.
//!
//! At most one synchronization runs at a time. Callers arriving while a sync
//! is in flight wait for it and share its outcome instead of starting another
//! one. A failed sync never replaces the last good snapshot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

use super::error::CollectionError;
use super::live::{LiveCollection, LiveSnapshot};
use super::models::CollectionSnapshot;
use super::paginator::Paginator;

/// Six hours.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(6 * 60 * 60);

struct CacheEntry {
    snapshot: Arc<CollectionSnapshot>,
    fetched_at: Instant,
    fetched_at_utc: DateTime<Utc>,
}

type RefreshResult = Result<Arc<CollectionSnapshot>, CollectionError>;

pub struct CollectionCache {
    paginator: Paginator,
    ttl: Duration,
    entry: RwLock<Option<CacheEntry>>,
    live: LiveCollection,
    /// Held for the whole duration of a sync.
    refresh_lock: tokio::sync::Mutex<()>,
    /// Number of completed sync attempts.
    generation: AtomicU64,
    last_outcome: Mutex<Option<RefreshResult>>,
}

impl CollectionCache {
    pub fn new(paginator: Paginator, ttl: Duration) -> Self {
        Self {
            paginator,
            ttl,
            entry: RwLock::new(None),
            live: LiveCollection::new(),
            refresh_lock: tokio::sync::Mutex::new(()),
            generation: AtomicU64::new(0),
            last_outcome: Mutex::new(None),
        }
    }

    pub fn paginator(&self) -> &Paginator {
        &self.paginator
    }

    pub fn live(&self) -> &LiveCollection {
        &self.live
    }

    /// Best readable view: the committed snapshot, or the partial one while
    /// the first sync is still running.
    pub fn readable(&self) -> LiveSnapshot {
        self.live.current()
    }

    /// Last committed snapshot, whatever its age.
    pub fn committed(&self) -> Option<Arc<CollectionSnapshot>> {
        self.read_entry(|entry| entry.snapshot.clone())
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.read_entry(|entry| entry.fetched_at_utc)
    }

    pub fn is_fresh(&self) -> bool {
        self.fresh_snapshot().is_some()
    }

    /// Whether a sync is currently running.
    pub fn is_refreshing(&self) -> bool {
        self.refresh_lock.try_lock().is_err()
    }

    fn read_entry<T>(&self, f: impl FnOnce(&CacheEntry) -> T) -> Option<T> {
        match self.entry.read() {
            Ok(guard) => guard.as_ref().map(f),
            Err(poisoned) => poisoned.into_inner().as_ref().map(f),
        }
    }

    fn fresh_snapshot(&self) -> Option<Arc<CollectionSnapshot>> {
        self.read_entry(|entry| {
            (entry.fetched_at.elapsed() < self.ttl).then(|| entry.snapshot.clone())
        })
        .flatten()
    }

    /// Return the cached snapshot if fresh, otherwise synchronize.
    ///
    /// With `force` the freshness check is skipped. Either way, a caller that
    /// finds a sync already running waits for it and returns its outcome.
    pub async fn get_or_refresh(&self, force: bool) -> RefreshResult {
        let observed = self.generation.load(Ordering::Acquire);
        if !force {
            if let Some(snapshot) = self.fresh_snapshot() {
                return Ok(snapshot);
            }
        }

        let _guard = self.refresh_lock.lock().await;

        if self.generation.load(Ordering::Acquire) != observed {
            let shared = self
                .last_outcome
                .lock()
                .ok()
                .and_then(|outcome| outcome.clone());
            if let Some(outcome) = shared {
                return outcome;
            }
        }
        if !force {
            if let Some(snapshot) = self.fresh_snapshot() {
                return Ok(snapshot);
            }
        }

        self.refresh_locked().await
    }

    /// Run [`get_or_refresh`](Self::get_or_refresh) on its own task, so the
    /// sync completes even if the caller goes away.
    pub async fn get_or_refresh_detached(self: &Arc<Self>, force: bool) -> RefreshResult {
        let cache = Arc::clone(self);
        match tokio::spawn(async move { cache.get_or_refresh(force).await }).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(CollectionError::Network(
                "Collection refresh was cancelled".to_string(),
            )),
        }
    }

    /// Start a background sync unless the snapshot is fresh or one is running.
    pub fn ensure_fresh_in_background(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.is_fresh() || self.is_refreshing() {
            return None;
        }
        let cache = Arc::clone(self);
        Some(tokio::spawn(async move {
            if let Err(e) = cache.get_or_refresh(false).await {
                warn!("Background collection refresh failed: {}", e);
            }
        }))
    }

    async fn refresh_locked(&self) -> RefreshResult {
        let progressive = self.committed().is_none();
        info!(
            "Synchronizing collection ({})",
            if progressive { "progressive" } else { "background" }
        );
        self.live.begin_sync(progressive);

        let result = self
            .paginator
            .sync_pages(None, |records, cursor| {
                self.live.page_loaded(records, cursor, progressive)
            })
            .await;

        let outcome = match result {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                let entry = CacheEntry {
                    snapshot: snapshot.clone(),
                    fetched_at: Instant::now(),
                    fetched_at_utc: Utc::now(),
                };
                match self.entry.write() {
                    Ok(mut guard) => *guard = Some(entry),
                    Err(poisoned) => *poisoned.into_inner() = Some(entry),
                }
                self.live.commit(snapshot.clone());
                info!("Collection synchronized: {} records", snapshot.len());
                Ok(snapshot)
            }
            Err(e) => {
                warn!("Collection sync failed: {}", e);
                self.live.fail(&e);
                Err(e)
            }
        };

        if let Ok(mut last) = self.last_outcome.lock() {
            *last = Some(outcome.clone());
        }
        self.generation.fetch_add(1, Ordering::Release);
        outcome
    }
}
