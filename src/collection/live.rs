//! Progressive exposure of the collection.
//!
//! [`LiveCollection`] publishes the best readable snapshot together with sync
//! progress over a `watch` channel. Pages are appended whole and the record
//! vector is copy-on-write behind an `Arc`, so a reader always holds a valid
//! prefix and never a torn record.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use super::error::CollectionError;
use super::models::{CollectionSnapshot, PaginationCursor, ReleaseRecord};

/// State of the most recent synchronization run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncState {
    /// No sync started yet.
    Idle,
    Syncing,
    Complete,
    Failed { message: String },
}

/// Progress counters of the most recent synchronization run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SyncProgress {
    #[serde(flatten)]
    pub state: SyncState,
    /// Records fetched so far by the current (or last) run.
    pub fetched_items: usize,
    /// Collection size as reported by the upstream.
    pub total_items: u64,
    pub current_page: u32,
    pub total_pages: u32,
}

impl Default for SyncProgress {
    fn default() -> Self {
        Self {
            state: SyncState::Idle,
            fetched_items: 0,
            total_items: 0,
            current_page: 0,
            total_pages: 0,
        }
    }
}

/// What read-only consumers see at a point in time.
#[derive(Clone, Debug, Default)]
pub struct LiveSnapshot {
    pub records: Arc<CollectionSnapshot>,
    pub progress: SyncProgress,
}

impl PartialEq for LiveSnapshot {
    fn eq(&self, other: &Self) -> bool {
        (Arc::ptr_eq(&self.records, &other.records) || self.records == other.records)
            && self.progress == other.progress
    }
}

/// Publisher of the readable collection.
pub struct LiveCollection {
    tx: watch::Sender<LiveSnapshot>,
}

impl LiveCollection {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(LiveSnapshot::default());
        Self { tx }
    }

    /// Subscribe to snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<LiveSnapshot> {
        self.tx.subscribe()
    }

    /// Latest published snapshot.
    pub fn current(&self) -> LiveSnapshot {
        self.tx.borrow().clone()
    }

    /// Mark the start of a sync run.
    ///
    /// When `progressive` is set the readable records restart from empty and
    /// grow page by page; otherwise the previous records stay readable until
    /// [`commit`](Self::commit).
    pub fn begin_sync(&self, progressive: bool) {
        self.tx.send_modify(|live| {
            if progressive {
                live.records = Arc::new(Vec::new());
            }
            live.progress = SyncProgress {
                state: SyncState::Syncing,
                ..SyncProgress::default()
            };
        });
    }

    /// Record a fetched page, appending it to the readable records when `progressive`.
    pub fn page_loaded(
        &self,
        records: &[ReleaseRecord],
        cursor: &PaginationCursor,
        progressive: bool,
    ) {
        self.tx.send_modify(|live| {
            if progressive {
                Arc::make_mut(&mut live.records).extend_from_slice(records);
            }
            live.progress.fetched_items += records.len();
            live.progress.total_items = cursor.total_items;
            live.progress.current_page = cursor.current_page;
            live.progress.total_pages = cursor.total_pages;
        });
    }

    /// Publish a fully synchronized snapshot.
    pub fn commit(&self, snapshot: Arc<CollectionSnapshot>) {
        self.tx.send_modify(|live| {
            live.progress.state = SyncState::Complete;
            live.progress.fetched_items = snapshot.len();
            live.records = snapshot;
        });
    }

    /// Mark the run as failed. Already readable records stay readable.
    pub fn fail(&self, error: &CollectionError) {
        self.tx.send_modify(|live| {
            live.progress.state = SyncState::Failed {
                message: error.to_string(),
            };
        });
    }
}

impl Default for LiveCollection {
    fn default() -> Self {
        Self::new()
    }
}
