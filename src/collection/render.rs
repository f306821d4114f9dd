//! Incremental render driver.
//!
//! Everything the user sees is a pure function of the readable snapshot,
//! the filters, the favorites and the display limit: [`recompute`]. The
//! [`RenderDriver`] only keeps those inputs and applies events to them, and
//! [`ViewSession`] wires the driver to the live collection.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use super::facets::{self, FacetSet};
use super::favorites::FavoriteSet;
use super::filter::{self, FilterState};
use super::live::{LiveSnapshot, SyncProgress, SyncState};
use super::models::ReleaseRecord;

/// Initial number of visible records, and the step it grows by.
pub const DISPLAY_PAGE_SIZE: usize = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ChannelBadge {
    Mono,
    Stereo,
}

/// A visible record with its display decorations.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RenderedRelease {
    #[serde(flatten)]
    pub record: ReleaseRecord,
    pub image: Option<String>,
    /// Year, first format and country joined by " • ".
    pub meta_line: String,
    pub channel: Option<ChannelBadge>,
    pub favorite: bool,
}

impl RenderedRelease {
    fn new(record: &ReleaseRecord, favorites: &FavoriteSet) -> Self {
        let favorite = record
            .release_id
            .as_ref()
            .is_some_and(|id| favorites.contains(id));
        Self {
            image: record.grid_image().map(str::to_string),
            meta_line: meta_line(record),
            channel: channel_badge(record),
            favorite,
            record: record.clone(),
        }
    }
}

pub fn meta_line(record: &ReleaseRecord) -> String {
    let mut parts = Vec::new();
    if let Some(year) = record.year {
        parts.push(year.to_string());
    }
    if let Some(format) = record.formats.first() {
        parts.push(format.clone());
    }
    if let Some(country) = record.country.as_ref().filter(|c| !c.is_empty()) {
        parts.push(country.clone());
    }
    parts.join(" • ")
}

/// Mono wins over stereo when both are mentioned.
pub fn channel_badge(record: &ReleaseRecord) -> Option<ChannelBadge> {
    let text = record
        .formats
        .iter()
        .chain(record.format_descriptions.iter())
        .map(|s| s.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");
    if text.contains("mono") {
        Some(ChannelBadge::Mono)
    } else if text.contains("stereo") {
        Some(ChannelBadge::Stereo)
    } else {
        None
    }
}

/// What the user sees.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RenderFrame {
    pub facets: FacetSet,
    pub visible: Vec<RenderedRelease>,
    /// Records passing the filters, visible or not.
    pub total_matches: usize,
    pub display_limit: usize,
    pub has_more: bool,
    pub filters: FilterState,
    pub progress: SyncProgress,
    pub status: String,
}

/// Recompute the whole frame from its inputs.
pub fn recompute(
    snapshot: &LiveSnapshot,
    filters: &FilterState,
    favorites: &FavoriteSet,
    display_limit: usize,
) -> RenderFrame {
    let records = snapshot.records.as_slice();
    let matches = filter::apply(records, filters, favorites);
    let visible = matches
        .iter()
        .take(display_limit)
        .map(|record| RenderedRelease::new(record, favorites))
        .collect();

    RenderFrame {
        facets: facets::extract(records),
        visible,
        total_matches: matches.len(),
        display_limit,
        has_more: matches.len() > display_limit,
        filters: filters.clone(),
        progress: snapshot.progress.clone(),
        status: status_line(&snapshot.progress, matches.len()),
    }
}

fn status_line(progress: &SyncProgress, matches: usize) -> String {
    match &progress.state {
        SyncState::Idle => "Collection not loaded yet".to_string(),
        SyncState::Syncing if progress.total_items == 0 => "Loading collection…".to_string(),
        SyncState::Syncing => format!(
            "Loaded {} / {} (page {}/{})",
            progress.fetched_items, progress.total_items, progress.current_page, progress.total_pages
        ),
        SyncState::Complete => format!("{} records available", matches),
        SyncState::Failed { message } => format!("Error: {}", message),
    }
}

/// Inputs that change what is rendered.
#[derive(Clone, Debug)]
pub enum RenderEvent {
    /// A page arrived, a sync committed or failed. Keeps the display limit.
    CollectionChanged(LiveSnapshot),
    /// A filter or sort control changed. Resets the display limit.
    FiltersChanged(FilterState),
    /// Clear every filter and sort by arrival order.
    Reset,
    ShowMore,
    /// The viewport reached the end of the rendered records.
    NearEnd,
    FavoritesChanged(FavoriteSet),
}

pub struct RenderDriver {
    snapshot: LiveSnapshot,
    filters: FilterState,
    favorites: FavoriteSet,
    display_limit: usize,
    frame: RenderFrame,
}

impl RenderDriver {
    pub fn new(snapshot: LiveSnapshot, favorites: FavoriteSet) -> Self {
        let filters = FilterState::default();
        let frame = recompute(&snapshot, &filters, &favorites, DISPLAY_PAGE_SIZE);
        Self {
            snapshot,
            filters,
            favorites,
            display_limit: DISPLAY_PAGE_SIZE,
            frame,
        }
    }

    pub fn frame(&self) -> &RenderFrame {
        &self.frame
    }

    pub fn display_limit(&self) -> usize {
        self.display_limit
    }

    /// Apply `event` and recompute.
    pub fn handle(&mut self, event: RenderEvent) -> &RenderFrame {
        match event {
            RenderEvent::CollectionChanged(snapshot) => self.snapshot = snapshot,
            RenderEvent::FiltersChanged(filters) => {
                self.filters = filters;
                self.display_limit = DISPLAY_PAGE_SIZE;
            }
            RenderEvent::Reset => {
                self.filters = FilterState::reset();
                self.display_limit = DISPLAY_PAGE_SIZE;
            }
            RenderEvent::ShowMore => self.display_limit += DISPLAY_PAGE_SIZE,
            RenderEvent::NearEnd => {
                if self.frame.has_more {
                    self.display_limit += DISPLAY_PAGE_SIZE;
                }
            }
            RenderEvent::FavoritesChanged(favorites) => self.favorites = favorites,
        }
        self.frame = recompute(
            &self.snapshot,
            &self.filters,
            &self.favorites,
            self.display_limit,
        );
        &self.frame
    }
}

/// The single user's view, kept in step with the live collection.
pub struct ViewSession {
    driver: Arc<Mutex<RenderDriver>>,
    follower: JoinHandle<()>,
}

impl ViewSession {
    /// Start following `updates` from its current value.
    pub fn start(mut updates: watch::Receiver<LiveSnapshot>, favorites: FavoriteSet) -> Self {
        let initial = updates.borrow_and_update().clone();
        let driver = Arc::new(Mutex::new(RenderDriver::new(initial, favorites)));

        let follower = tokio::spawn({
            let driver = driver.clone();
            async move {
                while updates.changed().await.is_ok() {
                    let snapshot = updates.borrow_and_update().clone();
                    debug!(
                        "View follows collection change: {} records",
                        snapshot.records.len()
                    );
                    lock(&driver).handle(RenderEvent::CollectionChanged(snapshot));
                }
            }
        });

        Self { driver, follower }
    }

    pub fn dispatch(&self, event: RenderEvent) -> RenderFrame {
        lock(&self.driver).handle(event).clone()
    }

    pub fn frame(&self) -> RenderFrame {
        lock(&self.driver).frame().clone()
    }
}

impl Drop for ViewSession {
    fn drop(&mut self) {
        self.follower.abort();
    }
}

fn lock(driver: &Mutex<RenderDriver>) -> MutexGuard<'_, RenderDriver> {
    driver.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
