//! Shared fixtures for the collection unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Notify;

use super::error::CollectionError;
use super::models::{PaginationCursor, RawCollectionPage, ReleaseDetail, ReleaseRecord};
use super::source::CollectionSource;

pub fn record(id: &str, artist: &str, title: &str) -> ReleaseRecord {
    ReleaseRecord {
        release_id: Some(id.to_string()),
        artist: artist.to_string(),
        title: title.to_string(),
        year: None,
        country: None,
        genres: vec![],
        styles: vec![],
        labels: vec![],
        formats: vec![],
        format_descriptions: vec![],
        thumb: None,
        cover_image: None,
    }
}

pub fn release_json(id: u64, artist: &str, title: &str, year: u32) -> Value {
    json!({
        "id": id,
        "basic_information": {
            "id": id,
            "title": title,
            "year": year,
            "artists": [{"name": artist}],
            "genres": ["Rock"],
            "styles": [],
            "labels": [{"name": "Harvest"}],
            "formats": [{"name": "Vinyl", "descriptions": ["LP"]}]
        }
    })
}

/// In-memory catalog serving pre-built pages, with scripted failures.
pub struct ScriptedSource {
    pages: Vec<Vec<Value>>,
    per_page: u32,
    failures: Mutex<HashMap<u32, VecDeque<CollectionError>>>,
    requests: Mutex<Vec<u32>>,
    gate: Option<(u32, Arc<Notify>)>,
}

impl ScriptedSource {
    /// `page_sizes[i]` records on page `i + 1`, ids numbered from 1.
    pub fn with_pages(page_sizes: &[usize]) -> Self {
        let mut next_id = 1u64;
        let pages = page_sizes
            .iter()
            .map(|size| {
                (0..*size)
                    .map(|_| {
                        let id = next_id;
                        next_id += 1;
                        release_json(id, &format!("Artist {id}"), &format!("Title {id}"), 1970)
                    })
                    .collect()
            })
            .collect();
        Self {
            pages,
            per_page: page_sizes.iter().copied().max().unwrap_or(0) as u32,
            failures: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Fail the next requests of `page` with the given errors, in order.
    pub fn fail_page(&self, page: u32, errors: Vec<CollectionError>) {
        self.failures
            .lock()
            .unwrap()
            .entry(page)
            .or_default()
            .extend(errors);
    }

    /// Hold requests for `page` until the returned handle is notified.
    pub fn gate_page(mut self, page: u32) -> (Self, Arc<Notify>) {
        let notify = Arc::new(Notify::new());
        self.gate = Some((page, notify.clone()));
        (self, notify)
    }

    /// Pages requested so far, in order.
    pub fn requests(&self) -> Vec<u32> {
        self.requests.lock().unwrap().clone()
    }

    pub fn total_items(&self) -> usize {
        self.pages.iter().map(Vec::len).sum()
    }
}

#[async_trait]
impl CollectionSource for ScriptedSource {
    async fn fetch_collection_page(
        &self,
        page: u32,
        _per_page: u32,
    ) -> Result<RawCollectionPage, CollectionError> {
        self.requests.lock().unwrap().push(page);

        if let Some((gated, notify)) = &self.gate {
            if *gated == page {
                notify.notified().await;
            }
        }

        let scripted = self
            .failures
            .lock()
            .unwrap()
            .get_mut(&page)
            .and_then(VecDeque::pop_front);
        if let Some(err) = scripted {
            return Err(err);
        }

        let releases = self
            .pages
            .get(page as usize - 1)
            .cloned()
            .unwrap_or_default();
        Ok(RawCollectionPage {
            releases,
            pagination: PaginationCursor {
                current_page: page,
                total_pages: self.pages.len().max(1) as u32,
                per_page: self.per_page,
                total_items: self.total_items() as u64,
            },
        })
    }

    async fn fetch_release(&self, release_id: &str) -> Result<ReleaseDetail, CollectionError> {
        Err(CollectionError::Upstream {
            status: 404,
            message: format!("Release {release_id} not found."),
        })
    }
}
