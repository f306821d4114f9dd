//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all archivio-server endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::Value;
use std::time::Duration;

/// HTTP test client
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("GET request failed")
    }

    async fn post(&self, path: &str) -> Response {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("POST request failed")
    }

    // ========================================================================
    // Home
    // ========================================================================

    pub async fn get_home(&self) -> Response {
        self.get("/").await
    }

    // ========================================================================
    // Collection Endpoints
    // ========================================================================

    /// GET /api/collection?page=&per_page=
    pub async fn get_collection_page(&self, page: u32, per_page: Option<u32>) -> Response {
        match per_page {
            Some(per_page) => {
                self.get(&format!(
                    "/api/collection?page={}&per_page={}",
                    page, per_page
                ))
                .await
            }
            None => self.get(&format!("/api/collection?page={}", page)).await,
        }
    }

    /// GET /api/collection/all
    pub async fn get_full_collection(&self) -> Response {
        self.get("/api/collection/all").await
    }

    /// GET /api/collection/all?force=true
    pub async fn get_full_collection_forced(&self) -> Response {
        self.get("/api/collection/all?force=true").await
    }

    /// POST /api/collection/refresh
    pub async fn refresh_collection(&self, force: bool) -> Response {
        self.post(&format!("/api/collection/refresh?force={}", force))
            .await
    }

    // ========================================================================
    // Facets
    // ========================================================================

    /// GET /api/filters
    pub async fn get_facets(&self) -> Response {
        self.get("/api/filters").await
    }

    /// GET /api/filters?pages=
    pub async fn get_sampled_facets(&self, pages: &str) -> Response {
        self.get(&format!("/api/filters?pages={}", pages)).await
    }

    // ========================================================================
    // Releases
    // ========================================================================

    /// GET /api/release/{id}
    pub async fn get_release(&self, id: &str) -> Response {
        self.get(&format!("/api/release/{}", id)).await
    }

    // ========================================================================
    // Favorites
    // ========================================================================

    /// GET /api/favorites
    pub async fn get_favorites(&self) -> Response {
        self.get("/api/favorites").await
    }

    /// POST /api/favorites/{id}/toggle
    pub async fn toggle_favorite(&self, id: &str) -> Response {
        self.post(&format!("/api/favorites/{}/toggle", id)).await
    }

    // ========================================================================
    // View
    // ========================================================================

    /// GET /api/view
    pub async fn get_view(&self) -> Response {
        self.get("/api/view").await
    }

    /// POST /api/view/filters
    pub async fn post_view_filters(&self, filters: Value) -> Response {
        self.client
            .post(format!("{}/api/view/filters", self.base_url))
            .json(&filters)
            .send()
            .await
            .expect("POST request failed")
    }

    /// POST /api/view/more
    pub async fn post_view_more(&self) -> Response {
        self.post("/api/view/more").await
    }

    /// POST /api/view/near-end
    pub async fn post_view_near_end(&self) -> Response {
        self.post("/api/view/near-end").await
    }

    /// POST /api/view/reset
    pub async fn post_view_reset(&self) -> Response {
        self.post("/api/view/reset").await
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Polls the view until its sync state is `complete` or `failed`, and
    /// returns that frame.
    ///
    /// # Panics
    ///
    /// Panics if the sync does not settle within SYNC_SETTLE_TIMEOUT_MS.
    pub async fn wait_for_settled_view(&self) -> Value {
        let start = std::time::Instant::now();
        loop {
            let frame: Value = self.get_view().await.json().await.unwrap();
            let state = frame["progress"]["state"].as_str().unwrap_or_default();
            if state == "complete" || state == "failed" {
                return frame;
            }
            if start.elapsed() > Duration::from_millis(SYNC_SETTLE_TIMEOUT_MS) {
                panic!("Sync did not settle, last frame: {}", frame);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}
