//! Mock of the remote catalog and of the remote favorites store
//!
//! Serves a fixed list of releases through the paginated collection
//! listing, release details, and a `/favorites` resource. Tests can
//! script failures per page and inspect which pages were requested.

use super::constants::*;
use super::fixtures::release_details;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// Scripted answer replacing the normal page body once.
#[derive(Clone, Debug)]
pub struct ScriptedFailure {
    pub status: u16,
    pub body: String,
}

impl ScriptedFailure {
    pub fn server_error() -> Self {
        Self {
            status: 500,
            body: r#"{"message": "Internal server error"}"#.to_string(),
        }
    }

    pub fn rate_limited() -> Self {
        Self {
            status: 429,
            body: r#"{"message": "You are making requests too quickly."}"#.to_string(),
        }
    }

    pub fn html_gateway_error() -> Self {
        Self {
            status: 502,
            body: "<html><body>Bad Gateway</body></html>".to_string(),
        }
    }
}

#[derive(Default)]
struct UpstreamState {
    releases: Mutex<Vec<Value>>,
    details: Mutex<HashMap<String, Value>>,
    failures: Mutex<HashMap<u32, VecDeque<ScriptedFailure>>>,
    page_hits: Mutex<Vec<u32>>,
    page_delay: Mutex<Duration>,
    favorites: Mutex<BTreeSet<String>>,
    favorites_offline: Mutex<bool>,
}

type SharedUpstream = Arc<UpstreamState>;

/// Mock upstream listening on a random local port.
///
/// When dropped, the server shuts down.
pub struct MockUpstream {
    /// Base URL to hand to the client under test
    pub base_url: String,
    state: SharedUpstream,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

#[derive(Deserialize)]
struct PageParams {
    page: Option<u32>,
    per_page: Option<u32>,
}

#[derive(Deserialize)]
struct FavoriteBody {
    id: String,
}

#[derive(Deserialize)]
struct FavoriteParams {
    id: String,
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Discogs token={}", TEST_TOKEN))
}

fn favorites_authorized(headers: &HeaderMap) -> bool {
    let apikey = headers.get("apikey").and_then(|v| v.to_str().ok());
    let bearer = headers.get("authorization").and_then(|v| v.to_str().ok());
    apikey == Some(TEST_FAVORITES_KEY)
        && bearer == Some(format!("Bearer {}", TEST_FAVORITES_KEY).as_str())
}

async fn collection_page(
    State(state): State<SharedUpstream>,
    Path((username, folder)): Path<(String, String)>,
    Query(params): Query<PageParams>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return json_error(
            StatusCode::UNAUTHORIZED,
            "You must authenticate to access this resource.",
        );
    }
    if username != TEST_USERNAME {
        return json_error(
            StatusCode::NOT_FOUND,
            "User does not exist or may have been deleted.",
        );
    }
    if folder != TEST_FOLDER {
        return json_error(StatusCode::NOT_FOUND, "Folder not found.");
    }

    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(50).clamp(1, 100);
    state.page_hits.lock().unwrap().push(page);

    let failure = state
        .failures
        .lock()
        .unwrap()
        .get_mut(&page)
        .and_then(VecDeque::pop_front);
    if let Some(failure) = failure {
        let status = StatusCode::from_u16(failure.status).unwrap();
        return (status, failure.body).into_response();
    }

    let delay = *state.page_delay.lock().unwrap();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let releases = state.releases.lock().unwrap().clone();
    let items = releases.len();
    let pages = items.div_ceil(per_page as usize).max(1);
    let start = ((page - 1) * per_page) as usize;
    let slice: Vec<Value> = releases
        .into_iter()
        .skip(start)
        .take(per_page as usize)
        .collect();

    Json(json!({
        "pagination": {
            "page": page,
            "pages": pages,
            "per_page": per_page,
            "items": items,
            "urls": {}
        },
        "releases": slice
    }))
    .into_response()
}

async fn release_detail(
    State(state): State<SharedUpstream>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return json_error(
            StatusCode::UNAUTHORIZED,
            "You must authenticate to access this resource.",
        );
    }
    match state.details.lock().unwrap().get(&id) {
        Some(detail) => Json(detail.clone()).into_response(),
        None => json_error(StatusCode::NOT_FOUND, "Release not found."),
    }
}

async fn list_favorites(State(state): State<SharedUpstream>, headers: HeaderMap) -> Response {
    if *state.favorites_offline.lock().unwrap() {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    if !favorites_authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let ids: Vec<String> = state.favorites.lock().unwrap().iter().cloned().collect();
    Json(json!({ "ids": ids })).into_response()
}

async fn add_favorite(
    State(state): State<SharedUpstream>,
    headers: HeaderMap,
    Json(body): Json<FavoriteBody>,
) -> Response {
    if *state.favorites_offline.lock().unwrap() {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    if !favorites_authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    state.favorites.lock().unwrap().insert(body.id);
    StatusCode::CREATED.into_response()
}

async fn remove_favorite(
    State(state): State<SharedUpstream>,
    headers: HeaderMap,
    Query(params): Query<FavoriteParams>,
) -> Response {
    if *state.favorites_offline.lock().unwrap() {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    if !favorites_authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    state.favorites.lock().unwrap().remove(&params.id);
    StatusCode::NO_CONTENT.into_response()
}

impl MockUpstream {
    /// Spawns a mock serving `releases` in the given order, with the
    /// fixture release details.
    pub async fn spawn(releases: Vec<Value>) -> Self {
        let state: SharedUpstream = Arc::new(UpstreamState::default());
        *state.releases.lock().unwrap() = releases;
        *state.details.lock().unwrap() = release_details();

        let app = Router::new()
            .route(
                "/users/{username}/collection/folders/{folder}/releases",
                get(collection_page),
            )
            .route("/releases/{id}", get(release_detail))
            .route(
                "/favorites",
                get(list_favorites)
                    .post(add_favorite)
                    .delete(remove_favorite),
            )
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock upstream");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Mock upstream failed");
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            state,
            _shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Answer the next request for `page` with `failure` instead of data.
    /// Queued failures are consumed in order.
    pub fn fail_page(&self, page: u32, failure: ScriptedFailure) {
        self.state
            .failures
            .lock()
            .unwrap()
            .entry(page)
            .or_default()
            .push_back(failure);
    }

    /// Delay every successful page response.
    pub fn set_page_delay(&self, delay: Duration) {
        *self.state.page_delay.lock().unwrap() = delay;
    }

    /// Replace the served releases.
    pub fn set_releases(&self, releases: Vec<Value>) {
        *self.state.releases.lock().unwrap() = releases;
    }

    /// Pages requested so far, in request order.
    pub fn page_hits(&self) -> Vec<u32> {
        self.state.page_hits.lock().unwrap().clone()
    }

    pub fn reset_page_hits(&self) {
        self.state.page_hits.lock().unwrap().clear();
    }

    pub fn remote_favorites(&self) -> BTreeSet<String> {
        self.state.favorites.lock().unwrap().clone()
    }

    pub fn set_remote_favorites(&self, ids: &[&str]) {
        *self.state.favorites.lock().unwrap() = ids.iter().map(|id| id.to_string()).collect();
    }

    /// Make every `/favorites` call answer 503.
    pub fn set_favorites_offline(&self, offline: bool) {
        *self.state.favorites_offline.lock().unwrap() = offline;
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
