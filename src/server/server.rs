use anyhow::{Context, Result};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::collection::facets;
use crate::collection::{
    CollectionError, FavoritesReconciler, FilterState, ReleaseRecord, RenderEvent, SyncProgress,
    ViewSession,
};

use super::{http_cache, log_requests, state::*, ServerConfig};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub sync: SyncProgress,
    pub cached_items: Option<usize>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub fresh: bool,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
}

fn collection_error_response(err: &CollectionError) -> Response {
    warn!("Request failed: {}", err);
    let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::BAD_GATEWAY);
    let body = ErrorBody {
        error: err.to_string(),
        status: err.upstream_status(),
    };
    (status, Json(body)).into_response()
}

#[derive(Deserialize, Debug)]
struct PageQuery {
    page: Option<u32>,
    per_page: Option<u32>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct ForceQuery {
    force: bool,
}

#[derive(Deserialize, Debug)]
struct FacetsQuery {
    pages: Option<String>,
}

#[derive(Serialize)]
struct FullCollectionResponse<'a> {
    total: usize,
    fetched_at: Option<DateTime<Utc>>,
    releases: &'a [ReleaseRecord],
}

#[derive(Serialize)]
struct RefreshResponse {
    total: usize,
    fetched_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct FavoritesResponse {
    ids: Vec<String>,
}

#[derive(Serialize)]
struct ToggleResponse {
    id: String,
    favorite: bool,
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        sync: state.cache.readable().progress,
        cached_items: state.cache.committed().map(|snapshot| snapshot.len()),
        fetched_at: state.cache.fetched_at(),
        fresh: state.cache.is_fresh(),
    };
    Json(stats)
}

/// Single upstream page, bypassing the cache.
async fn get_collection_page(
    State(cache): State<GuardedCollectionCache>,
    Query(query): Query<PageQuery>,
) -> Response {
    let paginator = cache.paginator();
    let page = query.page.unwrap_or(1);
    let per_page = query.per_page.unwrap_or(paginator.per_page());
    match paginator.fetch_page(page, per_page).await {
        Ok(page) => Json(page).into_response(),
        Err(err) => collection_error_response(&err),
    }
}

async fn get_full_collection(
    State(cache): State<GuardedCollectionCache>,
    Query(query): Query<ForceQuery>,
) -> Response {
    match cache.get_or_refresh_detached(query.force).await {
        Ok(snapshot) => Json(FullCollectionResponse {
            total: snapshot.len(),
            fetched_at: cache.fetched_at(),
            releases: snapshot.as_slice(),
        })
        .into_response(),
        Err(err) => collection_error_response(&err),
    }
}

async fn refresh_collection(
    State(cache): State<GuardedCollectionCache>,
    Query(query): Query<ForceQuery>,
) -> Response {
    match cache.get_or_refresh_detached(query.force).await {
        Ok(snapshot) => Json(RefreshResponse {
            total: snapshot.len(),
            fetched_at: cache.fetched_at(),
        })
        .into_response(),
        Err(err) => collection_error_response(&err),
    }
}

async fn get_facets(
    State(cache): State<GuardedCollectionCache>,
    Query(query): Query<FacetsQuery>,
) -> Response {
    match query.pages {
        Some(raw) => {
            let budget = facets::sampled_page_budget(&raw);
            match cache.paginator().sync_pages(Some(budget), |_, _| {}).await {
                Ok(sample) => Json(facets::extract_sampled(&sample)).into_response(),
                Err(err) => collection_error_response(&err),
            }
        }
        None => match cache.get_or_refresh_detached(false).await {
            Ok(snapshot) => Json(facets::extract(&snapshot)).into_response(),
            Err(err) => collection_error_response(&err),
        },
    }
}

async fn get_release(
    State(cache): State<GuardedCollectionCache>,
    Path(id): Path<String>,
) -> Response {
    match cache.paginator().fetch_release(&id).await {
        Ok(detail) => Json(detail).into_response(),
        Err(err) => collection_error_response(&err),
    }
}

async fn get_favorites(State(favorites): State<GuardedFavorites>) -> impl IntoResponse {
    Json(FavoritesResponse {
        ids: favorites.favorites().into_iter().collect(),
    })
}

async fn toggle_favorite(State(state): State<ServerState>, Path(id): Path<String>) -> Response {
    let id = id.trim().to_string();
    if id.is_empty() {
        return StatusCode::BAD_REQUEST.into_response();
    }
    let favorite = state.favorites.toggle(&id).await;
    state
        .view
        .dispatch(RenderEvent::FavoritesChanged(state.favorites.favorites()));
    Json(ToggleResponse { id, favorite }).into_response()
}

async fn get_view(State(state): State<ServerState>) -> impl IntoResponse {
    state.cache.ensure_fresh_in_background();
    Json(state.view.frame())
}

async fn post_view_filters(
    State(view): State<GuardedViewSession>,
    Json(filters): Json<FilterState>,
) -> impl IntoResponse {
    Json(view.dispatch(RenderEvent::FiltersChanged(filters)))
}

async fn post_view_more(State(view): State<GuardedViewSession>) -> impl IntoResponse {
    Json(view.dispatch(RenderEvent::ShowMore))
}

async fn post_view_near_end(State(view): State<GuardedViewSession>) -> impl IntoResponse {
    Json(view.dispatch(RenderEvent::NearEnd))
}

async fn post_view_reset(State(view): State<GuardedViewSession>) -> impl IntoResponse {
    Json(view.dispatch(RenderEvent::Reset))
}

impl ServerState {
    fn new(
        config: ServerConfig,
        cache: GuardedCollectionCache,
        favorites: GuardedFavorites,
    ) -> ServerState {
        let view = ViewSession::start(cache.live().subscribe(), favorites.favorites());
        ServerState {
            config,
            start_time: Instant::now(),
            cache,
            favorites,
            view: Arc::new(view),
        }
    }
}

/// Build the application router. Must run inside a tokio runtime.
pub fn make_app(
    config: ServerConfig,
    cache: GuardedCollectionCache,
    favorites: Arc<FavoritesReconciler>,
) -> Router {
    let state = ServerState::new(config.clone(), cache, favorites);

    let collection_routes: Router = Router::new()
        .route("/", get(get_collection_page))
        .route("/all", get(get_full_collection))
        .route("/refresh", post(refresh_collection))
        .with_state(state.clone());

    let release_routes: Router = Router::new()
        .route("/{id}", get(get_release))
        .layer(middleware::from_fn_with_state(
            config.content_cache_age_sec,
            http_cache,
        ))
        .with_state(state.clone());

    let favorites_routes: Router = Router::new()
        .route("/", get(get_favorites))
        .route("/{id}/toggle", post(toggle_favorite))
        .with_state(state.clone());

    let view_routes: Router = Router::new()
        .route("/", get(get_view))
        .route("/filters", post(post_view_filters))
        .route("/more", post(post_view_more))
        .route("/near-end", post(post_view_near_end))
        .route("/reset", post(post_view_reset))
        .with_state(state.clone());

    let home_router: Router = Router::new()
        .route("/", get(home))
        .route("/api/filters", get(get_facets))
        .with_state(state.clone());

    home_router
        .nest("/api/collection", collection_routes)
        .nest("/api/release", release_routes)
        .nest("/api/favorites", favorites_routes)
        .nest("/api/view", view_routes)
        .layer(middleware::from_fn_with_state(state, log_requests))
}

pub async fn run_server(
    config: ServerConfig,
    cache: GuardedCollectionCache,
    favorites: Arc<FavoritesReconciler>,
) -> Result<()> {
    let port = config.port;
    let app = make_app(config, cache, favorites);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Listening on 127.0.0.1:{}", port);

    Ok(axum::serve(listener, app).await?)
}
