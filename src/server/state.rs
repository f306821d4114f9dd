use axum::extract::FromRef;
use std::sync::Arc;
use std::time::Instant;

use crate::collection::{CollectionCache, FavoritesReconciler, ViewSession};

use super::ServerConfig;

pub type GuardedCollectionCache = Arc<CollectionCache>;
pub type GuardedFavorites = Arc<FavoritesReconciler>;
pub type GuardedViewSession = Arc<ViewSession>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub cache: GuardedCollectionCache,
    pub favorites: GuardedFavorites,
    pub view: GuardedViewSession,
}

impl FromRef<ServerState> for GuardedCollectionCache {
    fn from_ref(input: &ServerState) -> Self {
        input.cache.clone()
    }
}

impl FromRef<ServerState> for GuardedFavorites {
    fn from_ref(input: &ServerState) -> Self {
        input.favorites.clone()
    }
}

impl FromRef<ServerState> for GuardedViewSession {
    fn from_ref(input: &ServerState) -> Self {
        input.view.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
