//! Favorite releases: a local store that is the source of truth, and an
//! optional remote store updated best-effort in the background.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::error::FavoritesStoreError;

/// Unified set of favorite release ids.
pub type FavoriteSet = BTreeSet<String>;

#[derive(Debug, Default, Serialize, Deserialize)]
struct FavoritesDocument {
    #[serde(default)]
    ids: Vec<String>,
}

/// A place where favorite ids are kept.
#[async_trait]
pub trait FavoritesStore: Send + Sync {
    async fn list(&self) -> Result<FavoriteSet, FavoritesStoreError>;
    async fn add(&self, id: &str) -> Result<(), FavoritesStoreError>;
    async fn remove(&self, id: &str) -> Result<(), FavoritesStoreError>;
}

/// Favorites kept in memory only, lost on restart.
#[derive(Default)]
pub struct MemoryFavoritesStore {
    ids: RwLock<FavoriteSet>,
}

impl MemoryFavoritesStore {
    pub fn new(ids: FavoriteSet) -> Self {
        Self {
            ids: RwLock::new(ids),
        }
    }

    pub fn snapshot(&self) -> FavoriteSet {
        self.ids.read().map(|ids| ids.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl FavoritesStore for MemoryFavoritesStore {
    async fn list(&self) -> Result<FavoriteSet, FavoritesStoreError> {
        Ok(self.snapshot())
    }

    async fn add(&self, id: &str) -> Result<(), FavoritesStoreError> {
        if let Ok(mut ids) = self.ids.write() {
            ids.insert(id.to_string());
        }
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), FavoritesStoreError> {
        if let Ok(mut ids) = self.ids.write() {
            ids.remove(id);
        }
        Ok(())
    }
}

/// Favorites persisted as `{"ids": [...]}` in a JSON file.
pub struct FileFavoritesStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles on the file.
    lock: tokio::sync::Mutex<()>,
}

impl FileFavoritesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: tokio::sync::Mutex::new(()),
        }
    }

    async fn read(&self) -> Result<FavoriteSet, FavoritesStoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(FavoriteSet::new()),
            Ok(bytes) => {
                let doc: FavoritesDocument = serde_json::from_slice(&bytes)?;
                Ok(doc.ids.into_iter().collect())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FavoriteSet::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, ids: &FavoriteSet) -> Result<(), FavoritesStoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let doc = FavoritesDocument {
            ids: ids.iter().cloned().collect(),
        };
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(&doc)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn update(&self, f: impl FnOnce(&mut FavoriteSet) -> bool + Send) -> Result<(), FavoritesStoreError> {
        let _guard = self.lock.lock().await;
        let mut ids = self.read().await?;
        if f(&mut ids) {
            self.write(&ids).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl FavoritesStore for FileFavoritesStore {
    async fn list(&self) -> Result<FavoriteSet, FavoritesStoreError> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    async fn add(&self, id: &str) -> Result<(), FavoritesStoreError> {
        let id = id.to_string();
        self.update(move |ids| ids.insert(id)).await
    }

    async fn remove(&self, id: &str) -> Result<(), FavoritesStoreError> {
        let id = id.to_string();
        self.update(move |ids| ids.remove(&id)).await
    }
}

/// Remote key-set service.
///
/// The key, when set, is sent both as `apikey` and as a bearer token.
/// `GET {base}/favorites` answers `{"ids": [...]}`, `POST {base}/favorites`
/// takes `{"id": ...}` and `DELETE {base}/favorites?id=...` removes one id.
pub struct RemoteFavoritesStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl RemoteFavoritesStore {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, FavoritesStoreError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(FavoritesStoreError::Config("FAVORITES_URL is empty".to_string()));
        }
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            base_url,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    fn url(&self) -> String {
        format!("{}/favorites", self.base_url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("apikey", key).bearer_auth(key),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, FavoritesStoreError> {
        let response = self.authorize(request).send().await?;
        if !response.status().is_success() {
            return Err(FavoritesStoreError::Status(response.status().as_u16()));
        }
        Ok(response)
    }
}

#[async_trait]
impl FavoritesStore for RemoteFavoritesStore {
    async fn list(&self) -> Result<FavoriteSet, FavoritesStoreError> {
        let response = self.send(self.client.get(self.url())).await?;
        let doc: FavoritesDocument = serde_json::from_slice(&response.bytes().await?)?;
        Ok(doc.ids.into_iter().collect())
    }

    async fn add(&self, id: &str) -> Result<(), FavoritesStoreError> {
        self.send(
            self.client
                .post(self.url())
                .json(&serde_json::json!({ "id": id })),
        )
        .await?;
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), FavoritesStoreError> {
        self.send(self.client.delete(self.url()).query(&[("id", id)]))
            .await?;
        Ok(())
    }
}

/// Set union of the local and remote favorites.
pub fn reconcile(local: &FavoriteSet, remote: &FavoriteSet) -> FavoriteSet {
    local.union(remote).cloned().collect()
}

/// A pending change for the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RemoteUpdate {
    Add(String),
    Remove(String),
}

/// Keeps the unified favorite set and propagates changes.
pub struct FavoritesReconciler {
    local: Arc<dyn FavoritesStore>,
    remote: Option<Arc<dyn FavoritesStore>>,
    current: RwLock<FavoriteSet>,
    /// Held across the in-memory flip and the local write, so the local
    /// store sees toggles in the same order as the in-memory set.
    toggle_lock: tokio::sync::Mutex<()>,
    /// Remote outbox, drained in order by a single worker.
    outbox: Option<mpsc::UnboundedSender<RemoteUpdate>>,
}

impl FavoritesReconciler {
    /// Create the reconciler. When a remote store is given, its outbox worker
    /// is spawned on the current runtime.
    pub fn new(local: Arc<dyn FavoritesStore>, remote: Option<Arc<dyn FavoritesStore>>) -> Self {
        let outbox = remote.clone().map(|remote| {
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(drain_outbox(remote, rx));
            tx
        });
        Self {
            local,
            remote,
            current: RwLock::new(FavoriteSet::new()),
            toggle_lock: tokio::sync::Mutex::new(()),
            outbox,
        }
    }

    /// Current unified set.
    pub fn favorites(&self) -> FavoriteSet {
        self.current.read().map(|ids| ids.clone()).unwrap_or_default()
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.current.read().map(|ids| ids.contains(id)).unwrap_or(false)
    }

    fn replace(&self, ids: FavoriteSet) {
        match self.current.write() {
            Ok(mut current) => *current = ids,
            Err(poisoned) => *poisoned.into_inner() = ids,
        }
    }

    /// Merge local and remote sets at session start.
    ///
    /// An unreachable store counts as empty. Remote-only ids are written to the
    /// local store; local-only ids are queued for the remote without waiting.
    pub async fn reconcile_session(&self) -> FavoriteSet {
        let _guard = self.toggle_lock.lock().await;

        let local = self.local.list().await.unwrap_or_else(|e| {
            warn!("Failed to read local favorites: {}", e);
            FavoriteSet::new()
        });
        let remote = match &self.remote {
            Some(store) => store.list().await.unwrap_or_else(|e| {
                debug!("Remote favorites unavailable: {}", e);
                FavoriteSet::new()
            }),
            None => FavoriteSet::new(),
        };

        let unified = reconcile(&local, &remote);
        for id in remote.difference(&local) {
            if let Err(e) = self.local.add(id).await {
                warn!("Failed to persist favorite {} locally: {}", id, e);
            }
        }
        for id in local.difference(&remote) {
            self.push_remote(RemoteUpdate::Add(id.clone()));
        }

        info!(
            "Favorites reconciled: {} local, {} remote, {} unified",
            local.len(),
            remote.len(),
            unified.len()
        );
        self.replace(unified.clone());
        unified
    }

    /// Flip `id` and return whether it is now a favorite.
    ///
    /// The in-memory set and the local store are updated first; the remote
    /// store is updated in the background and its failures are ignored.
    pub async fn toggle(&self, id: &str) -> bool {
        let _guard = self.toggle_lock.lock().await;

        let now_favorite = match self.current.write() {
            Ok(mut current) => flip(&mut current, id),
            Err(poisoned) => flip(&mut poisoned.into_inner(), id),
        };

        let persisted = if now_favorite {
            self.local.add(id).await
        } else {
            self.local.remove(id).await
        };
        if let Err(e) = persisted {
            warn!("Failed to persist favorite {} locally: {}", id, e);
        }

        self.push_remote(if now_favorite {
            RemoteUpdate::Add(id.to_string())
        } else {
            RemoteUpdate::Remove(id.to_string())
        });
        now_favorite
    }

    /// Fire-and-forget remote update. Not retried.
    fn push_remote(&self, update: RemoteUpdate) {
        let Some(outbox) = &self.outbox else {
            return;
        };
        if let Err(e) = outbox.send(update) {
            debug!("Remote favorites outbox closed, dropping {:?}", e.0);
        }
    }
}

/// Apply queued remote updates one at a time, in the order they were queued.
async fn drain_outbox(
    remote: Arc<dyn FavoritesStore>,
    mut rx: mpsc::UnboundedReceiver<RemoteUpdate>,
) {
    while let Some(update) = rx.recv().await {
        let result = match &update {
            RemoteUpdate::Add(id) => remote.add(id).await,
            RemoteUpdate::Remove(id) => remote.remove(id).await,
        };
        if let Err(e) = result {
            debug!("Remote favorite update {:?} failed: {}", update, e);
        }
    }
}

fn flip(ids: &mut FavoriteSet, id: &str) -> bool {
    if ids.remove(id) {
        false
    } else {
        ids.insert(id.to_string());
        true
    }
}
