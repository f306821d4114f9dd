//! HTTP client for the remote catalog (Discogs API).
//!
//! Issues single requests and classifies the raw response; see
//! [`classify_response`] for the rules.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::error::{CollectionError, BODY_PREFIX_LEN};
use super::models::{normalize_release_detail, PaginationCursor, RawCollectionPage, ReleaseDetail};
use super::source::CollectionSource;

pub const DISCOGS_API_BASE: &str = "https://api.discogs.com";
pub const USER_AGENT: &str = "archivio-analogico/1.0";
/// Folder 0 holds every release of the collection.
pub const ALL_RELEASES_FOLDER: &str = "0";

/// Connection settings for the remote catalog.
///
/// Token and username are optional here: their absence only becomes an
/// error when a request is attempted.
#[derive(Clone, Debug)]
pub struct DiscogsSettings {
    pub base_url: String,
    pub token: Option<String>,
    pub username: Option<String>,
    pub folder_id: String,
    pub timeout_sec: u64,
}

impl Default for DiscogsSettings {
    fn default() -> Self {
        Self {
            base_url: DISCOGS_API_BASE.to_string(),
            token: None,
            username: None,
            folder_id: ALL_RELEASES_FOLDER.to_string(),
            timeout_sec: 30,
        }
    }
}

/// Client for the remote catalog.
#[derive(Clone)]
pub struct DiscogsClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    username: Option<String>,
    folder_id: String,
}

impl DiscogsClient {
    /// Create a new client.
    pub fn new(settings: DiscogsSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(settings.timeout_sec))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            token: settings.token.filter(|t| !t.trim().is_empty()),
            username: settings.username.filter(|u| !u.trim().is_empty()),
            folder_id: settings.folder_id,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn token(&self) -> Result<&str, CollectionError> {
        self.token
            .as_deref()
            .ok_or_else(|| CollectionError::Config("DISCOGS_TOKEN is not set".to_string()))
    }

    fn username(&self) -> Result<&str, CollectionError> {
        self.username
            .as_deref()
            .ok_or_else(|| CollectionError::Config("DISCOGS_USERNAME is not set".to_string()))
    }

    /// URL of the releases listing of the configured folder.
    pub fn collection_url(&self) -> Result<String, CollectionError> {
        Ok(format!(
            "{}/users/{}/collection/folders/{}/releases",
            self.base_url,
            urlencoding::encode(self.username()?),
            urlencoding::encode(&self.folder_id)
        ))
    }

    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, CollectionError> {
        let token = self.token()?;
        let response = self
            .client
            .get(url)
            .query(query)
            .header("Authorization", format!("Discogs token={}", token))
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!("GET {} -> {} ({} bytes)", url, status, body.len());

        classify_response(status, &body)
    }
}

#[async_trait]
impl CollectionSource for DiscogsClient {
    async fn fetch_collection_page(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<RawCollectionPage, CollectionError> {
        let url = self.collection_url()?;
        let body = self
            .get_json(
                &url,
                &[("page", page.to_string()), ("per_page", per_page.to_string())],
            )
            .await?;

        let requested = PaginationCursor {
            current_page: page,
            ..PaginationCursor::initial(per_page)
        };
        Ok(RawCollectionPage::from_body(&body, requested))
    }

    async fn fetch_release(&self, release_id: &str) -> Result<ReleaseDetail, CollectionError> {
        let url = format!(
            "{}/releases/{}",
            self.base_url,
            urlencoding::encode(release_id)
        );
        let body = self.get_json(&url, &[]).await?;
        Ok(normalize_release_detail(&body))
    }
}

/// Classify a raw response.
///
/// - empty or unparseable body: `MalformedResponse`, whatever the status;
/// - non-2xx with a parseable body: `Upstream`, carrying the upstream
///   `message` (or `error`) field, else `"HTTP {status}"`;
/// - otherwise the parsed body.
pub fn classify_response(status: u16, body: &str) -> Result<Value, CollectionError> {
    let malformed = || CollectionError::MalformedResponse {
        status,
        body_prefix: body.trim().chars().take(BODY_PREFIX_LEN).collect(),
    };

    if body.trim().is_empty() {
        return Err(malformed());
    }
    let value: Value = serde_json::from_str(body).map_err(|_| malformed())?;

    if !(200..300).contains(&status) {
        let message = ["message", "error"]
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_str))
            .filter(|m| !m.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", status));
        return Err(CollectionError::Upstream { status, message });
    }

    Ok(value)
}
