//! Error taxonomy of the collection engine.

use thiserror::Error;

/// Maximum number of body characters kept when a response cannot be parsed.
pub const BODY_PREFIX_LEN: usize = 200;

/// Errors produced while talking to the remote catalog.
///
/// `Clone` so that callers collapsed onto one in-flight refresh can all
/// receive the same failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionError {
    /// A required credential or identifier is missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Non-2xx response with a parseable body.
    #[error("Upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    /// Empty or non-JSON body, whatever the status.
    #[error("Malformed response from upstream (HTTP {status}): {body_prefix}")]
    MalformedResponse { status: u16, body_prefix: String },

    /// Connection-level failure before any response was read.
    #[error("Network error: {0}")]
    Network(String),
}

impl CollectionError {
    /// Whether the failure is transient and the request may be repeated.
    ///
    /// 429 and 5xx are transient; any other upstream status is a client-side
    /// problem (bad id, bad credential) and fails fast.
    pub fn is_retryable(&self) -> bool {
        match self {
            CollectionError::Config(_) => false,
            CollectionError::Upstream { status, .. } => *status == 429 || *status >= 500,
            CollectionError::MalformedResponse { .. } => true,
            CollectionError::Network(_) => true,
        }
    }

    /// Upstream HTTP status, when one was received.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            CollectionError::Upstream { status, .. }
            | CollectionError::MalformedResponse { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Status code to answer the local HTTP caller with.
    pub fn http_status(&self) -> u16 {
        match self {
            CollectionError::Config(_) => 500,
            CollectionError::Upstream { status, .. } if (400..600).contains(status) => *status,
            CollectionError::Upstream { .. } => 502,
            CollectionError::MalformedResponse { .. } => 502,
            CollectionError::Network(_) => 502,
        }
    }
}

impl From<reqwest::Error> for CollectionError {
    fn from(err: reqwest::Error) -> Self {
        CollectionError::Network(err.to_string())
    }
}

/// Errors of the favorites stores. Logged, never surfaced to the browse flow.
#[derive(Debug, Error)]
pub enum FavoritesStoreError {
    #[error("Favorites store not configured: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Favorites store answered with status {0}")]
    Status(u16),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
