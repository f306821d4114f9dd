//! Common test infrastructure
//!
//! This module provides all the infrastructure needed for end-to-end tests.
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestServer, TestClient, RELEASE_DARK_SIDE_ID};
//! use reqwest::StatusCode;
//!
//! #[tokio::test]
//! async fn test_get_release() {
//!     let server = TestServer::spawn().await;
//!     let client = TestClient::new(server.base_url.clone());
//!
//!     let response = client.get_release(RELEASE_DARK_SIDE_ID).await;
//!     assert_eq!(response.status(), StatusCode::OK);
//! }
//! ```

#![allow(dead_code)]

mod client;
mod constants;
mod upstream;

// Public API - this is what tests import
pub use client::TestClient;
pub use constants::*;
pub use server::{TestServer, TestServerOptions};
pub use upstream::{MockUpstream, ScriptedFailure};

#[allow(unused_imports)]
pub use fixtures::{generated_collection, sample_collection};
