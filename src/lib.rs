//! Archivio Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod collection;
pub mod config;
pub mod server;

// Re-export commonly used types for convenience
pub use collection::{CollectionCache, FavoritesReconciler, Paginator};
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig};
