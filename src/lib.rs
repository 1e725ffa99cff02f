//! # Scopegate
//!
//! Scope-based access control for a chat memory store, with a bulk import
//! tool that derives document scopes from `.perms` marker files.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! scopegate = { version = "0.0", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use scopegate::auth::Hs256Verifier;
//! use scopegate::config::ServerConfig;
//! use scopegate::ingest::FileSystemIngestion;
//! use scopegate::server::{AppState, create_router};
//! use scopegate::store::{SqliteStore, Store};
//!
//! let config = ServerConfig::default();
//! let store = SqliteStore::new(config.db_path()).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(
//!     Arc::new(store),
//!     Arc::new(FileSystemIngestion::new(&config.data_dir)),
//!     Arc::new(Hs256Verifier::new("secret", None)),
//!     config,
//! ));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes CLI module. Disable with `default-features = false`.

pub mod auth;
pub mod authz;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod directory;
pub mod error;
pub mod import;
pub mod ingest;
pub mod server;
pub mod store;
pub mod types;
