//! Photosync Core Library
//!
//! This library incrementally synchronizes a remote media library to local
//! storage: new items are discovered exactly once, content is downloaded
//! without re-fetching what is already present, interrupted runs resume
//! cleanly, and locally vanished content is detected and repaired.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`db`] - Database connection and schema management
//! - [`store`] - Durable per-item state, transaction log, credentials
//! - [`remote`] - Remote library client boundary and Photos implementation
//! - [`sync`] - Windowed ingestion, batched downloads, reconciliation
//! - [`layout`] - Storage layout strategy (metadata to directory mapping)
//! - [`auth`] - Token source trait and persisted credential glue

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod db;
pub mod layout;
pub mod remote;
pub mod store;
pub mod sync;

// Re-export commonly used types
pub use auth::{AuthError, CredentialStore, StaticTokenSource, StoredTokenSource, TokenSource};
pub use db::Database;
pub use layout::{DatePathMapper, PathMapper};
pub use remote::{ContentRequest, ItemMetadata, PhotosClient, RemoteError, RemoteLibrary, TimeRange};
pub use store::{DownloadStatus, MediaItem, MediaKind, MediaStore, StoreError};
pub use sync::{DOWNLOAD_BATCH_SIZE, DownloadStats, FetchStats, SyncEngine, SyncError};
