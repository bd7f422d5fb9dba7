//! State store for synchronized media items.
//!
//! This module provides the durable record the sync engine works against:
//! every item ever observed in remote metadata, its download status, an
//! append-only transaction log, and stored credential blobs.
//!
//! # Overview
//!
//! The store consists of:
//! - [`MediaStore`] - Main interface for store operations
//! - [`MediaItem`] - Individual item row with parsed accessors
//! - [`DownloadStatus`] / [`MediaKind`] - Item state and content kind
//! - [`TransactionKind`] - Audit log event kinds
//! - [`StoreError`] - Operation error types
//!
//! # Example
//!
//! ```ignore
//! use photosync_core::store::MediaStore;
//! use photosync_core::Database;
//!
//! let db = Database::new(Path::new("sync.db")).await?;
//! let store = MediaStore::new(db);
//!
//! if store.add_item(&metadata, "2019/06/08/").await? {
//!     // first observation; item is now pending
//! }
//! ```

mod error;
mod item;

pub use error::StoreError;
pub use item::{DownloadStatus, MediaItem, MediaKind, TransactionKind};

use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use futures_util::stream::BoxStream;
use tracing::{debug, instrument};

use crate::db::Database;
use crate::remote::ItemMetadata;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Durable state store backed by SQLite.
///
/// Items are never deleted; status only moves between pending and
/// downloaded. Every mutating call is atomic on its own (one sqlx
/// transaction per call); no cross-call transaction is assumed, which is
/// what makes the sync engine resumable after arbitrary interruption.
#[derive(Debug, Clone)]
pub struct MediaStore {
    db: Database,
}

impl MediaStore {
    /// Creates a new store over the given database connection.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Inserts a newly observed item with pending status.
    ///
    /// Idempotent: if the identity is already present, nothing is written
    /// and `Ok(false)` is returned. On first insert an `added` transaction
    /// entry is appended in the same database transaction and `Ok(true)`
    /// is returned.
    ///
    /// # Arguments
    ///
    /// * `meta` - Remote metadata for the item
    /// * `rel_path` - Relative storage directory chosen by the path mapper
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidTimestamp`] if the metadata's creation
    /// time is not ISO-8601, or [`StoreError::Database`] if the insert fails.
    #[instrument(skip(self, meta), fields(id = %meta.id, filename = %meta.filename))]
    pub async fn add_item(&self, meta: &ItemMetadata, rel_path: &str) -> Result<bool> {
        let creation_time = DateTime::parse_from_rfc3339(&meta.creation_time)
            .map_err(|source| StoreError::InvalidTimestamp {
                id: meta.id.clone(),
                value: meta.creation_time.clone(),
                source,
            })?
            .with_timezone(&Utc)
            .timestamp();

        let mut tx = self.db.pool().begin().await?;

        let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM items WHERE id = ?")
            .bind(&meta.id)
            .fetch_optional(&mut *tx)
            .await?;

        if existing.is_some() {
            debug!(id = %meta.id, "item already in store");
            return Ok(false);
        }

        sqlx::query(
            r"INSERT INTO items (id, creation_time, path, mime_type, filename, kind, status)
              VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&meta.id)
        .bind(creation_time)
        .bind(rel_path)
        .bind(&meta.mime_type)
        .bind(&meta.filename)
        .bind(meta.kind.as_str())
        .bind(DownloadStatus::Pending.as_i64())
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO transactions (item_id, kind, at) VALUES (?, ?, ?)")
            .bind(&meta.id)
            .bind(TransactionKind::Added.as_str())
            .bind(Utc::now().timestamp())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(id = %meta.id, "inserted item");
        Ok(true)
    }

    /// Returns the creation timestamps of the oldest and newest known items.
    ///
    /// On an empty store the sentinels are chosen so a subsequent windowing
    /// computation covers the full time range: oldest defaults to now,
    /// newest defaults to the unix epoch.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn extremes(&self) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let row: (Option<i64>, Option<i64>) =
            sqlx::query_as("SELECT MIN(creation_time), MAX(creation_time) FROM items")
                .fetch_one(self.db.pool())
                .await?;

        let oldest = row
            .0
            .map_or_else(Utc::now, |secs| DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now));
        let newest = row
            .1
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or(DateTime::UNIX_EPOCH);

        Ok((oldest, newest))
    }

    /// Streams all pending items in ascending creation-time order.
    ///
    /// The stream is lazy and restartable: each call starts a fresh query,
    /// so oldest content is always offered for download first.
    pub fn pending_items(&self) -> BoxStream<'_, Result<MediaItem>> {
        self.items_by_status(DownloadStatus::Pending)
    }

    /// Streams all downloaded items in ascending creation-time order.
    ///
    /// Used by filesystem reconciliation to find vanished content.
    pub fn downloaded_items(&self) -> BoxStream<'_, Result<MediaItem>> {
        self.items_by_status(DownloadStatus::Downloaded)
    }

    fn items_by_status(&self, status: DownloadStatus) -> BoxStream<'_, Result<MediaItem>> {
        Box::pin(
            sqlx::query_as::<_, MediaItem>(
                r"SELECT * FROM items WHERE status = ? ORDER BY creation_time ASC",
            )
            .bind(status.as_i64())
            .fetch(self.db.pool())
            .map_err(StoreError::from),
        )
    }

    /// Sets the download status for each of the given item identities.
    ///
    /// All updates happen in one database transaction. A `downloaded`
    /// transaction log entry is appended per item only when promoting to
    /// downloaded; demotion (vanished-file reconciliation) is not logged.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ItemNotFound`] if any identity is unknown
    /// (the whole call rolls back), or [`StoreError::Database`] on failure.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn mark_downloaded(&self, ids: &[String], downloaded: bool) -> Result<()> {
        let status = if downloaded {
            DownloadStatus::Downloaded
        } else {
            DownloadStatus::Pending
        };

        let mut tx = self.db.pool().begin().await?;

        for id in ids {
            let result = sqlx::query("UPDATE items SET status = ? WHERE id = ?")
                .bind(status.as_i64())
                .bind(id)
                .execute(&mut *tx)
                .await?;

            if result.rows_affected() == 0 {
                return Err(StoreError::ItemNotFound(id.clone()));
            }

            if downloaded {
                sqlx::query("INSERT INTO transactions (item_id, kind, at) VALUES (?, ?, ?)")
                    .bind(id)
                    .bind(TransactionKind::Downloaded.as_str())
                    .bind(Utc::now().timestamp())
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    /// Gets an item by identity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn get_item(&self, id: &str) -> Result<Option<MediaItem>> {
        let item = sqlx::query_as::<_, MediaItem>("SELECT * FROM items WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(item)
    }

    /// Counts items by download status.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn count_by_status(&self, status: DownloadStatus) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM items WHERE status = ?")
            .bind(status.as_i64())
            .fetch_one(self.db.pool())
            .await?;

        Ok(row.0)
    }

    /// Counts transaction log entries of the given kind for an item.
    ///
    /// The log is an audit trail only; the engine never consults it for
    /// control decisions.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn count_transactions(&self, item_id: &str, kind: TransactionKind) -> Result<i64> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM transactions WHERE item_id = ? AND kind = ?")
                .bind(item_id)
                .bind(kind.as_str())
                .fetch_one(self.db.pool())
                .await?;

        Ok(row.0)
    }

    /// Upserts an opaque credential blob for the given identity.
    ///
    /// The blob is never interpreted by the store; at most one row exists
    /// per identity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the upsert fails.
    #[instrument(skip(self, blob), fields(blob_len = blob.len()))]
    pub async fn store_credentials(&self, id: &str, blob: &[u8]) -> Result<()> {
        sqlx::query(
            r"INSERT INTO oauth (id, credentials) VALUES (?, ?)
              ON CONFLICT(id) DO UPDATE SET credentials = excluded.credentials",
        )
        .bind(id)
        .bind(blob)
        .execute(self.db.pool())
        .await?;

        Ok(())
    }

    /// Looks up a stored credential blob.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn get_credentials(&self, id: &str) -> Result<Option<Vec<u8>>> {
        let row: Option<(Vec<u8>,)> = sqlx::query_as("SELECT credentials FROM oauth WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.map(|(blob,)| blob))
    }
}
