//! Sync engine: windowed metadata ingestion, batched downloads, resync.
//!
//! The engine keeps the state store and the remote library in agreement:
//! it computes which time windows of metadata still need fetching, ingests
//! listings idempotently, downloads pending content in fixed-size batches
//! with one retry-pool pass, and reconciles local files that have vanished.
//!
//! There is no transaction spanning a whole sync run. Because metadata
//! insertion is idempotent and download selection is status-driven,
//! re-invoking [`SyncEngine::drive`] after any interruption resumes
//! correctly without redoing completed work.
//!
//! # Example
//!
//! ```ignore
//! use photosync_core::sync::SyncEngine;
//!
//! let engine = SyncEngine::new(store, client, PathBuf::from("/photos"));
//! engine.drive(None, true).await?;
//! ```

mod window;

pub use window::plan_windows;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use futures_util::TryStreamExt;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::layout::{DatePathMapper, LayoutError, PathMapper};
use crate::remote::{ContentRequest, RemoteError, RemoteLibrary, TimeRange};
use crate::store::{MediaItem, MediaStore, StoreError};

/// Number of pending items submitted per content-download batch.
pub const DOWNLOAD_BATCH_SIZE: usize = 16;

/// Errors from sync engine operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The remote service rejected the invocation's authorization.
    ///
    /// Fatal for the current run; requires fresh credentials.
    #[error("authorization failure: {0}")]
    Auth(#[source] RemoteError),

    /// Non-auth remote failure that aborted a metadata window.
    #[error("remote error: {0}")]
    Remote(#[source] RemoteError),

    /// State store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Path mapping failed for an item.
    #[error("layout error: {0}")]
    Layout(#[from] LayoutError),
}

impl From<RemoteError> for SyncError {
    fn from(error: RemoteError) -> Self {
        if error.is_auth() {
            Self::Auth(error)
        } else {
            Self::Remote(error)
        }
    }
}

/// Counters from one metadata ingestion pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FetchStats {
    /// Items observed for the first time and inserted as pending.
    pub added: u64,
    /// Items already present; reported by the store as no-ops.
    pub duplicates: u64,
}

/// Counters from one download pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DownloadStats {
    /// Items confirmed written and marked downloaded.
    pub downloaded: u64,
    /// Items that entered the retry pool after their first attempt.
    pub retried: u64,
    /// Items still pending after the retry pass; picked up next run.
    pub failed: u64,
}

/// Orchestrates synchronization between the remote library and local storage.
///
/// Execution is strictly sequential: windows one at a time, batches one at
/// a time, each call running to completion before status is recorded. An
/// item is marked downloaded only after the client has confirmed its bytes
/// were written, so interruption between batches leaves the store
/// consistent.
pub struct SyncEngine {
    store: MediaStore,
    client: Arc<dyn RemoteLibrary>,
    root: PathBuf,
    mapper: Arc<dyn PathMapper>,
}

impl SyncEngine {
    /// Creates an engine with the default date-based storage layout.
    #[must_use]
    pub fn new(store: MediaStore, client: Arc<dyn RemoteLibrary>, root: PathBuf) -> Self {
        Self::with_mapper(store, client, root, Arc::new(DatePathMapper))
    }

    /// Creates an engine with an explicit path-mapping strategy.
    #[must_use]
    pub fn with_mapper(
        store: MediaStore,
        client: Arc<dyn RemoteLibrary>,
        root: PathBuf,
        mapper: Arc<dyn PathMapper>,
    ) -> Self {
        Self {
            store,
            client,
            root,
            mapper,
        }
    }

    /// Returns the sync root directory.
    #[must_use]
    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Fetches remote metadata and ingests it into the store.
    ///
    /// Window selection follows [`plan_windows`]: an explicit range wins,
    /// otherwise the heuristic fetches only before the oldest and after
    /// the newest known item. Listings arrive in whatever order the
    /// service produces; every item goes through the idempotent
    /// [`MediaStore::add_item`], and duplicates are expected rather than
    /// logged as errors.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Auth`] when the service rejects the call, or
    /// the first store/remote/layout error encountered.
    #[instrument(skip(self))]
    pub async fn fetch_metadata(
        &self,
        explicit: Option<TimeRange>,
        heuristic: bool,
    ) -> Result<FetchStats, SyncError> {
        let extremes = self.store.extremes().await?;
        let windows = plan_windows(explicit, heuristic, extremes);

        let mut stats = FetchStats::default();
        for window in windows {
            info!(window = %window, "fetching metadata window");

            let mut items = self.client.list_items(window);
            while let Some(meta) = items.try_next().await? {
                let rel_path = self.mapper.relative_path(&meta)?;
                if self.store.add_item(&meta, &rel_path).await? {
                    stats.added += 1;
                } else {
                    debug!(id = %meta.id, "already known");
                    stats.duplicates += 1;
                }
            }
        }

        info!(
            added = stats.added,
            duplicates = stats.duplicates,
            "metadata fetch complete"
        );
        Ok(stats)
    }

    /// Downloads content for all pending items, oldest first.
    ///
    /// Items are partitioned into batches of [`DOWNLOAD_BATCH_SIZE`];
    /// failures accumulate into a single retry pool which gets exactly one
    /// additional pass. Items still failing stay pending and are reported
    /// as a warning; the next invocation picks them up automatically.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Auth`] when the service rejects a call
    /// entirely; individual item failures never abort the run.
    #[instrument(skip(self))]
    pub async fn download_pending(&self) -> Result<DownloadStats, SyncError> {
        let pending: Vec<MediaItem> = self.store.pending_items().try_collect().await?;
        if pending.is_empty() {
            debug!("no pending items");
            return Ok(DownloadStats::default());
        }

        info!(pending = pending.len(), "downloading pending items");
        let mut stats = DownloadStats::default();

        let mut retry_pool = Vec::new();
        for batch in pending.chunks(DOWNLOAD_BATCH_SIZE) {
            let failed = self.fetch_batch(batch).await?;
            stats.downloaded += (batch.len() - failed.len()) as u64;
            retry_pool.extend(failed);
        }

        if !retry_pool.is_empty() {
            stats.retried = retry_pool.len() as u64;
            info!(count = retry_pool.len(), "retrying failed downloads");

            let mut still_failed = Vec::new();
            for batch in retry_pool.chunks(DOWNLOAD_BATCH_SIZE) {
                let failed = self.fetch_batch(batch).await?;
                stats.downloaded += (batch.len() - failed.len()) as u64;
                still_failed.extend(failed);
            }

            stats.failed = still_failed.len() as u64;
            if !still_failed.is_empty() {
                warn!(
                    count = still_failed.len(),
                    "items still pending after retry pass; they will be retried on the next run"
                );
            }
        }

        info!(
            downloaded = stats.downloaded,
            retried = stats.retried,
            failed = stats.failed,
            "download pass complete"
        );
        Ok(stats)
    }

    /// Submits one batch to the remote client and records the outcome.
    ///
    /// Returns the items that failed this attempt. A non-auth failure of
    /// the whole call fails only this batch; auth failures propagate.
    async fn fetch_batch(&self, batch: &[MediaItem]) -> Result<Vec<MediaItem>, SyncError> {
        let requests: Vec<ContentRequest> = batch
            .iter()
            .map(|item| ContentRequest {
                id: item.id.clone(),
                target_dir: self.root.join(&item.path),
                filename: item.filename.clone(),
                kind: item.kind(),
            })
            .collect();

        let written = match self.client.batch_fetch_content(&requests).await {
            Ok(written) => written,
            Err(e) if e.is_auth() => return Err(e.into()),
            Err(e) => {
                warn!(error = %e, batch_size = batch.len(), "batch fetch failed");
                HashSet::new()
            }
        };

        let ok_ids: Vec<String> = batch
            .iter()
            .filter(|item| written.contains(&item.id))
            .map(|item| item.id.clone())
            .collect();
        if !ok_ids.is_empty() {
            self.store.mark_downloaded(&ok_ids, true).await?;
        }

        Ok(batch
            .iter()
            .filter(|item| !written.contains(&item.id))
            .cloned()
            .collect())
    }

    /// Reconciles recorded status against the local filesystem.
    ///
    /// Every downloaded item whose file is missing at `root/path/filename`
    /// is demoted back to pending. An item whose presence cannot be
    /// determined (filesystem error rather than a clean not-found) is
    /// skipped with a warning. Returns the number of demoted items;
    /// re-downloading is left to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Store`] if a store operation fails.
    #[instrument(skip(self))]
    pub async fn resync(&self) -> Result<u64, SyncError> {
        let downloaded: Vec<MediaItem> = self.store.downloaded_items().try_collect().await?;

        let mut vanished = 0u64;
        for item in downloaded {
            let path = self.root.join(&item.path).join(&item.filename);
            match tokio::fs::try_exists(&path).await {
                Ok(true) => continue,
                Ok(false) => {}
                // Unreadable is not the same as vanished; leave the item
                // alone rather than trigger a re-download.
                Err(e) => {
                    warn!(id = %item.id, path = %path.display(), error = %e, "cannot check local file; skipping");
                    continue;
                }
            }

            warn!(id = %item.id, path = %path.display(), "local file vanished; demoting to pending");
            self.store
                .mark_downloaded(std::slice::from_ref(&item.id), false)
                .await?;
            vanished += 1;
        }

        info!(vanished, "resync complete");
        Ok(vanished)
    }

    /// Runs a full sync pass: metadata fetch, then pending downloads.
    ///
    /// The externally invoked entry point. Safe to re-invoke after any
    /// interruption; completed work is never redone.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error; see [`fetch_metadata`] and
    /// [`download_pending`].
    ///
    /// [`fetch_metadata`]: SyncEngine::fetch_metadata
    /// [`download_pending`]: SyncEngine::download_pending
    #[instrument(skip(self))]
    pub async fn drive(
        &self,
        explicit: Option<TimeRange>,
        heuristic: bool,
    ) -> Result<(), SyncError> {
        self.fetch_metadata(explicit, heuristic).await?;
        self.download_pending().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    // Engine behavior is covered end to end in tests/sync_integration.rs
    // with a scripted remote client; these cover the error routing.

    use super::*;

    #[test]
    fn test_sync_error_routes_auth_separately() {
        let auth = SyncError::from(RemoteError::auth(401, "listing items"));
        assert!(matches!(auth, SyncError::Auth(_)));

        let other = SyncError::from(RemoteError::http_status(500, "listing items"));
        assert!(matches!(other, SyncError::Remote(_)));
    }

    #[test]
    fn test_download_batch_size_default() {
        assert_eq!(DOWNLOAD_BATCH_SIZE, 16);
    }

    #[test]
    fn test_stats_default_to_zero() {
        let fetch = FetchStats::default();
        assert_eq!(fetch.added, 0);
        assert_eq!(fetch.duplicates, 0);

        let download = DownloadStats::default();
        assert_eq!(download.downloaded, 0);
        assert_eq!(download.retried, 0);
        assert_eq!(download.failed, 0);
    }
}
