//! Remote media library client boundary.
//!
//! The sync engine consumes the remote service exclusively through the
//! [`RemoteLibrary`] trait: paginated metadata listing over a time range,
//! batched content retrieval, and an ad-hoc single-item lookup. Pagination
//! and transport mechanics live entirely behind the trait; the engine sees
//! a lazy sequence in whatever order the service returns.
//!
//! [`PhotosClient`] is the production implementation against the Google
//! Photos REST API.

mod error;
mod photos;

pub use error::RemoteError;
pub use photos::PhotosClient;

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream::BoxStream;

use crate::store::MediaKind;

/// A closed time interval bounding one metadata-listing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    /// Inclusive lower bound.
    pub start: DateTime<Utc>,
    /// Inclusive upper bound.
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Creates a new time range.
    #[must_use]
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The full representable range: unix epoch up to now.
    #[must_use]
    pub fn full() -> Self {
        Self {
            start: DateTime::UNIX_EPOCH,
            end: Utc::now(),
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} .. {}]",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

/// Metadata for one remote item, as reported by the service.
#[derive(Debug, Clone)]
pub struct ItemMetadata {
    /// Opaque, globally unique identity.
    pub id: String,
    /// Creation timestamp as an ISO-8601 string; parsed at the store boundary.
    pub creation_time: String,
    /// Filename the service suggests for the content.
    pub filename: String,
    /// MIME type of the content.
    pub mime_type: String,
    /// Whether the item is a photo or a video.
    pub kind: MediaKind,
    /// Opaque content reference (not permanent; re-resolved before download).
    pub content_ref: String,
}

/// One entry in a batched content-download request.
#[derive(Debug, Clone)]
pub struct ContentRequest {
    /// Identity of the item to fetch.
    pub id: String,
    /// Directory the content must be written into (created if absent).
    pub target_dir: PathBuf,
    /// Filename to store the content under.
    pub filename: String,
    /// Media kind; selects full-quality stream vs. full-resolution original.
    pub kind: MediaKind,
}

/// Capability set the sync engine consumes from the remote service.
#[async_trait]
pub trait RemoteLibrary: Send + Sync {
    /// Streams item metadata within the given time range.
    ///
    /// Pagination is handled by the implementation; the returned order is
    /// whatever the service produces and callers must not assume sorting.
    fn list_items(&self, range: TimeRange) -> BoxStream<'_, Result<ItemMetadata, RemoteError>>;

    /// Fetches content for a batch of items, returning the identities that
    /// were successfully written to disk.
    ///
    /// Ids absent from the returned set failed for this attempt. Writes are
    /// atomic (write-then-publish) so a crash never leaves a truncated file
    /// at a published path.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Auth`] when the service rejects the call
    /// entirely; per-item failures do not error the batch.
    async fn batch_fetch_content(
        &self,
        requests: &[ContentRequest],
    ) -> Result<HashSet<String>, RemoteError>;

    /// Looks up a single item's metadata.
    ///
    /// Diagnostic/query use; not part of the sync loop proper.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] when the lookup fails.
    async fn get_item(&self, id: &str) -> Result<ItemMetadata, RemoteError>;
}
