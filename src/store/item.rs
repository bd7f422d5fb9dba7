//! Media item types and status definitions.

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::warn;

/// Kind of media an item holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// Still image; full-resolution original is fetched.
    Photo,
    /// Video; full-quality stream is fetched.
    Video,
}

impl MediaKind {
    /// Returns the database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "photo" => Ok(Self::Photo),
            "video" => Ok(Self::Video),
            _ => Err(format!("invalid media kind: {s}")),
        }
    }
}

/// Download status of an item.
///
/// Stored as INTEGER 0/1. An item only ever moves `Pending` → `Downloaded`
/// (successful fetch) or `Downloaded` → `Pending` (vanished-file
/// reconciliation); rows are never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    /// Known from metadata, content not yet present locally.
    Pending,
    /// Content confirmed written to local storage.
    Downloaded,
}

impl DownloadStatus {
    /// Returns the database integer representation.
    #[must_use]
    pub fn as_i64(&self) -> i64 {
        match self {
            Self::Pending => 0,
            Self::Downloaded => 1,
        }
    }

    /// Parses the database integer representation.
    ///
    /// Any non-zero value is treated as `Downloaded`.
    #[must_use]
    pub fn from_i64(value: i64) -> Self {
        if value == 0 {
            Self::Pending
        } else {
            Self::Downloaded
        }
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Downloaded => write!(f, "downloaded"),
        }
    }
}

/// Event kind recorded in the append-only transaction log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    /// First metadata observation of an item.
    Added,
    /// Content confirmed written to disk.
    Downloaded,
}

impl TransactionKind {
    /// Returns the database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Downloaded => "downloaded",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single media item known to the state store.
#[derive(Debug, Clone, FromRow)]
pub struct MediaItem {
    /// Remote item identity (opaque, globally unique).
    pub id: String,
    /// Creation timestamp in unix seconds; source of truth for ordering.
    pub creation_time: i64,
    /// Relative storage directory under the sync root.
    pub path: String,
    /// MIME type reported by the remote service.
    pub mime_type: String,
    /// Filename the content is stored under.
    pub filename: String,
    /// Media kind (stored as text, parsed via `kind()`).
    #[sqlx(rename = "kind")]
    pub kind_str: String,
    /// Download status (stored as integer, parsed via `status()`).
    #[sqlx(rename = "status")]
    pub status_int: i64,
}

impl MediaItem {
    /// Returns the parsed media kind.
    ///
    /// Falls back to `Photo` if the stored string is invalid. The schema's
    /// CHECK constraint makes that unreachable today, so a hit means the
    /// schema and this code have drifted apart.
    #[must_use]
    pub fn kind(&self) -> MediaKind {
        self.kind_str.parse().unwrap_or_else(|_| {
            warn!(id = %self.id, kind = %self.kind_str, "unknown media kind in store; treating as photo");
            MediaKind::Photo
        })
    }

    /// Returns the parsed download status.
    #[must_use]
    pub fn status(&self) -> DownloadStatus {
        DownloadStatus::from_i64(self.status_int)
    }
}

impl fmt::Display for MediaItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MediaItem {{ id: {}, filename: {}, status: {} }}",
            self.id,
            self.filename,
            self.status()
        )
    }
}
