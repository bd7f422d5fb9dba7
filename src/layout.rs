//! Storage layout strategy: mapping item metadata to a relative directory.
//!
//! The mapping is a pure function of the metadata and is injectable so
//! alternative layouts can be swapped in without touching the engine.

use chrono::{DateTime, Datelike, Utc};
use thiserror::Error;

use crate::remote::ItemMetadata;

/// Errors from path mapping.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// The item's creation timestamp is not ISO-8601.
    #[error("invalid creation timestamp '{value}' for item {id}: {source}")]
    InvalidTimestamp {
        /// Item identity whose timestamp failed to parse.
        id: String,
        /// The raw timestamp string.
        value: String,
        /// The underlying parse error.
        #[source]
        source: chrono::ParseError,
    },
}

/// Strategy mapping item metadata to a relative storage directory.
///
/// Implementations must be pure and stateless: the same metadata always
/// maps to the same directory, so re-running metadata ingestion after an
/// interruption records identical paths.
pub trait PathMapper: Send + Sync {
    /// Returns the relative directory (with trailing separator) for an item.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError`] when the metadata cannot be mapped.
    fn relative_path(&self, meta: &ItemMetadata) -> Result<String, LayoutError>;
}

/// Default layout: one directory per creation date, `YYYY/MM/DD/`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatePathMapper;

impl PathMapper for DatePathMapper {
    fn relative_path(&self, meta: &ItemMetadata) -> Result<String, LayoutError> {
        let date = DateTime::parse_from_rfc3339(&meta.creation_time)
            .map_err(|source| LayoutError::InvalidTimestamp {
                id: meta.id.clone(),
                value: meta.creation_time.clone(),
                source,
            })?
            .with_timezone(&Utc)
            .date_naive();

        Ok(format!(
            "{y}/{m:02}/{d:02}/",
            y = date.year(),
            m = date.month(),
            d = date.day()
        ))
    }
}
