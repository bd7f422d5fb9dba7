//! Google Photos implementation of the remote library client.
//!
//! Listing goes through `mediaItems:search` with a date filter and page-token
//! pagination; content retrieval re-resolves each item first because base
//! URLs are short-lived, then streams the bytes to a temp file that is
//! renamed into place only once complete.

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Datelike;
use futures_util::stream::BoxStream;
use futures_util::{StreamExt, stream};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument, warn};

use super::error::RemoteError;
use super::{ContentRequest, ItemMetadata, RemoteLibrary, TimeRange};
use crate::auth::TokenSource;
use crate::store::MediaKind;

/// Production endpoint of the Google Photos library API.
const DEFAULT_BASE_URL: &str = "https://photoslibrary.googleapis.com";

/// Items requested per listing page.
const PAGE_SIZE: u32 = 75;

/// Connect timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Read timeout in seconds. Generous to accommodate large video streams.
const READ_TIMEOUT_SECS: u64 = 300;

/// Remote library client for Google Photos.
///
/// Created once and reused; the underlying reqwest client pools
/// connections across listing and content requests.
#[derive(Clone)]
pub struct PhotosClient {
    http: Client,
    base_url: String,
    tokens: Arc<dyn TokenSource>,
}

impl PhotosClient {
    /// Creates a client against the production API endpoint.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    pub fn new(tokens: Arc<dyn TokenSource>) -> Self {
        Self::with_base_url(tokens, DEFAULT_BASE_URL)
    }

    /// Creates a client against an explicit endpoint (used by tests).
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_base_url(tokens: Arc<dyn TokenSource>, base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .read_timeout(Duration::from_secs(READ_TIMEOUT_SECS))
            .gzip(true)
            .build()
            .expect("failed to build HTTP client with static configuration");

        Self {
            http,
            base_url: base_url.into(),
            tokens,
        }
    }

    async fn bearer_token(&self, context: &str) -> Result<String, RemoteError> {
        self.tokens
            .access_token()
            .await
            .map_err(|e| RemoteError::auth(0, format!("{context}: {e}")))
    }

    /// Fetches one listing page for the given range.
    #[instrument(skip(self, page_token), fields(range = %range))]
    async fn search_page(
        &self,
        range: TimeRange,
        page_token: Option<String>,
    ) -> Result<SearchResponse, RemoteError> {
        let context = "listing items";
        let token = self.bearer_token(context).await?;

        let body = SearchRequest {
            page_size: PAGE_SIZE,
            page_token,
            filters: SearchFilters {
                date_filter: DateFilter {
                    ranges: vec![DateRange {
                        start_date: ApiDate::from_datetime(range.start),
                        end_date: ApiDate::from_datetime(range.end),
                    }],
                },
            },
        };

        let response = self
            .http
            .post(format!("{}/v1/mediaItems:search", self.base_url))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| RemoteError::network(context, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::http_status(status.as_u16(), context));
        }

        response
            .json::<SearchResponse>()
            .await
            .map_err(|e| RemoteError::decode(context, e))
    }

    /// Downloads one item's content and atomically publishes it.
    ///
    /// The item is re-queried first to obtain a fresh base URL; the stored
    /// content reference is not permanent. Bytes go to a `.part` file that
    /// is renamed to the final name only after a successful flush, so an
    /// interrupted download never leaves a truncated published file.
    #[instrument(skip(self, request), fields(id = %request.id, filename = %request.filename))]
    async fn fetch_one(&self, request: &ContentRequest) -> Result<PathBuf, RemoteError> {
        let meta = self.get_item(&request.id).await?;
        let context = format!("downloading {}", request.filename);

        let suffix = match request.kind {
            MediaKind::Video => "=dv",
            MediaKind::Photo => "=d",
        };
        let url = format!("{}{}", meta.content_ref, suffix);

        tokio::fs::create_dir_all(&request.target_dir)
            .await
            .map_err(|e| RemoteError::io(&request.target_dir, e))?;

        let final_path = request.target_dir.join(&request.filename);
        let part_path = request.target_dir.join(format!("{}.part", request.filename));

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| RemoteError::network(context.clone(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::http_status(status.as_u16(), context));
        }

        if let Err(e) = stream_to_file(&part_path, response, &context).await {
            // Best-effort cleanup of the partial file
            let _ = tokio::fs::remove_file(&part_path).await;
            return Err(e);
        }

        tokio::fs::rename(&part_path, &final_path)
            .await
            .map_err(|e| RemoteError::io(&final_path, e))?;

        Ok(final_path)
    }
}

#[async_trait]
impl RemoteLibrary for PhotosClient {
    fn list_items(&self, range: TimeRange) -> BoxStream<'_, Result<ItemMetadata, RemoteError>> {
        struct PageState {
            token: Option<String>,
            buffer: VecDeque<ItemMetadata>,
            exhausted: bool,
        }

        let state = PageState {
            token: None,
            buffer: VecDeque::new(),
            exhausted: false,
        };

        Box::pin(stream::try_unfold(state, move |mut state| async move {
            loop {
                if let Some(item) = state.buffer.pop_front() {
                    return Ok(Some((item, state)));
                }
                if state.exhausted {
                    return Ok(None);
                }

                let page = self.search_page(range, state.token.take()).await?;
                state.token = page.next_page_token;
                // The service signals the end with an empty page or a missing token.
                state.exhausted = page.media_items.is_empty() || state.token.is_none();
                state
                    .buffer
                    .extend(page.media_items.into_iter().map(ItemMetadata::from));
            }
        }))
    }

    #[instrument(skip(self, requests), fields(batch_size = requests.len()))]
    async fn batch_fetch_content(
        &self,
        requests: &[ContentRequest],
    ) -> Result<HashSet<String>, RemoteError> {
        let mut written = HashSet::new();

        for request in requests {
            match self.fetch_one(request).await {
                Ok(path) => {
                    debug!(id = %request.id, path = %path.display(), "content written");
                    written.insert(request.id.clone());
                }
                Err(e) if e.is_auth() => return Err(e),
                Err(e) => {
                    warn!(id = %request.id, error = %e, "content fetch failed");
                }
            }
        }

        Ok(written)
    }

    #[instrument(skip(self))]
    async fn get_item(&self, id: &str) -> Result<ItemMetadata, RemoteError> {
        let context = format!("fetching item {id}");
        let token = self.bearer_token(&context).await?;

        let response = self
            .http
            .get(format!("{}/v1/mediaItems/{id}", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| RemoteError::network(context.clone(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::http_status(status.as_u16(), context));
        }

        let payload = response
            .json::<MediaItemPayload>()
            .await
            .map_err(|e| RemoteError::decode(context, e))?;

        Ok(payload.into())
    }
}

/// Streams a response body to the given path.
async fn stream_to_file(
    path: &PathBuf,
    response: reqwest::Response,
    context: &str,
) -> Result<(), RemoteError> {
    let file = File::create(path)
        .await
        .map_err(|e| RemoteError::io(path.clone(), e))?;
    let mut writer = BufWriter::new(file);
    let mut body = response.bytes_stream();

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| RemoteError::network(context.to_string(), e))?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| RemoteError::io(path.clone(), e))?;
    }

    // Ensure all data is flushed before the caller publishes the file
    writer
        .flush()
        .await
        .map_err(|e| RemoteError::io(path.clone(), e))?;

    Ok(())
}

// Wire types for the Photos API.

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest {
    page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_token: Option<String>,
    filters: SearchFilters,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchFilters {
    date_filter: DateFilter,
}

#[derive(Debug, Serialize)]
struct DateFilter {
    ranges: Vec<DateRange>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DateRange {
    start_date: ApiDate,
    end_date: ApiDate,
}

#[derive(Debug, Serialize)]
struct ApiDate {
    year: i32,
    month: u32,
    day: u32,
}

impl ApiDate {
    fn from_datetime(dt: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            year: dt.year(),
            month: dt.month(),
            day: dt.day(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    media_items: Vec<MediaItemPayload>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MediaItemPayload {
    id: String,
    #[serde(default)]
    base_url: String,
    #[serde(default)]
    mime_type: String,
    filename: String,
    media_metadata: MediaMetadataPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MediaMetadataPayload {
    creation_time: String,
    video: Option<serde_json::Value>,
}

impl From<MediaItemPayload> for ItemMetadata {
    fn from(payload: MediaItemPayload) -> Self {
        let kind = if payload.media_metadata.video.is_some() {
            MediaKind::Video
        } else {
            MediaKind::Photo
        };
        Self {
            id: payload.id,
            creation_time: payload.media_metadata.creation_time,
            filename: payload.filename,
            mime_type: payload.mime_type,
            kind,
            content_ref: payload.base_url,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_media_item_payload_photo_kind() {
        let payload: MediaItemPayload = serde_json::from_str(
            r#"{
                "id": "abc",
                "baseUrl": "https://lh3.example/abc",
                "mimeType": "image/jpeg",
                "filename": "IMG_0001.jpg",
                "mediaMetadata": { "creationTime": "2019-06-08T12:00:00Z" }
            }"#,
        )
        .unwrap();

        let meta: ItemMetadata = payload.into();
        assert_eq!(meta.kind, MediaKind::Photo);
        assert_eq!(meta.content_ref, "https://lh3.example/abc");
        assert_eq!(meta.creation_time, "2019-06-08T12:00:00Z");
    }

    #[test]
    fn test_media_item_payload_video_kind() {
        let payload: MediaItemPayload = serde_json::from_str(
            r#"{
                "id": "vid",
                "baseUrl": "https://lh3.example/vid",
                "mimeType": "video/mp4",
                "filename": "MOV_0001.mp4",
                "mediaMetadata": {
                    "creationTime": "2019-06-08T12:00:00Z",
                    "video": { "fps": 30 }
                }
            }"#,
        )
        .unwrap();

        let meta: ItemMetadata = payload.into();
        assert_eq!(meta.kind, MediaKind::Video);
    }

    #[test]
    fn test_search_request_serializes_camel_case() {
        let body = SearchRequest {
            page_size: PAGE_SIZE,
            page_token: None,
            filters: SearchFilters {
                date_filter: DateFilter {
                    ranges: vec![DateRange {
                        start_date: ApiDate {
                            year: 1970,
                            month: 1,
                            day: 1,
                        },
                        end_date: ApiDate {
                            year: 2019,
                            month: 6,
                            day: 8,
                        },
                    }],
                },
            },
        };

        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"pageSize\":75"), "got: {json}");
        assert!(json.contains("\"dateFilter\""), "got: {json}");
        assert!(json.contains("\"startDate\""), "got: {json}");
        assert!(
            !json.contains("pageToken"),
            "absent token must be omitted: {json}"
        );
    }

    #[test]
    fn test_search_response_tolerates_empty_body() {
        let response: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(response.media_items.is_empty());
        assert!(response.next_page_token.is_none());
    }
}
