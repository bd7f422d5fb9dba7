//! Error types for the remote library client.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur talking to the remote media service.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The service rejected the call entirely (expired/invalid credential).
    ///
    /// Fatal for the current sync invocation; there is no point retrying
    /// without fresh authorization.
    #[error("authorization rejected by remote service (HTTP {status}): {context}")]
    Auth {
        /// The HTTP status code (401/403), or 0 when no token was available.
        status: u16,
        /// What the client was doing when authorization failed.
        context: String,
    },

    /// Network-level error (DNS resolution, connection refused, TLS, etc.)
    #[error("network error during {context}: {source}")]
    Network {
        /// What the client was doing when the error occurred.
        context: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Non-auth HTTP error response from the service.
    #[error("HTTP {status} during {context}")]
    HttpStatus {
        /// The HTTP status code.
        status: u16,
        /// What the client was doing when the error occurred.
        context: String,
    },

    /// The service answered with a body the client could not decode.
    #[error("invalid response during {context}: {source}")]
    Decode {
        /// What the client was doing when the error occurred.
        context: String,
        /// The underlying decode error.
        #[source]
        source: reqwest::Error,
    },

    /// File system error while writing content locally.
    ///
    /// Fatal for that item only; siblings in the batch are unaffected.
    #[error("IO error writing {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl RemoteError {
    /// Creates an authorization failure.
    pub fn auth(status: u16, context: impl Into<String>) -> Self {
        Self::Auth {
            status,
            context: context.into(),
        }
    }

    /// Creates a network error.
    pub fn network(context: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            context: context.into(),
            source,
        }
    }

    /// Creates an HTTP status error, mapping 401/403 to [`RemoteError::Auth`].
    pub fn http_status(status: u16, context: impl Into<String>) -> Self {
        if status == 401 || status == 403 {
            Self::Auth {
                status,
                context: context.into(),
            }
        } else {
            Self::HttpStatus {
                status,
                context: context.into(),
            }
        }
    }

    /// Creates a decode error.
    pub fn decode(context: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Decode {
            context: context.into(),
            source,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` for authorization failures, which abort the whole
    /// sync invocation rather than a single item or batch.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }
}
