//! Authorization token handling.
//!
//! The remote client consumes tokens through the [`TokenSource`] trait.
//! Tokens persist between runs as an opaque blob in the state store's
//! credential table under one fixed identity; only this module knows the
//! blob's format (JSON-serialized [`StoredCredential`]). The engine and
//! the store never parse it.
//!
//! The interactive OAuth consent flow is out of scope; tokens enter the
//! system by being imported from a file (`--import-token`) or passed
//! directly (`--access-token`).

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::store::{MediaStore, StoreError};

/// Identity under which the credential blob is stored. At most one row.
pub const CRED_ID: &str = "installed.main";

/// Errors when acquiring or persisting tokens.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No credential is stored and none was supplied.
    #[error("no stored credential; import one with --import-token or pass --access-token")]
    MissingCredential,

    /// Credential persistence failed.
    #[error("credential storage error: {0}")]
    Store(#[from] StoreError),

    /// The stored blob could not be decoded by this module.
    #[error("stored credential blob is not valid: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Supplies an authorization token on demand.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Returns a bearer token for the remote service.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when no usable token is available.
    async fn access_token(&self) -> Result<String, AuthError>;
}

/// Credential payload as this module serializes it into the opaque blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCredential {
    /// Bearer token presented to the remote service.
    pub access_token: String,
    /// Refresh token, kept for a future refresh flow.
    pub refresh_token: Option<String>,
    /// Expiry as an ISO-8601 string, when known.
    pub expiry: Option<String>,
}

impl StoredCredential {
    /// Creates a credential holding only an access token.
    #[must_use]
    pub fn from_access_token(token: impl Into<String>) -> Self {
        Self {
            access_token: token.into(),
            refresh_token: None,
            expiry: None,
        }
    }
}

/// Persists and loads credentials through the state store's opaque blob API.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    store: MediaStore,
}

impl CredentialStore {
    /// Creates a credential store over the given state store.
    #[must_use]
    pub fn new(store: MediaStore) -> Self {
        Self { store }
    }

    /// Saves a credential under the fixed identity, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Store`] if persistence fails.
    #[instrument(skip(self, credential))]
    pub async fn save(&self, credential: &StoredCredential) -> Result<(), AuthError> {
        let blob = serde_json::to_vec(credential)?;
        self.store.store_credentials(CRED_ID, &blob).await?;
        Ok(())
    }

    /// Loads the stored credential, if any.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Store`] on lookup failure or
    /// [`AuthError::Decode`] if the blob is not this module's format.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Option<StoredCredential>, AuthError> {
        match self.store.get_credentials(CRED_ID).await? {
            Some(blob) => Ok(Some(serde_json::from_slice(&blob)?)),
            None => Ok(None),
        }
    }
}

/// Token source backed by the persisted credential.
#[derive(Debug, Clone)]
pub struct StoredTokenSource {
    credentials: CredentialStore,
}

impl StoredTokenSource {
    /// Creates a token source reading from the given credential store.
    #[must_use]
    pub fn new(credentials: CredentialStore) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl TokenSource for StoredTokenSource {
    async fn access_token(&self) -> Result<String, AuthError> {
        match self.credentials.load().await? {
            Some(credential) => Ok(credential.access_token),
            None => Err(AuthError::MissingCredential),
        }
    }
}

/// Token source holding a fixed token (tests, `--access-token`).
#[derive(Debug, Clone)]
pub struct StaticTokenSource {
    token: String,
}

impl StaticTokenSource {
    /// Creates a token source that always returns the given token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Convenience constructor returning an `Arc<dyn TokenSource>`.
    #[must_use]
    pub fn shared(token: impl Into<String>) -> Arc<dyn TokenSource> {
        Arc::new(Self::new(token))
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn access_token(&self) -> Result<String, AuthError> {
        Ok(self.token.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::Database;

    async fn credential_store() -> CredentialStore {
        let db = Database::new_in_memory().await.unwrap();
        CredentialStore::new(MediaStore::new(db))
    }

    #[tokio::test]
    async fn test_static_token_source_returns_token() {
        let source = StaticTokenSource::new("ya29.test");
        assert_eq!(source.access_token().await.unwrap(), "ya29.test");
    }

    #[tokio::test]
    async fn test_stored_token_source_missing_credential_errors() {
        let source = StoredTokenSource::new(credential_store().await);
        let result = source.access_token().await;
        assert!(matches!(result, Err(AuthError::MissingCredential)));
    }

    #[tokio::test]
    async fn test_credential_roundtrip_through_store() {
        let credentials = credential_store().await;

        let mut credential = StoredCredential::from_access_token("ya29.first");
        credential.refresh_token = Some("1//refresh".to_string());
        credentials.save(&credential).await.unwrap();

        let loaded = credentials.load().await.unwrap().unwrap();
        assert_eq!(loaded.access_token, "ya29.first");
        assert_eq!(loaded.refresh_token.as_deref(), Some("1//refresh"));

        // Upsert replaces rather than accumulates
        credentials
            .save(&StoredCredential::from_access_token("ya29.second"))
            .await
            .unwrap();
        let loaded = credentials.load().await.unwrap().unwrap();
        assert_eq!(loaded.access_token, "ya29.second");
    }

    #[tokio::test]
    async fn test_stored_token_source_reads_persisted_token() {
        let credentials = credential_store().await;
        credentials
            .save(&StoredCredential::from_access_token("ya29.persisted"))
            .await
            .unwrap();

        let source = StoredTokenSource::new(credentials);
        assert_eq!(source.access_token().await.unwrap(), "ya29.persisted");
    }
}
