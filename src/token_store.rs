// ABOUTME: Persisted client session state for the Meridian client
// ABOUTME: Bearer token pair and selected organization, file-backed or in-memory
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Meridian Labs

//! # Session Token Storage
//!
//! The client persists exactly three things between runs: the access
//! token, the refresh token, and the selected organization id. They are
//! cleared together on logout or when a refresh attempt fails.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::errors::{ClientError, ClientResult};

/// The persisted session state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTokens {
    /// Short-lived bearer token attached to every authenticated request
    pub access_token: String,
    /// Long-lived token used to mint a new access token
    pub refresh_token: String,
    /// Selected organization, sent as the org-selector header
    #[serde(default)]
    pub current_org: Option<i64>,
}

/// Pluggable storage for the session state
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Load the stored session, if any
    async fn load(&self) -> ClientResult<Option<SessionTokens>>;

    /// Persist the session, replacing any previous one
    async fn save(&self, tokens: &SessionTokens) -> ClientResult<()>;

    /// Remove the stored session
    async fn clear(&self) -> ClientResult<()>;
}

/// File-backed store writing JSON under the user's config directory
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Create a store at an explicit path
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a store at the platform default location
    /// (`<config dir>/meridian/session.json`)
    ///
    /// # Errors
    ///
    /// Returns an error if the platform has no config directory.
    pub fn from_default_location() -> ClientResult<Self> {
        let base = dirs::config_dir()
            .ok_or_else(|| ClientError::storage("no user config directory available"))?;
        Ok(Self::new(base.join("meridian").join("session.json")))
    }

    /// The path this store reads and writes
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> ClientResult<Option<SessionTokens>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ClientError::storage(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )))
            }
        };

        let tokens: SessionTokens = serde_json::from_slice(&raw).map_err(|e| {
            ClientError::storage(format!("corrupt session file {}: {e}", self.path.display()))
        })?;
        Ok(Some(tokens))
    }

    async fn save(&self, tokens: &SessionTokens) -> ClientResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ClientError::storage(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let raw = serde_json::to_vec_pretty(tokens)
            .map_err(|e| ClientError::storage(format!("failed to encode session: {e}")))?;

        tokio::fs::write(&self.path, raw).await.map_err(|e| {
            ClientError::storage(format!("failed to write {}: {e}", self.path.display()))
        })?;
        debug!("session saved to {}", self.path.display());
        Ok(())
    }

    async fn clear(&self) -> ClientResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ClientError::storage(format!(
                "failed to remove {}: {e}",
                self.path.display()
            ))),
        }
    }
}

/// In-memory store for tests and embedded use
#[derive(Default)]
pub struct MemoryTokenStore {
    inner: RwLock<Option<SessionTokens>>,
}

impl MemoryTokenStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with a session
    #[must_use]
    pub fn with_tokens(tokens: SessionTokens) -> Self {
        Self {
            inner: RwLock::new(Some(tokens)),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> ClientResult<Option<SessionTokens>> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, tokens: &SessionTokens) -> ClientResult<()> {
        *self.inner.write().await = Some(tokens.clone());
        Ok(())
    }

    async fn clear(&self) -> ClientResult<()> {
        *self.inner.write().await = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn sample_tokens() -> SessionTokens {
        SessionTokens {
            access_token: "access-abc".into(),
            refresh_token: "refresh-def".into(),
            current_org: Some(7),
        }
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("nested").join("session.json"));

        assert!(store.load().await.unwrap().is_none());

        store.save(&sample_tokens()).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(sample_tokens()));

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
        // Clearing twice is fine
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        tokio::fs::write(&path, b"not json").await.unwrap();

        let store = FileTokenStore::new(path);
        assert!(store.load().await.is_err());
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryTokenStore::new();
        assert!(store.load().await.unwrap().is_none());
        store.save(&sample_tokens()).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(sample_tokens()));
        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }

    #[test]
    fn test_tokens_default_org_is_none() {
        let tokens: SessionTokens =
            serde_json::from_str(r#"{"access_token": "a", "refresh_token": "r"}"#).unwrap();
        assert_eq!(tokens.current_org, None);
    }
}
