// ABOUTME: TTL cache with in-flight request de-duplication for server resources
// ABOUTME: Explicit service object passed by dependency injection, no module globals
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Meridian Labs

//! # Resource Cache
//!
//! Read-mostly server resources (subscription, usage, organization list)
//! are cached with a per-resource TTL. Concurrent requests for the same
//! key are de-duplicated: a per-key async lock guarantees at most one
//! in-flight fetch per cache key, with late arrivals served from the
//! entry the first fetch stored.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::errors::{ClientError, ClientResult};

/// Server resource types tracked by the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheResource {
    /// Subscription for the selected organization
    Subscription,
    /// Monthly usage summary
    Usage,
    /// The caller's organization list
    Organizations,
}

impl fmt::Display for CacheResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subscription => write!(f, "subscription"),
            Self::Usage => write!(f, "usage"),
            Self::Organizations => write!(f, "organizations"),
        }
    }
}

/// Structured cache key scoped to an organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Organization scope, `None` for user-level resources
    pub org: Option<i64>,
    /// The cached resource
    pub resource: CacheResource,
}

impl CacheKey {
    /// Create a key scoped to an organization
    #[must_use]
    pub const fn org_scoped(org: i64, resource: CacheResource) -> Self {
        Self {
            org: Some(org),
            resource,
        }
    }

    /// Create a user-level key
    #[must_use]
    pub const fn user_scoped(resource: CacheResource) -> Self {
        Self {
            org: None,
            resource,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.org {
            Some(org) => write!(f, "org:{org}:{}", self.resource),
            None => write!(f, "user:{}", self.resource),
        }
    }
}

/// One cached value with its expiry
#[derive(Debug, Clone)]
struct CacheSlot {
    value: serde_json::Value,
    expires_at: Instant,
}

impl CacheSlot {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// TTL cache with per-key fetch de-duplication
///
/// Cloning is cheap and shares the underlying storage.
#[derive(Clone, Default)]
pub struct ResourceCache {
    entries: Arc<RwLock<HashMap<String, CacheSlot>>>,
    pending: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl ResourceCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a fresh entry, if one exists
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let entries = self.entries.read().await;
        let slot = entries.get(&key.to_string())?;
        if slot.is_expired() {
            return None;
        }
        serde_json::from_value(slot.value.clone()).ok()
    }

    /// Store a value with the given TTL
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized.
    pub async fn insert<T: Serialize>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl: Duration,
    ) -> ClientResult<()> {
        let encoded = serde_json::to_value(value)
            .map_err(|e| ClientError::internal(format!("uncacheable value for {key}: {e}")))?;
        let slot = CacheSlot {
            value: encoded,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.to_string(), slot);
        Ok(())
    }

    /// Return the cached value for `key`, fetching it if absent or stale
    ///
    /// At most one fetch runs per key at a time: concurrent callers wait
    /// on the key's lock and are served from the entry the winning fetch
    /// stored. A failed fetch stores nothing, so the next caller retries.
    ///
    /// # Errors
    ///
    /// Propagates the fetch error.
    pub async fn get_or_fetch<T, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        fetch: F,
    ) -> ClientResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        if let Some(value) = self.get(key).await {
            debug!("cache hit for {key}");
            return Ok(value);
        }

        let key_lock = {
            let mut pending = self.pending.lock().await;
            Arc::clone(pending.entry(key.to_string()).or_default())
        };
        let _guard = key_lock.lock().await;

        // A concurrent fetch may have filled the entry while we waited
        if let Some(value) = self.get(key).await {
            debug!("cache filled while waiting for {key}");
            return Ok(value);
        }

        debug!("cache miss for {key}, fetching");
        let value = fetch().await?;
        self.insert(key, &value, ttl).await?;
        Ok(value)
    }

    /// Drop the entry for `key`
    pub async fn invalidate(&self, key: &CacheKey) {
        self.entries.write().await.remove(&key.to_string());
    }

    /// Drop every entry
    pub async fn clear(&self) {
        self.entries.write().await.clear();
        self.pending.lock().await.clear();
    }
}
