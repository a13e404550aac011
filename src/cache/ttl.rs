//! TTL cache over a persistent key-value store
//!
//! Provides a `TtlCache` that stores serializable values together with their
//! write timestamp and time-to-live. Stale entries are never returned: they
//! read as a miss and are removed on a best-effort basis.

use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::clock::{Clock, SystemClock};
use crate::store::{KeyValueStore, StoreError};

/// Errors surfaced by cache operations
///
/// Read failures are deliberately absent from `get`: a broken store degrades
/// to a miss there. They only surface from bulk invalidation.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The underlying store rejected a write or removal
    #[error("cache write failed: {0}")]
    StorageWrite(#[source] StoreError),

    /// The underlying store could not list its keys
    #[error("cache read failed: {0}")]
    StorageRead(#[source] StoreError),

    /// The value could not be serialized
    #[error("failed to serialize cache value: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Wrapper struct for cached data as written to the store
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheEntry<T> {
    /// The cached value
    value: T,
    /// When the value was written, in epoch milliseconds
    stored_at: i64,
    /// Time-to-live in milliseconds
    ttl: u64,
}

impl<T> CacheEntry<T> {
    /// An entry is fresh iff `now - stored_at < ttl`
    fn is_fresh(&self, now_millis: i64) -> bool {
        let age = now_millis.saturating_sub(self.stored_at);
        let ttl = i64::try_from(self.ttl).unwrap_or(i64::MAX);
        age < ttl
    }
}

/// Key-value cache with per-entry expiry
///
/// The cache is an explicit value owned by whoever composes the application;
/// cloning it shares the same store and clock.
#[derive(Debug, Clone)]
pub struct TtlCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    namespace: Option<String>,
}

impl TtlCache {
    /// Creates a cache over `store` using the wall clock
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Creates a cache with a custom clock
    pub fn with_clock(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            namespace: None,
        }
    }

    /// Scopes every key under `namespace:`
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    fn full_key(&self, key: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{}:{}", ns, key),
            None => key.to_string(),
        }
    }

    /// Writes `value` under `key`, fresh for `ttl` from now
    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let entry = CacheEntry {
            value,
            stored_at: self.clock.now_millis(),
            ttl: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
        };
        let json = serde_json::to_string(&entry)?;

        self.store
            .set_item(&self.full_key(key), &json)
            .await
            .map_err(CacheError::StorageWrite)
    }

    /// Reads a fresh value for `key`
    ///
    /// Returns `None` when the key is absent, expired, unreadable or cannot
    /// be parsed as `T`. This never fails.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let full_key = self.full_key(key);

        let raw = match self.store.get_item(&full_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %full_key, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(key = %full_key, error = %e, "corrupt cache entry, treating as miss");
                return None;
            }
        };

        if entry.is_fresh(self.clock.now_millis()) {
            return Some(entry.value);
        }

        debug!(key = %full_key, "cache entry expired");
        if let Err(e) = self.store.remove_item(&full_key).await {
            debug!(key = %full_key, error = %e, "failed to evict expired entry");
        }
        None
    }

    /// Removes `key` regardless of its freshness
    pub async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        self.store
            .remove_item(&self.full_key(key))
            .await
            .map_err(CacheError::StorageWrite)
    }

    /// Removes every entry, or only those whose key starts with `prefix`
    ///
    /// Returns the number of entries removed.
    pub async fn invalidate_all(&self, prefix: Option<&str>) -> Result<usize, CacheError> {
        // With a namespace the scope always ends in `ns:`, so `ns2:*` never matches
        let scope = self.full_key(prefix.unwrap_or(""));

        let keys = self
            .store
            .all_keys()
            .await
            .map_err(CacheError::StorageRead)?;

        let mut removed = 0;
        for key in keys.iter().filter(|k| k.starts_with(&scope)) {
            self.store
                .remove_item(key)
                .await
                .map_err(CacheError::StorageWrite)?;
            removed += 1;
        }

        debug!(scope = %scope, removed, "invalidated cache entries");
        Ok(removed)
    }

    /// Drops everything this cache owns
    pub async fn reset(&self) -> Result<usize, CacheError> {
        self.invalidate_all(None).await
    }
}
