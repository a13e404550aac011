//! Persistent key-value storage backing the TTL cache
//!
//! The cache treats its store as an opaque asynchronous string-to-string map.
//! `FileStore` persists entries to the XDG cache directory; `MemoryStore`
//! keeps them in process and is mostly useful for tests.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a key-value store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying filesystem operation failed
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Store cannot be reached at all
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Asynchronous string key-value store
///
/// Mirrors the `getItem` / `setItem` / `removeItem` surface of a mobile
/// persistent store. Implementations must treat removal of an absent key as
/// success.
#[async_trait]
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    /// Reads the raw value stored under `key`, if any
    async fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes `value` under `key`, replacing any previous value
    async fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes `key`; absent keys are not an error
    async fn remove_item(&self, key: &str) -> Result<(), StoreError>;

    /// Lists every key currently held by the store
    async fn all_keys(&self) -> Result<Vec<String>, StoreError>;
}
