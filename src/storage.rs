//! Content-addressed object storage
//!
//! Generated audio segments, rendered images and manifests all live under deterministic keys
//! derived from content hashes. Writing the same key twice writes the same bytes, so stores
//! converge without locking and existence doubles as a cache hit.

pub mod fs;
pub mod http;
pub mod memory;

use async_trait::async_trait;

use crate::error::StorageError;

pub use fs::FsObjectStore;
pub use http::HttpObjectStore;
pub use memory::MemoryObjectStore;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn head_exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Write `bytes` under `key` and return the public reference.
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str)
        -> Result<String, StorageError>;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Public reference for a key, whether or not it has been written.
    fn url_for(&self, key: &str) -> String;
}

/// Reject keys that could escape the store root.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if bad {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}
