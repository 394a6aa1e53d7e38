//! In-memory object store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::StorageError;
use crate::storage::{validate_key, ObjectStore};

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

pub struct MemoryObjectStore {
    objects: RwLock<HashMap<String, StoredObject>>,
    base_url: String,
    puts: AtomicUsize,
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new("memory://objects")
    }
}

impl MemoryObjectStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            base_url: base_url.into(),
            puts: AtomicUsize::new(0),
        }
    }

    /// Number of `put` calls that actually wrote an object
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().get(key).cloned()
    }

    /// Seed an object without counting it as a write.
    pub fn insert(&self, key: &str, bytes: &[u8], content_type: &str) {
        self.objects.write().insert(
            key.to_string(),
            StoredObject {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
            },
        );
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn head_exists(&self, key: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        Ok(self.objects.read().contains_key(key))
    }

    async fn put(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, StorageError> {
        validate_key(key)?;
        self.insert(key, bytes, content_type);
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(self.url_for(key))
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        validate_key(key)?;
        Ok(self.objects.read().get(key).map(|o| o.bytes.clone()))
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }
}
