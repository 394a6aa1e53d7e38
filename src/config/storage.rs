//! Storage locations: the sled database and the object store backend.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::storage::{FsObjectStore, HttpObjectStore, MemoryObjectStore, ObjectStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory of the sled database holding jobs, entities and the step log
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub objects: ObjectStoreConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".lexicast/db")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            objects: ObjectStoreConfig::default(),
        }
    }
}

/// Where generated outputs are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectStoreConfig {
    Memory {
        #[serde(default = "default_memory_base_url")]
        base_url: String,
    },
    Fs {
        root: PathBuf,
        #[serde(default)]
        public_base_url: Option<String>,
    },
    Http {
        public_base_url: String,
        upload_url: String,
        #[serde(default)]
        token: Option<String>,
    },
}

fn default_memory_base_url() -> String {
    "memory://objects".to_string()
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        ObjectStoreConfig::Fs {
            root: PathBuf::from(".lexicast/blobs"),
            public_base_url: None,
        }
    }
}

impl ObjectStoreConfig {
    pub fn validate(&self) -> Result<(), String> {
        match self {
            ObjectStoreConfig::Memory { .. } => Ok(()),
            ObjectStoreConfig::Fs { root, .. } if root.as_os_str().is_empty() => {
                Err("Object store root cannot be empty".to_string())
            }
            ObjectStoreConfig::Fs { .. } => Ok(()),
            ObjectStoreConfig::Http {
                public_base_url,
                upload_url,
                ..
            } => {
                for (field, url) in [("public_base_url", public_base_url), ("upload_url", upload_url)] {
                    if !(url.starts_with("http://") || url.starts_with("https://")) {
                        return Err(format!("{field} must be an http(s) URL, got '{url}'"));
                    }
                }
                Ok(())
            }
        }
    }

    pub fn build(&self) -> Result<Arc<dyn ObjectStore>, StorageError> {
        Ok(match self {
            ObjectStoreConfig::Memory { base_url } => Arc::new(MemoryObjectStore::new(base_url.clone())),
            ObjectStoreConfig::Fs {
                root,
                public_base_url,
            } => {
                let store = FsObjectStore::new(root)?;
                match public_base_url {
                    Some(base) => Arc::new(store.with_public_base_url(base.clone())),
                    None => Arc::new(store),
                }
            }
            ObjectStoreConfig::Http {
                public_base_url,
                upload_url,
                token,
            } => Arc::new(HttpObjectStore::new(
                public_base_url.clone(),
                upload_url.clone(),
                token.clone(),
            )?),
        })
    }
}
