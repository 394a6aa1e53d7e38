//! Filesystem object store
//!
//! Objects live at `{root}/objects/{key}`. Each write goes to its own temporary sibling and is
//! moved into place without replacing an existing object, so readers never observe a partial
//! object and concurrent writers of one key converge.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::StorageError;
use crate::storage::{validate_key, ObjectStore};

pub struct FsObjectStore {
    root: PathBuf,
    public_base_url: Option<String>,
}

impl FsObjectStore {
    /// Create a store rooted at `root`, creating the objects directory as needed.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        let objects_dir = root.join("objects");
        fs::create_dir_all(&objects_dir).map_err(|e| {
            StorageError::IoError(io::Error::new(
                io::ErrorKind::Other,
                format!("Failed to create objects directory at {:?}: {}", objects_dir, e),
            ))
        })?;
        Ok(Self {
            root,
            public_base_url: None,
        })
    }

    /// Serve references from `base_url` instead of `file://` paths.
    pub fn with_public_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.public_base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.root.join("objects").join(key)
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn head_exists(&self, key: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        Ok(self.object_path(key).is_file())
    }

    async fn put(
        &self,
        key: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<String, StorageError> {
        validate_key(key)?;
        let path = self.object_path(key);

        // same key, same bytes
        if path.is_file() {
            debug!(key, "Object already stored");
            return Ok(self.url_for(key));
        }

        let parent = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent).map_err(|e| {
            StorageError::IoError(io::Error::new(
                io::ErrorKind::Other,
                format!("Failed to create parent directory {:?}: {}", parent, e),
            ))
        })?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let mut temp = tempfile::Builder::new()
            .prefix(&format!(".{file_name}."))
            .suffix(".tmp")
            .tempfile_in(parent)
            .map_err(|e| {
                StorageError::IoError(io::Error::new(
                    io::ErrorKind::Other,
                    format!("Failed to create temp file in {:?}: {}", parent, e),
                ))
            })?;

        temp.write_all(bytes).map_err(|e| {
            StorageError::IoError(io::Error::new(
                io::ErrorKind::Other,
                format!("Failed to write object to {:?}: {}", temp.path(), e),
            ))
        })?;

        // a concurrent writer of the same key got there first with the same bytes
        match temp.persist_noclobber(&path) {
            Ok(_) => {}
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                debug!(key, "Object stored by a concurrent writer");
            }
            Err(e) => {
                return Err(StorageError::IoError(io::Error::new(
                    io::ErrorKind::Other,
                    format!("Failed to move temp file to {:?}: {}", path, e.error),
                )));
            }
        }

        Ok(self.url_for(key))
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        validate_key(key)?;
        let path = self.object_path(key);
        if !path.is_file() {
            return Ok(None);
        }
        let bytes = fs::read(&path).map_err(|e| {
            StorageError::IoError(io::Error::new(
                io::ErrorKind::Other,
                format!("Failed to read object from {:?}: {}", path, e),
            ))
        })?;
        Ok(Some(bytes))
    }

    fn url_for(&self, key: &str) -> String {
        match &self.public_base_url {
            Some(base) => format!("{base}/{key}"),
            None => format!("file://{}", self.object_path(key).display()),
        }
    }
}
