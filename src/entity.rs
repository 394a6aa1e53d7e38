//! Owning-entity store
//!
//! Entities are the documents, articles and drawings that jobs generate output for. The
//! pipeline reads their current content fingerprint for staleness checks and merges manifest
//! summaries into their otherwise opaque state.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sled::{Db, Tree};

use crate::error::StorageError;
use crate::fingerprint::content_digest;
use crate::job::store::{to_storage_data, to_storage_io};
use crate::types::now_millis;

const TREE_ENTITIES: &str = "entities";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub entity_id: String,
    pub content: String,
    /// Digest of `content`, recomputed on every content write
    pub content_fingerprint: String,
    #[serde(default)]
    pub state: Map<String, Value>,
    pub updated_at_ms: u64,
}

impl EntitySnapshot {
    pub fn new(entity_id: impl Into<String>, content: impl Into<String>, now_ms: u64) -> Self {
        let content = content.into();
        Self {
            entity_id: entity_id.into(),
            content_fingerprint: content_digest(&content),
            content,
            state: Map::new(),
            updated_at_ms: now_ms,
        }
    }

    pub fn set_content(&mut self, content: impl Into<String>, now_ms: u64) {
        self.content = content.into();
        self.content_fingerprint = content_digest(&self.content);
        self.updated_at_ms = now_ms;
    }

    pub fn slot(&self, slot: &str) -> Option<&Value> {
        self.state.get(slot)
    }

    /// Shallow-merge `patch` into `state[slot]`. Non-object values replace the slot.
    pub fn merge_slot(&mut self, slot: &str, patch: Value, now_ms: u64) {
        match patch {
            Value::Object(incoming) => {
                if let Some(Value::Object(existing)) = self.state.get_mut(slot) {
                    existing.extend(incoming);
                } else {
                    self.state.insert(slot.to_string(), Value::Object(incoming));
                }
            }
            other => {
                self.state.insert(slot.to_string(), other);
            }
        }
        self.updated_at_ms = now_ms;
    }
}

pub trait EntityStore: Send + Sync {
    fn get_snapshot(&self, entity_id: &str) -> Result<Option<EntitySnapshot>, StorageError>;

    fn put_snapshot(&self, snapshot: &EntitySnapshot) -> Result<(), StorageError>;

    fn delete(&self, entity_id: &str) -> Result<bool, StorageError>;

    /// Create the entity or replace its content, keeping its state.
    fn put_content(&self, entity_id: &str, content: &str) -> Result<EntitySnapshot, StorageError> {
        let now = now_millis();
        let snapshot = match self.get_snapshot(entity_id)? {
            Some(mut existing) => {
                existing.set_content(content, now);
                existing
            }
            None => EntitySnapshot::new(entity_id, content, now),
        };
        self.put_snapshot(&snapshot)?;
        Ok(snapshot)
    }

    /// Merge `patch` into a state slot. Returns `false` when the entity does not exist.
    fn merge_state(&self, entity_id: &str, slot: &str, patch: Value) -> Result<bool, StorageError> {
        let Some(mut snapshot) = self.get_snapshot(entity_id)? else {
            return Ok(false);
        };
        snapshot.merge_slot(slot, patch, now_millis());
        self.put_snapshot(&snapshot)?;
        Ok(true)
    }
}

#[derive(Clone)]
pub struct SledEntityStore {
    entities: Tree,
}

impl SledEntityStore {
    pub fn new(db: &Db) -> Result<Self, StorageError> {
        let entities = db.open_tree(TREE_ENTITIES).map_err(to_storage_io)?;
        Ok(Self { entities })
    }

    pub fn shared(db: &Db) -> Result<Arc<Self>, StorageError> {
        Ok(Arc::new(Self::new(db)?))
    }
}

impl EntityStore for SledEntityStore {
    fn get_snapshot(&self, entity_id: &str) -> Result<Option<EntitySnapshot>, StorageError> {
        let Some(raw) = self
            .entities
            .get(entity_id.as_bytes())
            .map_err(to_storage_io)?
        else {
            return Ok(None);
        };
        let parsed = serde_json::from_slice(&raw).map_err(to_storage_data)?;
        Ok(Some(parsed))
    }

    fn put_snapshot(&self, snapshot: &EntitySnapshot) -> Result<(), StorageError> {
        let value = serde_json::to_vec(snapshot).map_err(to_storage_data)?;
        self.entities
            .insert(snapshot.entity_id.as_bytes(), value)
            .map_err(to_storage_io)?;
        Ok(())
    }

    fn delete(&self, entity_id: &str) -> Result<bool, StorageError> {
        let removed = self
            .entities
            .remove(entity_id.as_bytes())
            .map_err(to_storage_io)?;
        Ok(removed.is_some())
    }
}

#[derive(Default)]
pub struct MemoryEntityStore {
    entities: RwLock<HashMap<String, EntitySnapshot>>,
}

impl MemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntityStore for MemoryEntityStore {
    fn get_snapshot(&self, entity_id: &str) -> Result<Option<EntitySnapshot>, StorageError> {
        Ok(self.entities.read().get(entity_id).cloned())
    }

    fn put_snapshot(&self, snapshot: &EntitySnapshot) -> Result<(), StorageError> {
        self.entities
            .write()
            .insert(snapshot.entity_id.clone(), snapshot.clone());
        Ok(())
    }

    fn delete(&self, entity_id: &str) -> Result<bool, StorageError> {
        Ok(self.entities.write().remove(entity_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn exercise(store: &dyn EntityStore) {
        assert!(!store.merge_state("doc", "tts_document", json!({"a": 1})).unwrap());

        let created = store.put_content("doc", "first").unwrap();
        assert_eq!(created.content_fingerprint, content_digest("first"));

        store
            .merge_state("doc", "tts_document", json!({"status": "ready", "n": 1}))
            .unwrap();
        store
            .merge_state("doc", "tts_document", json!({"n": 2}))
            .unwrap();
        let updated = store.put_content("doc", "second").unwrap();
        assert_eq!(updated.content_fingerprint, content_digest("second"));
        assert_eq!(
            updated.slot("tts_document").unwrap(),
            &json!({"status": "ready", "n": 2})
        );

        assert!(store.delete("doc").unwrap());
        assert!(store.get_snapshot("doc").unwrap().is_none());
    }

    #[test]
    fn memory_store_merges_state() {
        exercise(&MemoryEntityStore::new());
    }

    #[test]
    fn sled_store_merges_state() {
        let dir = TempDir::new().unwrap();
        let db = sled::open(dir.path()).unwrap();
        exercise(&SledEntityStore::new(&db).unwrap());
    }

    #[test]
    fn scalar_patch_replaces_slot() {
        let mut snapshot = EntitySnapshot::new("e", "c", 0);
        snapshot.merge_slot("thumbnail", json!({"x": 1}), 1);
        snapshot.merge_slot("thumbnail", json!("reset"), 2);
        assert_eq!(snapshot.slot("thumbnail").unwrap(), &json!("reset"));
        assert_eq!(snapshot.updated_at_ms, 2);
    }
}
