//! In-memory key-value storage.

use std::{collections::HashMap, sync::RwLock};

use agent_hub_core::traits::{KvStore, StorageError};
use async_trait::async_trait;
use serde_json::Value;

struct Inner {
    values: HashMap<String, (u64, Value)>,
    next_seq: u64,
}

/// In-memory storage implementation.
///
/// Useful for development and tests.
/// Data is lost on restart.
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create a new in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                values: HashMap::new(),
                next_seq: 0,
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self
            .inner
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?
            .values
            .get(key)
            .map(|(_, v)| v.clone()))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;

        if let Some(slot) = inner.values.get_mut(key) {
            slot.1 = value;
        } else {
            let seq = inner.next_seq;
            inner.next_seq += 1;
            inner.values.insert(key.to_string(), (seq, value));
        }

        Ok(())
    }

    async fn insert_if_absent(&self, key: &str, value: Value) -> Result<bool, StorageError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;

        if inner.values.contains_key(key) {
            return Ok(false);
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.values.insert(key.to_string(), (seq, value));

        Ok(true)
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self
            .inner
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?
            .values
            .remove(key)
            .is_some())
    }

    async fn contains(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self
            .inner
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?
            .values
            .contains_key(key))
    }

    async fn entries(&self) -> Result<Vec<(String, Value)>, StorageError> {
        let inner = self
            .inner
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;

        let mut result: Vec<(u64, String, Value)> = inner
            .values
            .iter()
            .map(|(k, (seq, v))| (*seq, k.clone(), v.clone()))
            .collect();

        // Insertion order
        result.sort_by_key(|(seq, _, _)| *seq);

        Ok(result.into_iter().map(|(_, k, v)| (k, v)).collect())
    }
}
