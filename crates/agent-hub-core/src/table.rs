//! Typed view over a [`KvStore`].

use std::{marker::PhantomData, sync::Arc};

use serde::{Serialize, de::DeserializeOwned};

use crate::traits::{KvStore, StorageError};

/// A `KvStore` whose values all deserialize to `T`.
pub struct Table<T> {
    store: Arc<dyn KvStore>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Table<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _marker: PhantomData,
        }
    }
}

impl<T> Table<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Wrap a raw store.
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    /// Get and decode the value under `key`.
    ///
    /// # Errors
    /// Returns error if the backend fails or the value does not decode.
    pub async fn get(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.store.get(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Encode and store `value` under `key`.
    ///
    /// # Errors
    /// Returns error if encoding or the backend fails.
    pub async fn set(&self, key: &str, value: &T) -> Result<(), StorageError> {
        self.store.set(key, serde_json::to_value(value)?).await
    }

    /// Store `value` unless `key` already exists.
    ///
    /// # Errors
    /// Returns error if encoding or the backend fails.
    pub async fn insert_if_absent(&self, key: &str, value: &T) -> Result<bool, StorageError> {
        self.store
            .insert_if_absent(key, serde_json::to_value(value)?)
            .await
    }

    /// # Errors
    /// Returns error if the backend fails.
    pub async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        self.store.remove(key).await
    }

    /// # Errors
    /// Returns error if the backend fails.
    pub async fn contains(&self, key: &str) -> Result<bool, StorageError> {
        self.store.contains(key).await
    }

    /// Decode every entry, in insertion order.
    ///
    /// # Errors
    /// Returns error if the backend fails or any value does not decode.
    pub async fn entries(&self) -> Result<Vec<(String, T)>, StorageError> {
        self.store
            .entries()
            .await?
            .into_iter()
            .map(|(key, value)| Ok((key, serde_json::from_value(value)?)))
            .collect()
    }

    /// Decode every value, in insertion order.
    ///
    /// # Errors
    /// Returns error if the backend fails or any value does not decode.
    pub async fn values(&self) -> Result<Vec<T>, StorageError> {
        Ok(self.entries().await?.into_iter().map(|(_, v)| v).collect())
    }
}
