//! Core traits for storage and capability search.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::AgentRecord;

/// Storage error.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Key not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Storage error: {0}")]
    Internal(String),
}

/// Durable mapping from string keys to JSON values.
///
/// Implementations must make `insert_if_absent` atomic with respect to
/// every other call on the same store.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Get the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Insert or overwrite `key`.
    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;

    /// Insert `key` only if it is not present yet.
    ///
    /// Returns `true` when the value was inserted.
    async fn insert_if_absent(&self, key: &str, value: Value) -> Result<bool, StorageError>;

    /// Delete `key`. Returns `true` if it was present.
    async fn remove(&self, key: &str) -> Result<bool, StorageError>;

    /// Check whether `key` is present.
    async fn contains(&self, key: &str) -> Result<bool, StorageError>;

    /// All entries, in insertion order.
    async fn entries(&self) -> Result<Vec<(String, Value)>, StorageError>;
}

/// Search error.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search backend unavailable: {0}")]
    Unavailable(String),
    #[error("Search error: {0}")]
    Internal(String),
}

/// Ranks registered agents by capability keyword.
#[async_trait]
pub trait CapabilitySearch: Send + Sync {
    /// Make a newly registered agent searchable.
    async fn index(&self, record: &AgentRecord) -> Result<(), SearchError>;

    /// Rank candidate agent names for each keyword.
    ///
    /// The outer list follows `keywords`; each inner list is best match first.
    async fn rank(&self, keywords: &[String]) -> Result<Vec<Vec<String>>, SearchError>;
}
