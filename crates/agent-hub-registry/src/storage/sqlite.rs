//! SQLite key-value storage (feature-gated).

use std::path::Path;

use agent_hub_core::traits::{KvStore, StorageError};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

#[allow(clippy::needless_pass_by_value)]
fn db_err(e: sqlx::Error) -> StorageError {
    StorageError::Internal(e.to_string())
}

/// Open (creating if missing) the SQLite database at `path`.
///
/// # Errors
/// Returns error if the database cannot be opened.
pub async fn connect(path: &Path) -> Result<SqlitePool, StorageError> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    SqlitePoolOptions::new()
        .connect_with(options)
        .await
        .map_err(db_err)
}

/// Open a private in-memory database.
///
/// The pool holds a single connection so every query sees the same data.
///
/// # Errors
/// Returns error if the database cannot be opened.
pub async fn connect_in_memory() -> Result<SqlitePool, StorageError> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .map_err(db_err)
}

/// SQLite storage implementation.
///
/// One table per store, `key TEXT PRIMARY KEY, value TEXT` holding JSON.
#[derive(Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
    table: String,
}

impl SqliteStore {
    /// Open the store backed by `table`, creating the table if needed.
    ///
    /// # Errors
    /// Returns error if the table name is invalid or schema creation fails.
    pub async fn open(pool: SqlitePool, table: &str) -> Result<Self, StorageError> {
        if table.is_empty() || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(StorageError::Internal(format!("invalid table name: {table}")));
        }

        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                key   TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL
            )"
        ))
        .execute(&pool)
        .await
        .map_err(db_err)?;

        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }
}

#[async_trait]
impl KvStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let row = sqlx::query_as::<_, (String,)>(&format!(
            "SELECT value FROM {} WHERE key = ?",
            self.table
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match row {
            Some((raw,)) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        // Upsert keeps the original rowid, so insertion order survives overwrites.
        sqlx::query(&format!(
            "INSERT INTO {} (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            self.table
        ))
        .bind(key)
        .bind(serde_json::to_string(&value)?)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn insert_if_absent(&self, key: &str, value: Value) -> Result<bool, StorageError> {
        let result = sqlx::query(&format!(
            "INSERT OR IGNORE INTO {} (key, value) VALUES (?, ?)",
            self.table
        ))
        .bind(key)
        .bind(serde_json::to_string(&value)?)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE key = ?", self.table))
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn contains(&self, key: &str) -> Result<bool, StorageError> {
        let row = sqlx::query_as::<_, (i64,)>(&format!(
            "SELECT 1 FROM {} WHERE key = ?",
            self.table
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.is_some())
    }

    async fn entries(&self) -> Result<Vec<(String, Value)>, StorageError> {
        let rows = sqlx::query_as::<_, (String, String)>(&format!(
            "SELECT key, value FROM {} ORDER BY rowid",
            self.table
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter()
            .map(|(key, raw)| Ok((key, serde_json::from_str(&raw)?)))
            .collect()
    }
}
