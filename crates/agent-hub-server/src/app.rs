//! Hub assembly from configuration.

use std::sync::Arc;

use agent_hub_core::KvStore;
use agent_hub_registry::{
    KeywordIndex,
    storage::{MemoryStore, SqliteStore, sqlite},
};
use agent_hub_transport::Hub;
use tracing::info;

use crate::config::{ServerConfig, StorageConfig};

/// Open storage, build the hub and rebuild the search index.
///
/// # Errors
/// Returns error if storage cannot be opened or reindexing fails.
pub async fn build_hub(config: &ServerConfig) -> anyhow::Result<Hub> {
    let search = Arc::new(KeywordIndex::new(config.search_limit));

    let (agents, sessions, chat): (Arc<dyn KvStore>, Arc<dyn KvStore>, Arc<dyn KvStore>) =
        match &config.storage {
            StorageConfig::Memory => {
                info!("using in-memory storage");
                (
                    Arc::new(MemoryStore::new()) as Arc<dyn KvStore>,
                    Arc::new(MemoryStore::new()) as Arc<dyn KvStore>,
                    Arc::new(MemoryStore::new()) as Arc<dyn KvStore>,
                )
            }
            StorageConfig::Sqlite(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                info!(path = %path.display(), "using sqlite storage");
                let pool = sqlite::connect(path).await?;
                let agents = SqliteStore::open(pool.clone(), "agents").await?;
                let sessions = SqliteStore::open(pool.clone(), "sessions").await?;
                let chat = SqliteStore::open(pool, "chat").await?;
                (
                    Arc::new(agents) as Arc<dyn KvStore>,
                    Arc::new(sessions) as Arc<dyn KvStore>,
                    Arc::new(chat) as Arc<dyn KvStore>,
                )
            }
        };

    let hub = Hub::with_stores(agents, sessions, chat, search);
    let indexed = hub.directory().reindex().await?;
    info!(indexed, "search index rebuilt");
    Ok(hub)
}
