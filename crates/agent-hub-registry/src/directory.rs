//! Agent directory: registration, exact lookup and capability retrieval.

use std::sync::Arc;

use agent_hub_core::{
    AgentInfo, AgentRecord, Table, merge_ranked,
    traits::{CapabilitySearch, KvStore, SearchError, StorageError},
};
use tracing::{debug, warn};

/// Directory error.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Search error: {0}")]
    Search(#[from] SearchError),
}

/// Result of a registration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// A new record was created.
    Registered,
    /// The name was already taken; nothing changed.
    AlreadyRegistered,
}

/// Registry of known agents.
///
/// Records are never renamed or removed once created.
pub struct AgentDirectory {
    agents: Table<AgentRecord>,
    search: Arc<dyn CapabilitySearch>,
}

impl AgentDirectory {
    /// Create a directory over `store`, delegating ranking to `search`.
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>, search: Arc<dyn CapabilitySearch>) -> Self {
        Self {
            agents: Table::new(store),
            search,
        }
    }

    /// Register an agent if its name is free.
    ///
    /// # Errors
    /// Returns error if the backing store fails.
    pub async fn register(&self, info: AgentInfo) -> Result<RegistrationOutcome, DirectoryError> {
        let record = AgentRecord::from_info(info);
        if !self.agents.insert_if_absent(&record.name, &record).await? {
            debug!(agent = %record.name, "agent already registered");
            return Ok(RegistrationOutcome::AlreadyRegistered);
        }

        if let Err(e) = self.search.index(&record).await {
            warn!(agent = %record.name, "failed to index agent: {e}");
        }
        debug!(agent = %record.name, "agent registered");
        Ok(RegistrationOutcome::Registered)
    }

    /// Exact lookup of one agent.
    ///
    /// # Errors
    /// Returns error if the backing store fails.
    pub async fn query(&self, name: &str) -> Result<Option<AgentRecord>, DirectoryError> {
        Ok(self.agents.get(name).await?)
    }

    /// Exact lookup of several agents, preserving input order.
    ///
    /// # Errors
    /// Returns error if the backing store fails.
    pub async fn query_many(
        &self,
        names: &[String],
    ) -> Result<Vec<Option<AgentRecord>>, DirectoryError> {
        let mut result = Vec::with_capacity(names.len());
        for name in names {
            result.push(self.agents.get(name).await?);
        }
        Ok(result)
    }

    /// Check whether `name` is registered.
    ///
    /// # Errors
    /// Returns error if the backing store fails.
    pub async fn contains(&self, name: &str) -> Result<bool, DirectoryError> {
        Ok(self.agents.contains(name).await?)
    }

    /// Find agents matching any of `capabilities`.
    ///
    /// Results follow keyword order, then rank order within a keyword; an
    /// agent appears once, at the position of its first match.
    ///
    /// # Errors
    /// Returns error if the search collaborator or the store fails.
    pub async fn retrieve(
        &self,
        capabilities: &[String],
    ) -> Result<Vec<AgentRecord>, DirectoryError> {
        let ranked = self.search.rank(capabilities).await?;
        let names = merge_ranked(ranked, Clone::clone);

        let mut result = Vec::with_capacity(names.len());
        for name in names {
            match self.agents.get(&name).await? {
                Some(record) => result.push(record),
                None => debug!(agent = %name, "search candidate not in directory"),
            }
        }
        Ok(result)
    }

    /// Every registered agent, in registration order.
    ///
    /// # Errors
    /// Returns error if the backing store fails.
    pub async fn list_all(&self) -> Result<Vec<AgentRecord>, DirectoryError> {
        Ok(self.agents.values().await?)
    }

    /// Feed every persisted agent to the search collaborator.
    ///
    /// Returns the number of agents indexed.
    ///
    /// # Errors
    /// Returns error if the store or the search collaborator fails.
    pub async fn reindex(&self) -> Result<usize, DirectoryError> {
        let records = self.agents.values().await?;
        for record in &records {
            self.search.index(record).await?;
        }
        Ok(records.len())
    }
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::{search::KeywordIndex, storage::MemoryStore};

    /// Returns fixed candidate lists, one per keyword.
    struct FixedSearch(Vec<Vec<String>>);

    #[async_trait]
    impl CapabilitySearch for FixedSearch {
        async fn index(&self, _record: &AgentRecord) -> Result<(), SearchError> {
            Ok(())
        }

        async fn rank(&self, keywords: &[String]) -> Result<Vec<Vec<String>>, SearchError> {
            Ok(self.0.iter().take(keywords.len()).cloned().collect())
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    fn directory_with(search: Arc<dyn CapabilitySearch>) -> AgentDirectory {
        AgentDirectory::new(Arc::new(MemoryStore::new()), search)
    }

    #[tokio::test]
    async fn test_register_twice_keeps_one_record() {
        let dir = directory_with(Arc::new(KeywordIndex::default()));
        let first = AgentInfo::new("alice", "plans trips", "planner");

        assert_eq!(
            dir.register(first.clone()).await.unwrap(),
            RegistrationOutcome::Registered
        );
        assert_eq!(
            dir.register(AgentInfo::new("alice", "something else", "other"))
                .await
                .unwrap(),
            RegistrationOutcome::AlreadyRegistered
        );

        let all = dir.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].info(), first);
    }

    #[tokio::test]
    async fn test_concurrent_register_same_name() {
        let dir = Arc::new(directory_with(Arc::new(KeywordIndex::default())));
        let mut handles = Vec::new();
        for i in 0..16 {
            let dir = Arc::clone(&dir);
            handles.push(tokio::spawn(async move {
                dir.register(AgentInfo::new("bob", format!("v{i}"), "t"))
                    .await
                    .unwrap()
            }));
        }

        let mut registered = 0;
        for handle in handles {
            if handle.await.unwrap() == RegistrationOutcome::Registered {
                registered += 1;
            }
        }
        assert_eq!(registered, 1);
        assert_eq!(dir.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_query_round_trip_and_order() {
        let dir = directory_with(Arc::new(KeywordIndex::default()));
        let a = AgentInfo::new("a", "first", "x");
        let b = AgentInfo::new("b", "second", "y");
        dir.register(a.clone()).await.unwrap();
        dir.register(b.clone()).await.unwrap();

        assert_eq!(dir.query("a").await.unwrap().unwrap().info(), a);
        assert!(dir.query("missing").await.unwrap().is_none());

        let batch = dir.query_many(&names(&["b", "missing", "a"])).await.unwrap();
        assert_eq!(batch[0].as_ref().unwrap().info(), b);
        assert!(batch[1].is_none());
        assert_eq!(batch[2].as_ref().unwrap().info(), a);
    }

    #[tokio::test]
    async fn test_retrieve_merges_first_seen() {
        let search = FixedSearch(vec![names(&["A", "B"]), names(&["B", "C"])]);
        let dir = directory_with(Arc::new(search));
        for name in ["A", "B", "C"] {
            dir.register(AgentInfo::new(name, "d", "t")).await.unwrap();
        }

        let found: Vec<String> = dir
            .retrieve(&names(&["k1", "k2"]))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(found, names(&["A", "B", "C"]));
    }

    #[tokio::test]
    async fn test_retrieve_skips_unknown_candidates() {
        let search = FixedSearch(vec![names(&["ghost", "A"])]);
        let dir = directory_with(Arc::new(search));
        dir.register(AgentInfo::new("A", "d", "t")).await.unwrap();

        let found = dir.retrieve(&names(&["k"])).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "A");
    }

    #[tokio::test]
    async fn test_reindex_restores_search() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let dir = AgentDirectory::new(Arc::clone(&store), Arc::new(KeywordIndex::default()));
        dir.register(AgentInfo::new("chef", "cooks pasta", "t"))
            .await
            .unwrap();

        // Fresh index over the same store, as after a restart.
        let restarted = AgentDirectory::new(store, Arc::new(KeywordIndex::default()));
        assert!(restarted.retrieve(&names(&["pasta"])).await.unwrap().is_empty());
        assert_eq!(restarted.reindex().await.unwrap(), 1);
        assert_eq!(restarted.retrieve(&names(&["pasta"])).await.unwrap()[0].name, "chef");
    }
}
