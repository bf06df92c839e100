//! Session (teamup) membership store.

use std::{collections::HashSet, sync::Arc};

use agent_hub_core::{
    Session, Table,
    traits::{KvStore, StorageError},
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::directory::{AgentDirectory, DirectoryError};

/// Creates and persists fixed-membership sessions.
pub struct SessionStore {
    sessions: Table<Vec<String>>,
    directory: Arc<AgentDirectory>,
}

impl SessionStore {
    /// Create a session store over `store`, validating members against `directory`.
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>, directory: Arc<AgentDirectory>) -> Self {
        Self {
            sessions: Table::new(store),
            directory,
        }
    }

    /// Form a new session from `agent_names`.
    ///
    /// Unregistered names are dropped and duplicates collapse to their first
    /// occurrence. An empty membership is allowed.
    ///
    /// # Errors
    /// Returns error if the directory or the backing store fails.
    pub async fn teamup(&self, agent_names: &[String]) -> Result<Session, DirectoryError> {
        let mut seen = HashSet::new();
        let mut members = Vec::with_capacity(agent_names.len());
        for name in agent_names {
            if !seen.insert(name.as_str()) {
                continue;
            }
            if self.directory.contains(name).await? {
                members.push(name.clone());
            } else {
                debug!(agent = %name, "dropping unregistered teamup member");
            }
        }

        loop {
            let comm_id = Uuid::new_v4().simple().to_string();
            if self.sessions.insert_if_absent(&comm_id, &members).await? {
                debug!(comm_id = %comm_id, members = members.len(), "session created");
                return Ok(Session {
                    comm_id,
                    agent_names: members,
                });
            }
            warn!(comm_id = %comm_id, "session id collision, regenerating");
        }
    }

    /// # Errors
    /// Returns error if the backing store fails.
    pub async fn contains(&self, comm_id: &str) -> Result<bool, StorageError> {
        self.sessions.contains(comm_id).await
    }

    /// Drop a session, e.g. to undo a teamup that could not be completed.
    ///
    /// # Errors
    /// Returns error if the backing store fails.
    pub async fn remove(&self, comm_id: &str) -> Result<bool, StorageError> {
        self.sessions.remove(comm_id).await
    }

    /// Members of a session, in teamup order.
    ///
    /// # Errors
    /// Returns error if the backing store fails.
    pub async fn members_of(&self, comm_id: &str) -> Result<Option<Vec<String>>, StorageError> {
        self.sessions.get(comm_id).await
    }

    /// # Errors
    /// Returns error if the backing store fails.
    pub async fn get(&self, comm_id: &str) -> Result<Option<Session>, StorageError> {
        Ok(self.members_of(comm_id).await?.map(|agent_names| Session {
            comm_id: comm_id.to_string(),
            agent_names,
        }))
    }
}
