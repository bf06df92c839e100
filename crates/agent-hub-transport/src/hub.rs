//! Hub service: owns the registries and implements the request operations.

use std::sync::Arc;

use agent_hub_core::{
    AgentInfo, AgentRecord, CommId,
    traits::{CapabilitySearch, KvStore, StorageError},
};
use agent_hub_registry::{
    AgentDirectory, ChatLog, ChatLogError, DirectoryError, RegistrationOutcome, SessionStore,
};
use tracing::{error, info};

use crate::{
    connections::ConnectionRegistry,
    protocol::{ChatRecords, EventKind, OneOrMany, RetrieveParam, TeamupOutput, TeamupParam},
};

/// Hub error.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    ChatLog(#[from] ChatLogError),
}

/// Shared state behind every connection and request.
pub struct Hub {
    directory: Arc<AgentDirectory>,
    sessions: SessionStore,
    chat_log: ChatLog,
    connections: ConnectionRegistry,
}

impl Hub {
    /// Assemble a hub from its components.
    #[must_use]
    pub fn new(directory: Arc<AgentDirectory>, sessions: SessionStore, chat_log: ChatLog) -> Self {
        Self {
            directory,
            sessions,
            chat_log,
            connections: ConnectionRegistry::new(),
        }
    }

    /// Build a hub over one store per table.
    #[must_use]
    pub fn with_stores(
        agents: Arc<dyn KvStore>,
        sessions: Arc<dyn KvStore>,
        chat: Arc<dyn KvStore>,
        search: Arc<dyn CapabilitySearch>,
    ) -> Self {
        let directory = Arc::new(AgentDirectory::new(agents, search));
        let sessions = SessionStore::new(sessions, Arc::clone(&directory));
        Self::new(directory, sessions, ChatLog::new(chat))
    }

    #[must_use]
    pub fn directory(&self) -> &AgentDirectory {
        &self.directory
    }

    #[must_use]
    pub const fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    #[must_use]
    pub const fn chat_log(&self) -> &ChatLog {
        &self.chat_log
    }

    #[must_use]
    pub const fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    /// Register an agent; re-registering is a silent no-op.
    ///
    /// # Errors
    /// Returns error if the directory fails.
    pub async fn register(&self, info: AgentInfo) -> Result<RegistrationOutcome, HubError> {
        let name = info.name.clone();
        let outcome = self.directory.register(info).await?;
        if outcome == RegistrationOutcome::Registered {
            info!(agent = %name, "agent registered");
        }
        Ok(outcome)
    }

    /// Exact lookup, answering in the shape of the request.
    ///
    /// # Errors
    /// Returns error if the directory fails.
    pub async fn query(
        &self,
        names: OneOrMany<String>,
    ) -> Result<OneOrMany<Option<AgentInfo>>, HubError> {
        Ok(match names {
            OneOrMany::One(name) => {
                OneOrMany::One(self.directory.query(&name).await?.map(|r| r.info()))
            }
            OneOrMany::Many(names) => OneOrMany::Many(
                self.directory
                    .query_many(&names)
                    .await?
                    .into_iter()
                    .map(|r| r.map(|r| r.info()))
                    .collect(),
            ),
        })
    }

    /// Capability search, deduplicated across keywords.
    ///
    /// # Errors
    /// Returns error if the directory or search collaborator fails.
    pub async fn retrieve(&self, param: &RetrieveParam) -> Result<Vec<AgentInfo>, HubError> {
        let found = self.directory.retrieve(&param.capabilities).await?;
        info!(
            sender = %param.sender,
            keywords = param.capabilities.len(),
            found = found.len(),
            "retrieved agents"
        );
        Ok(found.iter().map(AgentRecord::info).collect())
    }

    /// Form a session, initialize its chat record and mirror it to the observer.
    ///
    /// The sender is added to the requested members before filtering. If the
    /// chat record cannot be created the session is removed again.
    ///
    /// # Errors
    /// Returns error if any backing store fails.
    pub async fn teamup(&self, param: TeamupParam) -> Result<TeamupOutput, HubError> {
        let mut names = param.agent_names;
        names.push(param.sender);

        let session = self.sessions.teamup(&names).await?;
        if let Err(e) = self
            .chat_log
            .create_session(&session.comm_id, &param.team_name, &session.agent_names)
            .await
        {
            if let Err(rollback) = self.sessions.remove(&session.comm_id).await {
                error!(comm_id = %session.comm_id, "failed to roll back session: {rollback}");
            }
            return Err(e.into());
        }

        let output = TeamupOutput {
            comm_id: session.comm_id,
            agent_names: session.agent_names,
            team_name: param.team_name,
        };
        info!(
            comm_id = %output.comm_id,
            team = %output.team_name,
            members = output.agent_names.len(),
            "teamup created"
        );
        self.connections
            .broadcast_to_observer(EventKind::Teamup, &output)
            .await;
        Ok(output)
    }

    /// Chat records keyed by session id; all of them, in creation order, when
    /// `comm_ids` is `None`.
    ///
    /// # Errors
    /// Returns error if the chat log fails.
    pub async fn fetch_chat_records(
        &self,
        comm_ids: Option<OneOrMany<CommId>>,
    ) -> Result<ChatRecords, HubError> {
        let ids = comm_ids.map(OneOrMany::into_vec);
        Ok(ChatRecords::new(self.chat_log.fetch(ids.as_deref()).await?))
    }

    /// # Errors
    /// Returns error if the directory fails.
    pub async fn list_all_agents(&self) -> Result<Vec<AgentRecord>, HubError> {
        Ok(self.directory.list_all().await?)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use agent_hub_registry::{KeywordIndex, storage::MemoryStore};
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use tokio::sync::mpsc;
    use tokio_test::assert_err;

    use super::*;

    pub(crate) fn memory_hub() -> Hub {
        Hub::with_stores(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
            Arc::new(KeywordIndex::default()),
        )
    }

    pub(crate) async fn register_all(hub: &Hub, names: &[&str]) {
        for name in names {
            hub.register(AgentInfo::new(*name, format!("{name} agent"), "test"))
                .await
                .unwrap();
        }
    }

    fn teamup_param(sender: &str, members: &[&str]) -> TeamupParam {
        TeamupParam {
            sender: sender.to_string(),
            agent_names: members.iter().map(ToString::to_string).collect(),
            team_name: "team".to_string(),
        }
    }

    /// Chat store whose inserts always fail.
    struct FullStore(MemoryStore);

    #[async_trait]
    impl KvStore for FullStore {
        async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
            self.0.get(key).await
        }

        async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
            self.0.set(key, value).await
        }

        async fn insert_if_absent(&self, _key: &str, _value: Value) -> Result<bool, StorageError> {
            Err(StorageError::Internal("disk full".to_string()))
        }

        async fn remove(&self, key: &str) -> Result<bool, StorageError> {
            self.0.remove(key).await
        }

        async fn contains(&self, key: &str) -> Result<bool, StorageError> {
            self.0.contains(key).await
        }

        async fn entries(&self) -> Result<Vec<(String, Value)>, StorageError> {
            self.0.entries().await
        }
    }

    #[tokio::test]
    async fn test_teamup_adds_registered_sender() {
        let hub = memory_hub();
        register_all(&hub, &["X", "Y", "boss"]).await;

        let out = hub.teamup(teamup_param("boss", &["X", "Y"])).await.unwrap();
        assert_eq!(out.agent_names, vec!["X", "Y", "boss"]);
        assert_eq!(out.team_name, "team");

        let record = hub.chat_log().get(&out.comm_id).await.unwrap().unwrap();
        assert_eq!(record.agent_names, out.agent_names);
        assert!(record.chat_record.is_empty());
    }

    #[tokio::test]
    async fn test_teamup_drops_unregistered_sender() {
        let hub = memory_hub();
        register_all(&hub, &["X", "Y"]).await;

        let out = hub
            .teamup(teamup_param("stranger", &["X", "Y", "unregistered"]))
            .await
            .unwrap();
        assert_eq!(out.agent_names, vec!["X", "Y"]);
    }

    #[tokio::test]
    async fn test_teamup_is_mirrored() {
        let hub = memory_hub();
        register_all(&hub, &["X"]).await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        hub.connections().set_observer(tx).await;

        let out = hub.teamup(teamup_param("X", &[])).await.unwrap();
        let event: Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(
            event,
            json!({
                "comm_id": out.comm_id,
                "agent_names": ["X"],
                "team_name": "team",
                "frontend_type": "teamup",
            })
        );
    }

    #[tokio::test]
    async fn test_failed_teamup_leaves_no_session() {
        let sessions = Arc::new(MemoryStore::new());
        let hub = Hub::with_stores(
            Arc::new(MemoryStore::new()),
            Arc::clone(&sessions) as Arc<dyn KvStore>,
            Arc::new(FullStore(MemoryStore::new())),
            Arc::new(KeywordIndex::default()),
        );
        register_all(&hub, &["X", "Y"]).await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        hub.connections().set_observer(tx).await;

        let err = assert_err!(hub.teamup(teamup_param("X", &["Y"])).await);
        assert!(matches!(err, HubError::ChatLog(ChatLogError::Storage(_))));

        assert!(sessions.entries().await.unwrap().is_empty());
        assert!(hub.fetch_chat_records(None).await.unwrap().is_empty());
        // Nothing is announced for a teamup that did not happen.
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_query_preserves_shape() {
        let hub = memory_hub();
        register_all(&hub, &["a"]).await;

        let single = hub.query(OneOrMany::One("a".to_string())).await.unwrap();
        assert!(matches!(single, OneOrMany::One(Some(ref info)) if info.name == "a"));

        let missing = hub.query(OneOrMany::One("zz".to_string())).await.unwrap();
        assert_eq!(missing, OneOrMany::One(None));

        let batch = hub
            .query(OneOrMany::Many(vec!["zz".to_string(), "a".to_string()]))
            .await
            .unwrap();
        let OneOrMany::Many(batch) = batch else {
            panic!("expected list");
        };
        assert!(batch[0].is_none());
        assert_eq!(batch[1].as_ref().unwrap().desc, "a agent");
    }

    #[tokio::test]
    async fn test_retrieve_through_index() {
        let hub = memory_hub();
        hub.register(AgentInfo::new("painter", "draws images", "art"))
            .await
            .unwrap();
        hub.register(AgentInfo::new("writer", "writes text and images captions", "art"))
            .await
            .unwrap();

        let found = hub
            .retrieve(&RetrieveParam {
                sender: "me".to_string(),
                capabilities: vec!["images".to_string(), "text".to_string()],
            })
            .await
            .unwrap();
        let names: Vec<&str> = found.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["painter", "writer"]);
    }

    #[tokio::test]
    async fn test_fetch_chat_records() {
        let hub = memory_hub();
        register_all(&hub, &["X"]).await;
        let first = hub.teamup(teamup_param("X", &[])).await.unwrap();
        let second = hub.teamup(teamup_param("X", &[])).await.unwrap();

        let all = hub.fetch_chat_records(None).await.unwrap();
        assert_eq!(all.len(), 2);

        let one = hub
            .fetch_chat_records(Some(OneOrMany::One(second.comm_id.clone())))
            .await
            .unwrap();
        assert_eq!(one.len(), 1);
        assert!(one.contains_key(&second.comm_id));
        assert!(!one.contains_key(&first.comm_id));
    }

    #[tokio::test]
    async fn test_fetch_keeps_creation_order() {
        let hub = memory_hub();
        register_all(&hub, &["X"]).await;
        let mut created = Vec::new();
        for _ in 0..6 {
            created.push(hub.teamup(teamup_param("X", &[])).await.unwrap().comm_id);
        }

        let all = hub.fetch_chat_records(None).await.unwrap();
        assert_eq!(all.comm_ids().collect::<Vec<_>>(), created);

        let requested = vec![created[4].clone(), created[1].clone()];
        let some = hub
            .fetch_chat_records(Some(OneOrMany::Many(requested.clone())))
            .await
            .unwrap();
        assert_eq!(some.comm_ids().collect::<Vec<_>>(), requested);
    }
}
