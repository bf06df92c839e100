//! Append-only per-session chat history.

use std::sync::Arc;

use agent_hub_core::{
    AgentMessage, ChatRecord, CommId, Table,
    traits::{KvStore, StorageError},
};
use tokio::sync::Mutex;
use tracing::warn;

/// Chat log error.
#[derive(Debug, thiserror::Error)]
pub enum ChatLogError {
    #[error("Chat record already exists: {0}")]
    SessionExists(CommId),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Chat records keyed by session id.
pub struct ChatLog {
    records: Table<ChatRecord>,
    // Serializes read-modify-write of a record.
    write_lock: Mutex<()>,
}

impl ChatLog {
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            records: Table::new(store),
            write_lock: Mutex::new(()),
        }
    }

    /// Initialize an empty record for a new session.
    ///
    /// # Errors
    /// Returns `SessionExists` if a record for `comm_id` already exists.
    pub async fn create_session(
        &self,
        comm_id: &str,
        team_name: &str,
        agent_names: &[String],
    ) -> Result<(), ChatLogError> {
        let _guard = self.write_lock.lock().await;
        let record = ChatRecord::new(
            comm_id.to_string(),
            team_name.to_string(),
            agent_names.to_vec(),
        );
        if self.records.insert_if_absent(comm_id, &record).await? {
            Ok(())
        } else {
            Err(ChatLogError::SessionExists(comm_id.to_string()))
        }
    }

    /// Append a message to a session's history.
    ///
    /// An unknown `comm_id` gets an unassociated record (no team name, no
    /// members) so the message is not lost.
    ///
    /// # Errors
    /// Returns error if the backing store fails.
    pub async fn append(&self, comm_id: &str, message: AgentMessage) -> Result<(), ChatLogError> {
        let _guard = self.write_lock.lock().await;
        let mut record = if let Some(record) = self.records.get(comm_id).await? {
            record
        } else {
            warn!(comm_id = %comm_id, "no chat record for session, storing unassociated");
            ChatRecord::new(comm_id.to_string(), String::new(), Vec::new())
        };
        record.chat_record.push(message);
        self.records.set(comm_id, &record).await?;
        Ok(())
    }

    /// # Errors
    /// Returns error if the backing store fails.
    pub async fn get(&self, comm_id: &str) -> Result<Option<ChatRecord>, ChatLogError> {
        Ok(self.records.get(comm_id).await?)
    }

    /// Fetch records.
    ///
    /// With `None`, every record in creation order. With ids, the requested
    /// records in request order; unknown ids are omitted.
    ///
    /// # Errors
    /// Returns error if the backing store fails.
    pub async fn fetch(
        &self,
        comm_ids: Option<&[String]>,
    ) -> Result<Vec<ChatRecord>, ChatLogError> {
        let Some(comm_ids) = comm_ids else {
            return Ok(self.records.values().await?);
        };

        let mut result = Vec::with_capacity(comm_ids.len());
        for comm_id in comm_ids {
            if let Some(record) = self.records.get(comm_id).await? {
                result.push(record);
            }
        }
        Ok(result)
    }
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use tokio_test::assert_err;

    use super::*;
    use crate::storage::MemoryStore;

    fn message(comm_id: &str, content: &str) -> AgentMessage {
        AgentMessage {
            sender: "a".to_string(),
            comm_id: comm_id.to_string(),
            content: content.to_string(),
        }
    }

    fn log() -> ChatLog {
        ChatLog::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_append_preserves_arrival_order() {
        let log = log();
        log.create_session("s1", "team", &["a".to_string()]).await.unwrap();
        for i in 0..5 {
            log.append("s1", message("s1", &format!("m{i}"))).await.unwrap();
        }

        let all = log.fetch(None).await.unwrap();
        assert_eq!(all.len(), 1);
        let contents: Vec<&str> = all[0].chat_record.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m0", "m1", "m2", "m3", "m4"]);
        assert_eq!(all[0].team_name, "team");
    }

    #[tokio::test]
    async fn test_fetch_filters_by_id() {
        let log = log();
        log.create_session("s1", "one", &[]).await.unwrap();
        log.create_session("s2", "two", &[]).await.unwrap();
        log.create_session("s3", "three", &[]).await.unwrap();

        let ids = vec!["s3".to_string(), "missing".to_string(), "s1".to_string()];
        let fetched = log.fetch(Some(&ids)).await.unwrap();
        let got: Vec<&str> = fetched.iter().map(|r| r.comm_id.as_str()).collect();
        assert_eq!(got, vec!["s3", "s1"]);
    }

    #[tokio::test]
    async fn test_create_twice_is_rejected() {
        let log = log();
        log.create_session("s1", "team", &[]).await.unwrap();
        log.append("s1", message("s1", "keep")).await.unwrap();

        let err = assert_err!(log.create_session("s1", "other", &[]).await);
        assert!(matches!(err, ChatLogError::SessionExists(id) if id == "s1"));
        assert_eq!(log.get("s1").await.unwrap().unwrap().chat_record.len(), 1);
    }

    #[tokio::test]
    async fn test_append_unknown_session_is_kept() {
        let log = log();
        log.append("ghost", message("ghost", "hello")).await.unwrap();

        let record = log.get("ghost").await.unwrap().unwrap();
        assert!(record.team_name.is_empty());
        assert!(record.agent_names.is_empty());
        assert_eq!(record.chat_record.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_not_lost() {
        let log = Arc::new(log());
        log.create_session("s", "t", &[]).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..20 {
            let log = Arc::clone(&log);
            handles.push(tokio::spawn(async move {
                log.append("s", message("s", &i.to_string())).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(log.get("s").await.unwrap().unwrap().chat_record.len(), 20);
    }
}
