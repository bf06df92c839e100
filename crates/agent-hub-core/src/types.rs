//! Data model shared by every hub component.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Session (teamup) identifier.
pub type CommId = String;

/// Public identity of an agent, as supplied on registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInfo {
    /// Unique agent name; the directory's primary key.
    pub name: String,
    /// Human-readable description of what the agent does.
    pub desc: String,
    /// Category tag.
    #[serde(rename = "type")]
    pub kind: String,
}

impl AgentInfo {
    #[must_use]
    pub fn new(name: impl Into<String>, desc: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            desc: desc.into(),
            kind: kind.into(),
        }
    }
}

/// Directory entry for a registered agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub name: String,
    pub desc: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Registration timestamp (Unix epoch seconds).
    pub created_at: i64,
}

impl AgentRecord {
    /// Stamp an identity with the current time.
    #[must_use]
    pub fn from_info(info: AgentInfo) -> Self {
        Self {
            name: info.name,
            desc: info.desc,
            kind: info.kind,
            created_at: unix_now(),
        }
    }

    /// Public view of the record.
    #[must_use]
    pub fn info(&self) -> AgentInfo {
        AgentInfo {
            name: self.name.clone(),
            desc: self.desc.clone(),
            kind: self.kind.clone(),
        }
    }
}

/// A chat message exchanged inside a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMessage {
    /// Name of the sending agent.
    pub sender: String,
    /// Target session.
    pub comm_id: CommId,
    /// Message payload.
    pub content: String,
}

/// A teamup: fixed membership created on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub comm_id: CommId,
    pub agent_names: Vec<String>,
}

/// Append-only history of one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub comm_id: CommId,
    pub team_name: String,
    /// Membership snapshot taken at creation.
    pub agent_names: Vec<String>,
    pub chat_record: Vec<AgentMessage>,
}

impl ChatRecord {
    #[must_use]
    pub fn new(comm_id: CommId, team_name: String, agent_names: Vec<String>) -> Self {
        Self {
            comm_id,
            team_name,
            agent_names,
            chat_record: Vec::new(),
        }
    }
}

/// Current time as Unix epoch seconds.
#[must_use]
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().try_into().unwrap_or(i64::MAX))
        .unwrap_or(0)
}
