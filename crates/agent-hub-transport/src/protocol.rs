//! Wire protocol for HTTP requests and observer events.

use std::collections::HashSet;

use agent_hub_core::{ChatRecord, CommId};
use serde::{Deserialize, Serialize, Serializer};

/// A single value or a list, preserving the caller's shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Flatten into a list.
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

/// Exact agent lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryParam {
    pub name: OneOrMany<String>,
}

/// Capability-based agent retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieveParam {
    /// Requesting agent.
    pub sender: String,
    /// Capability keywords, most important first.
    pub capabilities: Vec<String>,
}

/// Session creation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamupParam {
    /// Requesting agent; joins the session if registered.
    pub sender: String,
    pub agent_names: Vec<String>,
    pub team_name: String,
}

/// Session creation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamupOutput {
    pub comm_id: CommId,
    pub agent_names: Vec<String>,
    pub team_name: String,
}

/// Chat record fetch; no id means every record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRecordFetchParam {
    #[serde(default)]
    pub comm_id: Option<OneOrMany<CommId>>,
}

/// Chat records keyed by session id.
///
/// Serializes as a JSON object whose keys keep the order the records were
/// fetched in; a repeated id keeps its first record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatRecords(Vec<ChatRecord>);

impl ChatRecords {
    #[must_use]
    pub fn new(records: Vec<ChatRecord>) -> Self {
        let mut seen = HashSet::new();
        Self(
            records
                .into_iter()
                .filter(|record| seen.insert(record.comm_id.clone()))
                .collect(),
        )
    }

    #[must_use]
    pub fn get(&self, comm_id: &str) -> Option<&ChatRecord> {
        self.0.iter().find(|record| record.comm_id == comm_id)
    }

    #[must_use]
    pub fn contains_key(&self, comm_id: &str) -> bool {
        self.get(comm_id).is_some()
    }

    /// Session ids, in order.
    pub fn comm_ids(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|record| record.comm_id.as_str())
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<ChatRecord> {
        self.0
    }
}

impl Serialize for ChatRecords {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|record| (&record.comm_id, record)))
    }
}

/// Observer event tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A routed agent message.
    Message,
    /// A newly formed session.
    Teamup,
}

/// Envelope mirrored to the observer: the payload's fields plus a tag.
#[derive(Debug, Serialize)]
pub struct ObserverEvent<'a, T: Serialize> {
    #[serde(flatten)]
    pub payload: &'a T,
    pub frontend_type: EventKind,
}
