//! In-process keyword ranking of registered agents.
//!
//! Stands in for an external similarity-search engine: agents are indexed by
//! the terms of their name, description and type, and each capability keyword
//! is scored by how many of its terms an agent carries.

use std::{collections::HashSet, sync::RwLock};

use agent_hub_core::{
    AgentRecord,
    traits::{CapabilitySearch, SearchError},
};
use async_trait::async_trait;

/// Default number of candidates returned per keyword.
pub const DEFAULT_LIMIT: usize = 5;

struct IndexedAgent {
    name: String,
    terms: HashSet<String>,
}

fn terms(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// Term-overlap index over agent metadata.
pub struct KeywordIndex {
    limit: usize,
    agents: RwLock<Vec<IndexedAgent>>,
}

impl KeywordIndex {
    /// Create an index returning at most `limit` candidates per keyword.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            agents: RwLock::new(Vec::new()),
        }
    }

    fn rank_one(&self, agents: &[IndexedAgent], keyword: &str) -> Vec<String> {
        let wanted: HashSet<String> = terms(keyword).collect();
        if wanted.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, usize)> = agents
            .iter()
            .enumerate()
            .filter_map(|(pos, agent)| {
                let score = wanted.intersection(&agent.terms).count();
                (score > 0).then_some((score, pos))
            })
            .collect();

        // Highest score first; ties keep registration order.
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        scored
            .into_iter()
            .take(self.limit)
            .map(|(_, pos)| agents[pos].name.clone())
            .collect()
    }
}

impl Default for KeywordIndex {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT)
    }
}

#[async_trait]
impl CapabilitySearch for KeywordIndex {
    async fn index(&self, record: &AgentRecord) -> Result<(), SearchError> {
        let indexed = IndexedAgent {
            name: record.name.clone(),
            terms: terms(&record.name)
                .chain(terms(&record.desc))
                .chain(terms(&record.kind))
                .collect(),
        };

        let mut agents = self
            .agents
            .write()
            .map_err(|e| SearchError::Internal(e.to_string()))?;
        if let Some(existing) = agents.iter_mut().find(|a| a.name == record.name) {
            *existing = indexed;
        } else {
            agents.push(indexed);
        }
        Ok(())
    }

    async fn rank(&self, keywords: &[String]) -> Result<Vec<Vec<String>>, SearchError> {
        let agents = self
            .agents
            .read()
            .map_err(|e| SearchError::Internal(e.to_string()))?;
        Ok(keywords
            .iter()
            .map(|keyword| self.rank_one(&agents, keyword))
            .collect())
    }
}
