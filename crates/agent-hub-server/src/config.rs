//! Server configuration from the environment.

use std::{
    net::{AddrParseError, SocketAddr},
    path::PathBuf,
};

use agent_hub_registry::search::DEFAULT_LIMIT;

pub const ADDR_VAR: &str = "AGENT_HUB_ADDR";
pub const DATABASE_VAR: &str = "AGENT_HUB_DATABASE";
pub const SEARCH_LIMIT_VAR: &str = "AGENT_HUB_SEARCH_LIMIT";

const DEFAULT_ADDR: &str = "0.0.0.0:7788";

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid AGENT_HUB_ADDR {value:?}: {source}")]
    InvalidAddr {
        value: String,
        source: AddrParseError,
    },
    #[error("Invalid AGENT_HUB_SEARCH_LIMIT {0:?}: expected a positive integer")]
    InvalidSearchLimit(String),
}

/// Where hub state lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    /// Nothing survives a restart.
    Memory,
    /// SQLite database file.
    Sqlite(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub storage: StorageConfig,
    /// Candidates returned per capability keyword.
    pub search_limit: usize,
}

impl ServerConfig {
    /// Read configuration from process environment variables.
    ///
    /// # Errors
    /// Returns error if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, falling back to defaults.
    ///
    /// # Errors
    /// Returns error if a variable is set to an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_addr = lookup(ADDR_VAR).unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = raw_addr
            .parse::<SocketAddr>()
            .map_err(|source| ConfigError::InvalidAddr {
                value: raw_addr.clone(),
                source,
            })?;

        let storage = match lookup(DATABASE_VAR) {
            Some(value) if value == ":memory:" => StorageConfig::Memory,
            Some(value) => StorageConfig::Sqlite(PathBuf::from(value)),
            None => StorageConfig::Sqlite(default_database_path()),
        };

        let search_limit = match lookup(SEARCH_LIMIT_VAR) {
            Some(value) => match value.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::InvalidSearchLimit(value)),
            },
            None => DEFAULT_LIMIT,
        };

        Ok(Self {
            addr,
            storage,
            search_limit,
        })
    }
}

fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("agent-hub")
        .join("hub.db")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tokio_test::assert_ok;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = assert_ok!(config_from(&[]));
        assert_eq!(config.addr, "0.0.0.0:7788".parse().unwrap());
        assert_eq!(config.search_limit, DEFAULT_LIMIT);
        assert!(matches!(
            config.storage,
            StorageConfig::Sqlite(ref path) if path.ends_with("agent-hub/hub.db")
        ));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            (ADDR_VAR, "127.0.0.1:9000"),
            (DATABASE_VAR, ":memory:"),
            (SEARCH_LIMIT_VAR, "12"),
        ])
        .unwrap();
        assert_eq!(config.addr.port(), 9000);
        assert_eq!(config.storage, StorageConfig::Memory);
        assert_eq!(config.search_limit, 12);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            config_from(&[(ADDR_VAR, "nowhere")]),
            Err(ConfigError::InvalidAddr { .. })
        ));
        assert!(matches!(
            config_from(&[(SEARCH_LIMIT_VAR, "0")]),
            Err(ConfigError::InvalidSearchLimit(_))
        ));
    }
}
