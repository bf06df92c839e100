//! Registries behind the agent hub.
//!
//! Provides:
//! - `AgentDirectory` - agent registration, exact and capability lookup
//! - `SessionStore` - teamup membership
//! - `ChatLog` - append-only chat records
//! - `KeywordIndex` - in-process capability search
//! - Storage implementations (memory, SQLite)

pub mod chat_log;
pub mod directory;
pub mod search;
pub mod sessions;
pub mod storage;

pub use chat_log::{ChatLog, ChatLogError};
pub use directory::{AgentDirectory, DirectoryError, RegistrationOutcome};
pub use search::KeywordIndex;
pub use sessions::SessionStore;
