//! Core abstractions for the agent hub.
//!
//! This crate provides the fundamental building blocks:
//! - Data model (`AgentInfo`, `AgentRecord`, `AgentMessage`, `Session`, `ChatRecord`)
//! - `KvStore` and `CapabilitySearch` traits for external collaborators
//! - `Table` - typed view over a `KvStore`
//! - `merge_ranked` - first-seen-wins merge of ranked result lists

pub mod merge;
pub mod table;
pub mod traits;
pub mod types;

pub use merge::merge_ranked;
pub use table::Table;
pub use traits::{CapabilitySearch, KvStore, SearchError, StorageError};
pub use types::{AgentInfo, AgentMessage, AgentRecord, ChatRecord, CommId, Session, unix_now};
