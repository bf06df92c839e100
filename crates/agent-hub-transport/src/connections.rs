//! Live connection registry.
//!
//! Maps agent names to the outbound queue of their current connection, plus a
//! single optional observer slot. A binding only says the agent is reachable
//! right now; it says nothing about registration.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, warn};

use crate::protocol::{EventKind, ObserverEvent};

/// Outbound queue of one connection, drained by that connection's writer task.
pub type Outbound = mpsc::UnboundedSender<String>;

/// Delivery error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("Recipient unreachable: {0}")]
    RecipientUnreachable(String),
}

/// Registry of live agent and observer channels.
#[derive(Default)]
pub struct ConnectionRegistry {
    agents: RwLock<HashMap<String, Outbound>>,
    observer: RwLock<Option<Outbound>>,
}

impl ConnectionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `channel`, replacing any previous binding.
    pub async fn bind(&self, name: &str, channel: Outbound) {
        if self
            .agents
            .write()
            .await
            .insert(name.to_string(), channel)
            .is_some()
        {
            debug!(agent = %name, "replaced existing connection");
        }
    }

    /// Remove the binding for `name`, if any.
    pub async fn unbind(&self, name: &str) -> bool {
        self.agents.write().await.remove(name).is_some()
    }

    /// Remove the binding for `name` only if it is still `channel`.
    ///
    /// A closing connection must not evict the connection that replaced it.
    pub async fn release(&self, name: &str, channel: &Outbound) -> bool {
        let mut agents = self.agents.write().await;
        if agents.get(name).is_some_and(|current| current.same_channel(channel)) {
            agents.remove(name);
            true
        } else {
            false
        }
    }

    /// Queue `frame` for delivery to `name`.
    ///
    /// # Errors
    /// Returns `RecipientUnreachable` if `name` is not bound or its connection
    /// has gone away; in the latter case the stale binding is dropped.
    pub async fn send_to(&self, name: &str, frame: &str) -> Result<(), DeliveryError> {
        let channel = self
            .agents
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| DeliveryError::RecipientUnreachable(name.to_string()))?;

        if channel.send(frame.to_string()).is_err() {
            self.release(name, &channel).await;
            return Err(DeliveryError::RecipientUnreachable(name.to_string()));
        }
        Ok(())
    }

    /// Check whether `name` currently has a connection.
    pub async fn is_bound(&self, name: &str) -> bool {
        self.agents.read().await.contains_key(name)
    }

    /// Names with a live binding, sorted.
    pub async fn bound_agents(&self) -> Vec<String> {
        let mut names: Vec<String> = self.agents.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Install the observer channel, replacing any previous one.
    pub async fn set_observer(&self, channel: Outbound) {
        if self.observer.write().await.replace(channel).is_some() {
            debug!("replaced existing observer");
        }
    }

    pub async fn clear_observer(&self) {
        self.observer.write().await.take();
    }

    /// Clear the observer slot only if it still holds `channel`.
    pub async fn release_observer(&self, channel: &Outbound) -> bool {
        let mut observer = self.observer.write().await;
        if observer
            .as_ref()
            .is_some_and(|current| current.same_channel(channel))
        {
            observer.take();
            true
        } else {
            false
        }
    }

    pub async fn has_observer(&self) -> bool {
        self.observer.read().await.is_some()
    }

    /// Mirror `payload` to the observer, tagged with `kind`.
    ///
    /// Best-effort: returns whether the event was queued. A dead observer is
    /// cleared.
    pub async fn broadcast_to_observer<T: Serialize>(&self, kind: EventKind, payload: &T) -> bool {
        let Some(channel) = self.observer.read().await.clone() else {
            return false;
        };

        let json = match serde_json::to_string(&ObserverEvent {
            payload,
            frontend_type: kind,
        }) {
            Ok(j) => j,
            Err(e) => {
                warn!("Failed to serialize observer event: {e}");
                return false;
            }
        };

        if channel.send(json).is_err() {
            debug!("observer gone, clearing");
            self.release_observer(&channel).await;
            return false;
        }
        true
    }
}
