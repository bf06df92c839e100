//! Per-connection message routing.
//!
//! Every inbound agent frame goes through the same pipeline: parse, session
//! check, chat log append, observer mirror, fan-out to session members. No
//! step aborts the connection; only a transport disconnect ends it.

use std::sync::Arc;

use agent_hub_core::AgentMessage;
use futures::{Stream, StreamExt};
use tracing::{debug, error, info, warn};

use crate::{connections::Outbound, hub::Hub, protocol::EventKind};

/// Transport-neutral inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A text payload.
    Text(String),
    /// The peer disconnected.
    Close,
}

/// Lifecycle of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Active,
    Closed,
}

/// Routing error.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("Malformed message: {0}")]
    MalformedMessage(String),
}

/// What happened to one routed message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteReport {
    /// The session had no membership record.
    pub unknown_session: bool,
    /// The message was recorded in the chat log.
    pub recorded: bool,
    /// The observer received a mirror.
    pub mirrored: bool,
    /// Members the message was queued for.
    pub delivered: Vec<String>,
    /// Members without a live connection.
    pub unreachable: Vec<String>,
}

/// Routes agent messages through the hub.
#[derive(Clone)]
pub struct MessageRouter {
    hub: Arc<Hub>,
}

impl MessageRouter {
    #[must_use]
    pub const fn new(hub: Arc<Hub>) -> Self {
        Self { hub }
    }

    #[must_use]
    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    /// Parse and validate a raw frame.
    ///
    /// # Errors
    /// Returns `MalformedMessage` for invalid JSON or an empty session id.
    pub fn parse(raw: &str) -> Result<AgentMessage, RouteError> {
        let message: AgentMessage =
            serde_json::from_str(raw).map_err(|e| RouteError::MalformedMessage(e.to_string()))?;
        if message.comm_id.is_empty() {
            return Err(RouteError::MalformedMessage("empty comm_id".to_string()));
        }
        Ok(message)
    }

    /// Run a raw frame received from `agent` through the full pipeline.
    ///
    /// # Errors
    /// Returns `MalformedMessage` if the frame does not parse; nothing else
    /// is an error.
    pub async fn route(&self, agent: &str, raw: &str) -> Result<RouteReport, RouteError> {
        let message = Self::parse(raw)?;
        Ok(self.dispatch(agent, message).await)
    }

    /// Record, mirror and fan out a parsed message.
    pub async fn dispatch(&self, agent: &str, message: AgentMessage) -> RouteReport {
        let mut report = RouteReport::default();
        let comm_id = message.comm_id.clone();

        // Unknown sessions are logged, not rejected: the message is still
        // recorded and fanned out to whatever membership exists (none).
        let members = match self.hub.sessions().members_of(&comm_id).await {
            Ok(Some(members)) => members,
            Ok(None) => {
                warn!(agent = %agent, comm_id = %comm_id, "message for unknown session");
                report.unknown_session = true;
                Vec::new()
            }
            Err(e) => {
                error!(comm_id = %comm_id, "failed to load session: {e}");
                report.unknown_session = true;
                Vec::new()
            }
        };

        match self.hub.chat_log().append(&comm_id, message.clone()).await {
            Ok(()) => report.recorded = true,
            Err(e) => error!(comm_id = %comm_id, "failed to record message: {e}"),
        }

        report.mirrored = self
            .hub
            .connections()
            .broadcast_to_observer(EventKind::Message, &message)
            .await;

        let frame = match serde_json::to_string(&message) {
            Ok(j) => j,
            Err(e) => {
                error!("Failed to serialize message: {e}");
                return report;
            }
        };

        for member in members {
            match self.hub.connections().send_to(&member, &frame).await {
                Ok(()) => report.delivered.push(member),
                Err(e) => {
                    warn!(comm_id = %comm_id, "{e}");
                    report.unreachable.push(member);
                }
            }
        }

        debug!(
            agent = %agent,
            comm_id = %comm_id,
            delivered = report.delivered.len(),
            unreachable = report.unreachable.len(),
            "message routed"
        );
        report
    }
}

/// An agent's duplex connection.
pub struct AgentConnection {
    router: MessageRouter,
    name: String,
    outbound: Outbound,
    state: ConnectionState,
}

impl AgentConnection {
    #[must_use]
    pub const fn new(router: MessageRouter, name: String, outbound: Outbound) -> Self {
        Self {
            router,
            name,
            outbound,
            state: ConnectionState::Connecting,
        }
    }

    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Bind the outbound channel and start accepting frames.
    pub async fn open(&mut self) {
        if self.state != ConnectionState::Connecting {
            return;
        }
        self.router
            .hub()
            .connections()
            .bind(&self.name, self.outbound.clone())
            .await;
        self.state = ConnectionState::Active;
        info!(agent = %self.name, "agent connected");
    }

    /// Handle one inbound frame.
    pub async fn handle_frame(&mut self, frame: Frame) {
        if self.state != ConnectionState::Active {
            debug!(agent = %self.name, "ignoring frame on inactive connection");
            return;
        }
        match frame {
            Frame::Text(raw) => {
                if let Err(e) = self.router.route(&self.name, &raw).await {
                    warn!(agent = %self.name, "{e}");
                }
            }
            Frame::Close => self.close().await,
        }
    }

    /// Release the binding. Terminal.
    pub async fn close(&mut self) {
        if self.state == ConnectionState::Closed {
            return;
        }
        self.router
            .hub()
            .connections()
            .release(&self.name, &self.outbound)
            .await;
        self.state = ConnectionState::Closed;
        info!(agent = %self.name, "agent disconnected");
    }

    /// Drive the connection until the peer disconnects.
    pub async fn run<S>(mut self, inbound: S) -> ConnectionState
    where
        S: Stream<Item = Frame>,
    {
        tokio::pin!(inbound);

        self.open().await;
        while self.state == ConnectionState::Active {
            match inbound.next().await {
                Some(frame) => self.handle_frame(frame).await,
                None => self.close().await,
            }
        }
        self.state
    }
}

/// The observer's connection. Inbound frames are discarded.
pub struct ObserverConnection {
    hub: Arc<Hub>,
    outbound: Outbound,
    state: ConnectionState,
}

impl ObserverConnection {
    #[must_use]
    pub const fn new(hub: Arc<Hub>, outbound: Outbound) -> Self {
        Self {
            hub,
            outbound,
            state: ConnectionState::Connecting,
        }
    }

    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Drive the connection until the peer disconnects.
    pub async fn run<S>(mut self, inbound: S) -> ConnectionState
    where
        S: Stream<Item = Frame>,
    {
        tokio::pin!(inbound);

        self.hub.connections().set_observer(self.outbound.clone()).await;
        self.state = ConnectionState::Active;
        info!("observer connected");

        while let Some(frame) = inbound.next().await {
            if frame == Frame::Close {
                break;
            }
        }

        self.hub.connections().release_observer(&self.outbound).await;
        self.state = ConnectionState::Closed;
        info!("observer disconnected");
        self.state
    }
}
