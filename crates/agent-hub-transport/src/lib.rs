//! Connection handling and transport for the agent hub.
//!
//! Provides:
//! - `ConnectionRegistry` - live agent and observer channels
//! - `MessageRouter` - per-connection routing pipeline
//! - `Hub` - request operations over the registries
//! - Wire protocol types
//! - WebSocket + HTTP routes (feature: websocket)

pub mod connections;
pub mod hub;
pub mod protocol;
pub mod router;

#[cfg(feature = "websocket")]
pub mod http;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use connections::{ConnectionRegistry, DeliveryError, Outbound};
pub use hub::{Hub, HubError};
pub use router::{AgentConnection, ConnectionState, Frame, MessageRouter, RouteError, RouteReport};

/// Create the hub router.
///
/// # Example
/// ```ignore
/// let app = create_router(Arc::new(hub)).layer(CorsLayer::permissive());
/// ```
#[cfg(feature = "websocket")]
#[must_use]
pub fn create_router(hub: std::sync::Arc<Hub>) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/health_check", post(http::health_check))
        .route("/register", post(http::register))
        .route("/query_assistant", post(http::query_assistant))
        .route("/retrieve_assistant", post(http::retrieve_assistant))
        .route("/teamup", post(http::teamup))
        .route("/list_all_agents", post(http::list_all_agents))
        .route("/fetch_chat_record", post(http::fetch_chat_record))
        .route("/ws/{agent_name}", get(websocket::agent_ws_handler))
        .route("/chatlist_ws", get(websocket::observer_ws_handler))
        .with_state(hub)
}
