//! HTTP request handlers.

use std::sync::Arc;

use agent_hub_core::{AgentInfo, AgentRecord};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use crate::{
    hub::{Hub, HubError},
    protocol::{
        ChatRecordFetchParam, ChatRecords, OneOrMany, QueryParam, RetrieveParam, TeamupOutput,
        TeamupParam,
    },
};

/// Error returned to HTTP callers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Hub(#[from] HubError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("Request failed: {self}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

pub async fn health_check() -> Json<&'static str> {
    Json("ok")
}

/// Idempotent agent registration.
///
/// # Errors
/// Returns error if the directory fails.
pub async fn register(
    State(hub): State<Arc<Hub>>,
    Json(info): Json<AgentInfo>,
) -> Result<Json<()>, ApiError> {
    hub.register(info).await?;
    Ok(Json(()))
}

/// # Errors
/// Returns error if the directory fails.
pub async fn query_assistant(
    State(hub): State<Arc<Hub>>,
    Json(param): Json<QueryParam>,
) -> Result<Json<OneOrMany<Option<AgentInfo>>>, ApiError> {
    Ok(Json(hub.query(param.name).await?))
}

/// # Errors
/// Returns error if the directory or search fails.
pub async fn retrieve_assistant(
    State(hub): State<Arc<Hub>>,
    Json(param): Json<RetrieveParam>,
) -> Result<Json<Vec<AgentInfo>>, ApiError> {
    Ok(Json(hub.retrieve(&param).await?))
}

/// # Errors
/// Returns error if a backing store fails.
pub async fn teamup(
    State(hub): State<Arc<Hub>>,
    Json(param): Json<TeamupParam>,
) -> Result<Json<TeamupOutput>, ApiError> {
    Ok(Json(hub.teamup(param).await?))
}

/// # Errors
/// Returns error if the directory fails.
pub async fn list_all_agents(
    State(hub): State<Arc<Hub>>,
) -> Result<Json<Vec<AgentRecord>>, ApiError> {
    Ok(Json(hub.list_all_agents().await?))
}

/// # Errors
/// Returns error if the chat log fails.
pub async fn fetch_chat_record(
    State(hub): State<Arc<Hub>>,
    Json(param): Json<ChatRecordFetchParam>,
) -> Result<Json<ChatRecords>, ApiError> {
    Ok(Json(hub.fetch_chat_records(param.comm_id).await?))
}
