//! Direct stage calls and free-text commands.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{api_error, ActionResponse, ApiError};
use crate::state::AppState;

/// Create stage router
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/speak", post(speak))
        .route("/vision/describe", get(describe))
        .route("/command", post(command))
}

#[derive(Debug, Deserialize)]
pub struct SpeakBody {
    pub text: Option<String>,
}

/// Speak text through the speech capability
pub async fn speak(
    State(state): State<Arc<AppState>>,
    body: Option<Json<SpeakBody>>,
) -> Result<Json<ActionResponse>, ApiError> {
    let text = body
        .and_then(|Json(b)| b.text)
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Missing 'text' field"))?;

    state
        .engine
        .try_speak(&text)
        .await
        .map_err(|e| {
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to speak text: {}", e),
            )
        })?;

    Ok(ActionResponse::success("Text spoken"))
}

#[derive(Debug, Serialize)]
pub struct DescribeResponse {
    pub status: &'static str,
    pub description: String,
}

/// Current scene description from the vision capability
pub async fn describe(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DescribeResponse>, ApiError> {
    let description = state.engine.get_vision_description().await.ok_or_else(|| {
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to get vision description",
        )
    })?;

    Ok(Json(DescribeResponse {
        status: "success",
        description,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CommandBody {
    pub command: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub result: String,
}

/// Interpret a free-text command
pub async fn command(
    State(state): State<Arc<AppState>>,
    body: Option<Json<CommandBody>>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = body
        .and_then(|Json(b)| b.command)
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Missing 'command' field"))?;

    let result = state.engine.interpret_command(&command).await;
    Ok(Json(CommandResponse { result }))
}
