//! Pipeline routes: one-shot execution and continuous pipeline control.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use corpus_core::types::PipelineConfig;
use corpus_core::PipelineStatus;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{api_error, ActionResponse, ApiError};
use crate::state::AppState;

/// Create pipeline router
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/pipeline/execute", post(execute))
        .route("/pipeline/start", post(start))
        .route("/pipeline/stop", post(stop))
        .route("/pipeline/status", get(list_status))
        .route("/pipeline/status/{id}", get(get_status))
}

/// Run the vision→speech chain once
pub async fn execute(
    State(state): State<Arc<AppState>>,
    body: Option<Json<PipelineConfig>>,
) -> Result<Json<ActionResponse>, ApiError> {
    let config = match body {
        Some(Json(config)) => config,
        None => state.engine.config().pipeline.clone(),
    };

    if !state.engine.execute_once(&config).await {
        return Err(api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Pipeline execution failed",
        ));
    }

    Ok(ActionResponse::success(
        "Vision→Speech pipeline executed successfully",
    ))
}

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub pipeline_id: Option<String>,
    pub config: Option<PipelineConfig>,
}

#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub status: &'static str,
    pub message: String,
    pub config: PipelineConfig,
}

/// Start a continuous pipeline
pub async fn start(
    State(state): State<Arc<AppState>>,
    body: Option<Json<StartRequest>>,
) -> Result<Json<StartResponse>, ApiError> {
    let Some(Json(StartRequest {
        pipeline_id: Some(id),
        config,
    })) = body
    else {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Missing 'pipeline_id' field",
        ));
    };

    let config = config.unwrap_or_else(|| state.engine.config().pipeline.clone());

    state
        .engine
        .try_start_continuous_pipeline(&id, config.clone())
        .await
        .map_err(|e| {
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to start pipeline '{}': {}", id, e),
            )
        })?;

    Ok(Json(StartResponse {
        status: "success",
        message: format!("Continuous pipeline '{}' started", id),
        config,
    }))
}

#[derive(Debug, Deserialize)]
pub struct StopRequest {
    pub pipeline_id: Option<String>,
}

/// Stop a continuous pipeline
pub async fn stop(
    State(state): State<Arc<AppState>>,
    body: Option<Json<StopRequest>>,
) -> Result<Json<ActionResponse>, ApiError> {
    let id = body
        .and_then(|Json(b)| b.pipeline_id)
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Missing 'pipeline_id' field"))?;

    state.engine.try_stop_pipeline(&id).await.map_err(|e| {
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to stop pipeline '{}': {}", id, e),
        )
    })?;

    Ok(ActionResponse::success(format!("Pipeline '{}' stopped", id)))
}

/// Status of every pipeline
pub async fn list_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PipelineStatus>, ApiError> {
    lookup_status(&state, None).await
}

/// Status of one pipeline
pub async fn get_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PipelineStatus>, ApiError> {
    lookup_status(&state, Some(&id)).await
}

async fn lookup_status(state: &AppState, id: Option<&str>) -> Result<Json<PipelineStatus>, ApiError> {
    state.engine.get_status(id).await.map(Json).map_err(|e| {
        let code = if e.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        api_error(code, e.to_string())
    })
}
