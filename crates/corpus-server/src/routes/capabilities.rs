//! Capability catalogue and system status routes.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use corpus_core::capability::ProbeSummary;
use corpus_core::status::SystemStatus;
use corpus_core::types::CapabilityHealth;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::state::AppState;

/// Routes this server exposes, listed in the catalogue
const ORCHESTRATOR_ENDPOINTS: &[&str] = &[
    "/health",
    "/status",
    "/speak",
    "/command",
    "/vision/describe",
    "/pipeline/execute",
    "/pipeline/start",
    "/pipeline/stop",
    "/pipeline/status",
    "/capabilities",
    "/capabilities/check",
];

/// Create capability router
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", get(system_status))
        .route("/capabilities", get(list_capabilities))
        .route("/capabilities/check", post(check_capabilities))
}

/// Endpoints a well-known capability service offers
fn capability_endpoints(name: &str) -> &'static [&'static str] {
    match name {
        "speech" => &["/speak", "/status", "/config", "/voices"],
        "vision" => &[
            "/capture",
            "/analyze",
            "/describe",
            "/start_loop",
            "/stop_loop",
            "/config",
        ],
        "audio" | "brain" => &["(not implemented)"],
        _ => &["(unknown)"],
    }
}

#[derive(Debug, Serialize)]
pub struct CapabilityInfo {
    pub url: String,
    pub status: CapabilityHealth,
    pub last_error: Option<String>,
    pub endpoints: &'static [&'static str],
}

#[derive(Debug, Serialize)]
pub struct CatalogueResponse {
    pub available_capabilities: BTreeMap<String, CapabilityInfo>,
    pub orchestrator_endpoints: &'static [&'static str],
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub probe: ProbeSummary,
    #[serde(flatten)]
    pub status: SystemStatus,
}

/// Cached capability health and pipeline states
pub async fn system_status(State(state): State<Arc<AppState>>) -> Json<SystemStatus> {
    Json(state.engine.system_status().await)
}

/// List capabilities with their endpoints
pub async fn list_capabilities(State(state): State<Arc<AppState>>) -> Json<CatalogueResponse> {
    let available_capabilities = state
        .engine
        .capabilities()
        .await
        .into_iter()
        .map(|capability| {
            let endpoints = capability_endpoints(&capability.name);
            (
                capability.name,
                CapabilityInfo {
                    url: capability.endpoint,
                    status: capability.health,
                    last_error: capability.last_error,
                    endpoints,
                },
            )
        })
        .collect();

    Json(CatalogueResponse {
        available_capabilities,
        orchestrator_endpoints: ORCHESTRATOR_ENDPOINTS,
    })
}

/// Probe every capability now, then report
pub async fn check_capabilities(State(state): State<Arc<AppState>>) -> Json<CheckResponse> {
    let probe = state.engine.probe_all().await;
    Json(CheckResponse {
        probe,
        status: state.engine.system_status().await,
    })
}
