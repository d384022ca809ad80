//! Health check endpoint.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: HealthComponents,
    pub metrics: HealthMetrics,
}

#[derive(Serialize)]
pub struct HealthComponents {
    pub capabilities_total: usize,
    pub capabilities_online: usize,
}

#[derive(Serialize)]
pub struct HealthMetrics {
    pub running_pipelines: usize,
    pub probe_interval_secs: u64,
}

/// Health check endpoint.
///
/// Reports cached capability health; it does not probe.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthStatus> {
    let system = state.engine.system_status().await;

    let total = system.capabilities.len();
    let online = system.online_count();

    let status = if online == total { "healthy" } else { "degraded" };

    Json(HealthStatus {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        components: HealthComponents {
            capabilities_total: total,
            capabilities_online: online,
        },
        metrics: HealthMetrics {
            running_pipelines: system.running_count(),
            probe_interval_secs: state.config.server.probe_interval_secs,
        },
    })
}
