//! Concurrent liveness checks against every registered capability.

use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::capability::CapabilityRegistry;
use crate::client::CapabilityClient;
use crate::types::CapabilityHealth;

/// Outcome of one `probe_all` sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProbeSummary {
    pub total: usize,
    pub online: usize,
}

/// HealthProber fans out one `GET /status` per capability
pub struct HealthProber {
    registry: Arc<CapabilityRegistry>,
    client: CapabilityClient,
}

impl HealthProber {
    pub fn new(registry: Arc<CapabilityRegistry>, client: CapabilityClient) -> Self {
        Self { registry, client }
    }

    /// Probe every capability concurrently and record the results.
    ///
    /// A failing probe never affects the others. There is no retry; call
    /// again on whatever cadence the caller wants.
    pub async fn probe_all(&self) -> ProbeSummary {
        let names = self.registry.names().await;
        let results = join_all(names.iter().map(|name| self.probe(name))).await;

        let summary = ProbeSummary {
            total: results.len(),
            online: results.iter().filter(|online| **online).count(),
        };
        info!(
            total = summary.total,
            online = summary.online,
            "Capability probe complete"
        );
        summary
    }

    /// Probe a single capability. Returns false for unknown names.
    pub async fn probe(&self, name: &str) -> bool {
        let Some(capability) = self.registry.get(name).await else {
            return false;
        };

        match self.client.check_status(&capability).await {
            Ok(()) => {
                self.registry
                    .set_health(name, CapabilityHealth::Online, None)
                    .await;
                true
            }
            Err(e) => {
                error!(capability = %name, error = %e, "Capability check failed");
                self.registry
                    .set_health(name, CapabilityHealth::Error, Some(e.to_string()))
                    .await;
                false
            }
        }
    }
}
