//! System status snapshot for external reporting.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{Capability, CapabilityHealth, PipelineState};

/// Capability entry in the system status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityStatus {
    pub health: CapabilityHealth,
    pub endpoint: String,
    pub last_error: Option<String>,
}

impl From<Capability> for CapabilityStatus {
    fn from(capability: Capability) -> Self {
        Self {
            health: capability.health,
            endpoint: capability.endpoint,
            last_error: capability.last_error,
        }
    }
}

/// Capabilities and pipeline states at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub capabilities: BTreeMap<String, CapabilityStatus>,
    pub pipelines: BTreeMap<String, PipelineState>,
}

impl SystemStatus {
    pub fn compose(
        capabilities: Vec<Capability>,
        pipelines: BTreeMap<String, PipelineState>,
    ) -> Self {
        Self {
            capabilities: capabilities
                .into_iter()
                .map(|capability| (capability.name.clone(), capability.into()))
                .collect(),
            pipelines,
        }
    }

    pub fn online_count(&self) -> usize {
        self.capabilities
            .values()
            .filter(|c| c.health == CapabilityHealth::Online)
            .count()
    }

    pub fn running_count(&self) -> usize {
        self.pipelines
            .values()
            .filter(|s| **s == PipelineState::Running)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose() {
        let mut speech = Capability::new("speech", "http://s");
        speech.health = CapabilityHealth::Online;
        let mut vision = Capability::new("vision", "http://v");
        vision.health = CapabilityHealth::Error;
        vision.last_error = Some("timed out".into());

        let mut pipelines = BTreeMap::new();
        pipelines.insert("p1".to_string(), PipelineState::Running);
        pipelines.insert("p2".to_string(), PipelineState::Stopped);

        let status = SystemStatus::compose(vec![speech, vision], pipelines);
        assert_eq!(status.capabilities["speech"].endpoint, "http://s");
        assert_eq!(
            status.capabilities["vision"].last_error.as_deref(),
            Some("timed out")
        );
        assert_eq!(status.online_count(), 1);
        assert_eq!(status.running_count(), 1);
    }

    #[test]
    fn test_serialized_shape() {
        let status = SystemStatus::compose(
            vec![Capability::new("speech", "http://s")],
            BTreeMap::from([("p1".to_string(), PipelineState::Running)]),
        );
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "capabilities": {
                    "speech": { "health": "offline", "endpoint": "http://s", "last_error": null }
                },
                "pipelines": { "p1": "running" }
            })
        );
    }
}
