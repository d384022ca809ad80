//! Engine configuration
//!
//! Defines the capability endpoints, timeouts and health policy the engine is
//! built from. Loading (file, env) belongs to the embedding process.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::PipelineConfig;

/// Engine configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capability name -> endpoint
    #[serde(default = "default_capabilities")]
    pub capabilities: BTreeMap<String, CapabilityConfig>,

    /// Outbound call timeouts
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// How cached capability health interacts with stage calls
    #[serde(default)]
    pub health: HealthPolicy,

    /// Pipeline config used by the command interpreter
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capabilities: default_capabilities(),
            timeouts: TimeoutConfig::default(),
            health: HealthPolicy::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

/// A single capability entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityConfig {
    pub url: String,
}

fn default_capabilities() -> BTreeMap<String, CapabilityConfig> {
    [
        ("speech", "http://localhost:5001"),
        ("vision", "http://localhost:5002"),
        ("audio", "http://localhost:5003"),
        ("brain", "http://localhost:5004"),
    ]
    .into_iter()
    .map(|(name, url)| {
        (
            name.to_string(),
            CapabilityConfig {
                url: url.to_string(),
            },
        )
    })
    .collect()
}

/// Timeouts applied to every outbound call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Liveness probe timeout in milliseconds (default: 5000)
    #[serde(default = "default_probe_ms")]
    pub probe_ms: u64,

    /// Capability invocation timeout in milliseconds (default: 30000)
    #[serde(default = "default_call_ms")]
    pub call_ms: u64,

    /// How long `stop` waits for a pipeline task to exit (default: 2000)
    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,
}

fn default_probe_ms() -> u64 {
    5000
}

fn default_call_ms() -> u64 {
    30_000
}

fn default_stop_grace_ms() -> u64 {
    2000
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            probe_ms: default_probe_ms(),
            call_ms: default_call_ms(),
            stop_grace_ms: default_stop_grace_ms(),
        }
    }
}

impl TimeoutConfig {
    pub fn probe(&self) -> Duration {
        Duration::from_millis(self.probe_ms)
    }

    pub fn call(&self) -> Duration {
        Duration::from_millis(self.call_ms)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }
}

/// Health policy for stage calls.
///
/// With both flags off, health is purely observational: only the prober
/// writes it and every call is attempted regardless of the cached value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthPolicy {
    /// Refuse calls to capabilities whose cached health is not `online`
    #[serde(default)]
    pub gate_calls: bool,

    /// Record the outcome of stage calls into capability health
    #[serde(default)]
    pub track_calls: bool,
}

impl EngineConfig {
    /// Create a config with the given capabilities and default settings
    pub fn with_capabilities<I, N, U>(capabilities: I) -> Self
    where
        I: IntoIterator<Item = (N, U)>,
        N: Into<String>,
        U: Into<String>,
    {
        Self {
            capabilities: capabilities
                .into_iter()
                .map(|(name, url)| (name.into(), CapabilityConfig { url: url.into() }))
                .collect(),
            ..Default::default()
        }
    }

    /// Set timeouts
    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Set health policy
    pub fn with_health(mut self, health: HealthPolicy) -> Self {
        self.health = health;
        self
    }

    /// Set the default pipeline config
    pub fn with_pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for (name, capability) in &self.capabilities {
            if name.trim().is_empty() {
                return Err(Error::invalid_config("capabilities", "empty capability name"));
            }
            if capability.url.trim().is_empty() {
                return Err(Error::invalid_config(
                    format!("capabilities.{}.url", name),
                    "must not be empty",
                ));
            }
        }

        if self.timeouts.probe_ms == 0 {
            return Err(Error::invalid_config("timeouts.probe_ms", "must be greater than 0"));
        }
        if self.timeouts.call_ms == 0 {
            return Err(Error::invalid_config("timeouts.call_ms", "must be greater than 0"));
        }
        validate_pipeline(&self.pipeline)
    }
}

/// Validate a pipeline config before it is scheduled
pub fn validate_pipeline(config: &PipelineConfig) -> Result<()> {
    if config.interval_ms == 0 {
        return Err(Error::invalid_config(
            "pipeline.interval_ms",
            "must be greater than 0",
        ));
    }
    Ok(())
}
