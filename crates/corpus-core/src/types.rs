//! Shared types for corpus-core.
//!
//! These types are returned by the engine and serialized as-is by the HTTP layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ─────────────────────────────────────────────────────────────────────────────
// Capabilities
// ─────────────────────────────────────────────────────────────────────────────

/// Last observed health of a capability service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityHealth {
    #[default]
    Offline,
    Online,
    Error,
}

impl CapabilityHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Online => "online",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for CapabilityHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A downstream capability service addressed by a base URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    pub endpoint: String,
    pub health: CapabilityHealth,
    pub last_error: Option<String>,
}

impl Capability {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            health: CapabilityHealth::Offline,
            last_error: None,
        }
    }

    /// Join a path onto the capability endpoint
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pipelines
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle state of a continuous pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    #[default]
    Stopped,
    Running,
    Error,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-pipeline settings for the vision→speech chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Delay between iterations in milliseconds (default: 5000)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Voice used by the speech capability (default: "ito")
    #[serde(default = "default_voice_id")]
    pub voice_id: String,

    /// Emotional framing applied to descriptions (default: "observant")
    #[serde(default = "default_emotion_tag", alias = "emotion")]
    pub emotion_tag: String,
}

pub(crate) fn default_interval_ms() -> u64 {
    5000
}

fn default_voice_id() -> String {
    "ito".to_string()
}

fn default_emotion_tag() -> String {
    "observant".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            voice_id: default_voice_id(),
            emotion_tag: default_emotion_tag(),
        }
    }
}

/// Execution counters for a continuous pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub execution_count: u64,
    pub success_count: u64,
    pub started_at: DateTime<Utc>,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self {
            execution_count: 0,
            success_count: 0,
            started_at: Utc::now(),
        }
    }
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Full view of one pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSnapshot {
    pub id: String,
    pub stages: Vec<String>,
    pub state: PipelineState,
    pub config: PipelineConfig,
    pub stats: PipelineStats,
}

/// Pipeline listing entry (no config)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub id: String,
    pub stages: Vec<String>,
    pub state: PipelineState,
    pub stats: PipelineStats,
}

impl From<PipelineSnapshot> for PipelineSummary {
    fn from(snapshot: PipelineSnapshot) -> Self {
        Self {
            id: snapshot.id,
            stages: snapshot.stages,
            state: snapshot.state,
            stats: snapshot.stats,
        }
    }
}

/// Voice settings forwarded to the speech capability with pipeline output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceConfig {
    pub voice_id: String,
    pub emotion: String,
    pub context: String,
}

impl VoiceConfig {
    pub fn for_observation(config: &PipelineConfig) -> Self {
        Self {
            voice_id: config.voice_id.clone(),
            emotion: config.emotion_tag.clone(),
            context: "visual_observation".to_string(),
        }
    }
}
