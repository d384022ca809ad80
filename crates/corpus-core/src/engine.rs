//! Engine - the single entry point the HTTP layer talks to.
//!
//! Built once at process start from an [`EngineConfig`] and shared behind an
//! `Arc`. Every public operation returns a definite result; transport and
//! configuration failures surface as `false`/`None`/`Err`, never as panics.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::capability::{CapabilityRegistry, HealthProber, ProbeSummary};
use crate::client::{CapabilityClient, SpeakRequest};
use crate::command::{Command, DEFAULT_PIPELINE_ID};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::pipeline::{PipelineManager, PipelineStages, PipelineStep};
use crate::status::SystemStatus;
use crate::types::{Capability, PipelineConfig, PipelineSnapshot, PipelineSummary};

/// Answer to a pipeline status query
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PipelineStatus {
    /// One pipeline, including its config
    Single(PipelineSnapshot),
    /// Every pipeline keyed by id
    All {
        pipelines: BTreeMap<String, PipelineSummary>,
    },
}

/// Capability health, vision→speech stages and continuous pipelines
pub struct Engine {
    config: EngineConfig,
    registry: Arc<CapabilityRegistry>,
    prober: HealthProber,
    stages: Arc<PipelineStages>,
    pipelines: PipelineManager,
}

impl Engine {
    /// Build the engine from configuration
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let registry = Arc::new(CapabilityRegistry::from_config(&config.capabilities)?);
        let client = CapabilityClient::new(&config.timeouts)?;

        let prober = HealthProber::new(Arc::clone(&registry), client.clone());
        let stages = Arc::new(PipelineStages::new(
            Arc::clone(&registry),
            client,
            config.health.clone(),
        ));
        let step: Arc<dyn PipelineStep> = stages.clone();
        let pipelines = PipelineManager::new(step, config.timeouts.stop_grace());

        info!(
            capabilities = config.capabilities.len(),
            gate_calls = config.health.gate_calls,
            "Engine initialized"
        );

        Ok(Self {
            config,
            registry,
            prober,
            stages,
            pipelines,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Known capabilities with their cached health
    pub async fn capabilities(&self) -> Vec<Capability> {
        self.registry.snapshot().await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Health
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn probe_all(&self) -> ProbeSummary {
        self.prober.probe_all().await
    }

    pub async fn probe_capability(&self, name: &str) -> bool {
        self.prober.probe(name).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Stages
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn speak(&self, text: &str) -> bool {
        self.stages.speak(text).await
    }

    /// Like [`Engine::speak`] but keeps the failure reason
    pub async fn try_speak(&self, text: &str) -> Result<()> {
        self.stages.try_speak(&SpeakRequest::text(text)).await
    }

    pub async fn get_vision_description(&self) -> Option<String> {
        self.stages.get_vision_description().await
    }

    /// Run the vision→speech chain once
    pub async fn execute_once(&self, config: &PipelineConfig) -> bool {
        self.stages.execute_once(config).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Continuous pipelines
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn start_continuous_pipeline(&self, id: &str, config: PipelineConfig) -> bool {
        self.pipelines.start(id, config).await
    }

    /// Like [`Engine::start_continuous_pipeline`] but keeps the refusal reason
    pub async fn try_start_continuous_pipeline(
        &self,
        id: &str,
        config: PipelineConfig,
    ) -> Result<()> {
        self.pipelines.try_start(id, config).await
    }

    pub async fn stop_pipeline(&self, id: &str) -> bool {
        self.pipelines.stop(id).await
    }

    pub async fn try_stop_pipeline(&self, id: &str) -> Result<()> {
        self.pipelines.try_stop(id).await
    }

    /// One pipeline when `id` is given, otherwise all of them
    pub async fn get_status(&self, id: Option<&str>) -> Result<PipelineStatus> {
        match id {
            Some(id) => Ok(PipelineStatus::Single(self.pipelines.status(id).await?)),
            None => Ok(PipelineStatus::All {
                pipelines: self.pipelines.statuses().await,
            }),
        }
    }

    /// Remove stopped and failed pipeline records
    pub async fn purge_stopped_pipelines(&self) -> usize {
        self.pipelines.purge_stopped().await
    }

    /// Stop every pipeline; call once at shutdown
    pub async fn cleanup_all(&self) -> usize {
        self.pipelines.cleanup_all().await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reporting and commands
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn system_status(&self) -> SystemStatus {
        SystemStatus::compose(self.registry.snapshot().await, self.pipelines.states().await)
    }

    /// Map a free-text command onto an engine operation
    pub async fn interpret_command(&self, input: &str) -> String {
        let command = Command::parse(input);
        let success = match &command {
            Command::Say(text) => self.speak(text).await,
            Command::SeeAndSay => self.execute_once(&self.config.pipeline).await,
            Command::StartContinuousVision => {
                self.start_continuous_pipeline(DEFAULT_PIPELINE_ID, self.config.pipeline.clone())
                    .await
            }
            Command::StopContinuous => self.stop_pipeline(DEFAULT_PIPELINE_ID).await,
            Command::Unknown => false,
        };
        command.reply(success).to_string()
    }
}
