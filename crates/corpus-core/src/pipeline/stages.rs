//! Pipeline stage functions: single capability calls plus the enrichment
//! transform that sits between vision and speech.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::capability::CapabilityRegistry;
use crate::client::{CapabilityClient, SpeakRequest};
use crate::config::HealthPolicy;
use crate::error::{Error, Result};
use crate::types::{Capability, CapabilityHealth, PipelineConfig, VoiceConfig};

/// Capability that turns text into audio
pub const SPEECH: &str = "speech";
/// Capability that describes the current camera frame
pub const VISION: &str = "vision";

/// One execution of a pipeline body.
///
/// The lifecycle manager only needs this seam; the HTTP-backed
/// implementation is [`PipelineStages`].
#[async_trait]
pub trait PipelineStep: Send + Sync {
    /// Capability names involved, in execution order
    fn stages(&self) -> Vec<String>;

    /// Run the chain once. Never fails past this boundary.
    async fn execute_once(&self, config: &PipelineConfig) -> bool;
}

/// Prefix an observation with emotional framing.
pub fn enrich(description: &str, emotion_tag: &str) -> String {
    let prefix = match emotion_tag {
        "calm" => "In this peaceful moment, ",
        "excited" => "I'm excited to see that ",
        "curious" => "I'm curious about what I'm seeing - ",
        "observant" => "I notice that ",
        _ => "I can see that ",
    };
    format!("{}{}", prefix, description.to_lowercase())
}

/// Vision→speech stage calls backed by the capability registry
pub struct PipelineStages {
    registry: Arc<CapabilityRegistry>,
    client: CapabilityClient,
    policy: HealthPolicy,
}

impl PipelineStages {
    pub fn new(
        registry: Arc<CapabilityRegistry>,
        client: CapabilityClient,
        policy: HealthPolicy,
    ) -> Self {
        Self {
            registry,
            client,
            policy,
        }
    }

    /// Send text to the speech capability
    pub async fn speak(&self, text: &str) -> bool {
        match self.try_speak(&SpeakRequest::text(text)).await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "Failed to speak");
                false
            }
        }
    }

    pub async fn try_speak(&self, request: &SpeakRequest) -> Result<()> {
        let capability = self.resolve(SPEECH).await?;
        let result = self.client.speak(&capability, request).await;
        self.record(SPEECH, &result).await;
        result
    }

    /// Fetch a description of what the vision capability currently sees
    pub async fn get_vision_description(&self) -> Option<String> {
        match self.try_vision_description().await {
            Ok(description) => Some(description),
            Err(e) => {
                error!(error = %e, "Failed to get vision description");
                None
            }
        }
    }

    pub async fn try_vision_description(&self) -> Result<String> {
        let capability = self.resolve(VISION).await?;
        let result = self.client.analyze(&capability).await;
        self.record(VISION, &result).await;
        result
    }

    /// Vision → enrich → speech, reporting why a run failed
    pub async fn try_execute_once(&self, config: &PipelineConfig) -> Result<()> {
        let description = self.try_vision_description().await?;
        if description.trim().is_empty() {
            return Err(Error::MissingDescription);
        }
        let text = enrich(&description, &config.emotion_tag);
        debug!(
            voice_id = %config.voice_id,
            emotion = %config.emotion_tag,
            "Forwarding observation to speech"
        );

        let request = SpeakRequest::text(text).with_voice(VoiceConfig::for_observation(config));
        self.try_speak(&request).await
    }

    /// Find a capability and apply the gating policy
    async fn resolve(&self, name: &str) -> Result<Capability> {
        let capability = self
            .registry
            .get(name)
            .await
            .ok_or_else(|| Error::CapabilityNotRegistered(name.to_string()))?;

        if self.policy.gate_calls && capability.health != CapabilityHealth::Online {
            return Err(Error::CapabilityUnavailable {
                name: capability.name,
                health: capability.health,
            });
        }
        Ok(capability)
    }

    async fn record<T>(&self, name: &str, result: &Result<T>) {
        if !self.policy.track_calls {
            return;
        }
        match result {
            Ok(_) => {
                self.registry
                    .set_health(name, CapabilityHealth::Online, None)
                    .await;
            }
            Err(e) if e.is_transport() => {
                self.registry
                    .set_health(name, CapabilityHealth::Error, Some(e.to_string()))
                    .await;
            }
            Err(_) => {}
        }
    }
}

#[async_trait]
impl PipelineStep for PipelineStages {
    fn stages(&self) -> Vec<String> {
        vec![VISION.to_string(), SPEECH.to_string()]
    }

    async fn execute_once(&self, config: &PipelineConfig) -> bool {
        match self.try_execute_once(config).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Pipeline execution failed");
                false
            }
        }
    }
}
