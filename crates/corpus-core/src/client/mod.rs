//! HTTP client for capability services.
//!
//! Every capability exposes `GET /status` for liveness plus an action
//! endpoint (`POST /speak`, `POST /analyze`). Each request carries its own
//! timeout; a timeout surfaces as the same transport error as a refused
//! connection.
//!
//! # Usage
//!
//! ```rust,no_run
//! use corpus_core::client::{CapabilityClient, SpeakRequest};
//! use corpus_core::config::TimeoutConfig;
//! use corpus_core::types::Capability;
//!
//! #[tokio::main]
//! async fn main() -> corpus_core::Result<()> {
//!     let client = CapabilityClient::new(&TimeoutConfig::default())?;
//!     let speech = Capability::new("speech", "http://localhost:5001");
//!     client.speak(&speech, &SpeakRequest::text("hello")).await?;
//!     Ok(())
//! }
//! ```

use crate::config::TimeoutConfig;
use crate::error::{Error, Result};
use crate::types::{Capability, VoiceConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// HTTP client shared by the prober and the stage functions
#[derive(Clone)]
pub struct CapabilityClient {
    /// HTTP client
    client: reqwest::Client,
    /// Timeout for `GET /status`
    probe_timeout: Duration,
    /// Timeout for action endpoints
    call_timeout: Duration,
}

impl CapabilityClient {
    /// Create a client with the given timeouts
    pub fn new(timeouts: &TimeoutConfig) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            client,
            probe_timeout: timeouts.probe(),
            call_timeout: timeouts.call(),
        })
    }

    /// Check liveness. Any non-success status is an error.
    pub async fn check_status(&self, capability: &Capability) -> Result<()> {
        self.send(
            reqwest::Method::GET,
            &capability.url("/status"),
            Option::<()>::None,
            self.probe_timeout,
        )
        .await?;
        Ok(())
    }

    /// Send text to a speech capability
    pub async fn speak(&self, capability: &Capability, request: &SpeakRequest) -> Result<()> {
        self.send(
            reqwest::Method::POST,
            &capability.url("/speak"),
            Some(request),
            self.call_timeout,
        )
        .await?;
        Ok(())
    }

    /// Ask a vision capability to describe what it currently sees.
    ///
    /// Only a missing `description` field is an error; an empty one is
    /// returned as is and left for the caller to judge.
    pub async fn analyze(&self, capability: &Capability) -> Result<String> {
        let resp = self
            .send(
                reqwest::Method::POST,
                &capability.url("/analyze"),
                Option::<()>::None,
                self.call_timeout,
            )
            .await?;

        let data: AnalyzeResponse = resp.json().await?;
        data.description.ok_or(Error::MissingDescription)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // HTTP Helpers
    // ─────────────────────────────────────────────────────────────────────────

    async fn send<B: Serialize>(
        &self,
        method: reqwest::Method,
        url: &str,
        body: Option<B>,
        timeout: Duration,
    ) -> Result<reqwest::Response> {
        debug!("Capability request: {} {}", method, url);

        let mut req = self.client.request(method, url).timeout(timeout);

        if let Some(ref b) = body {
            req = req.json(b);
        }

        let resp = req.send().await?;

        let status = resp.status();
        if status.is_success() {
            Ok(resp)
        } else {
            Err(Error::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            })
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request/Response Types
// ─────────────────────────────────────────────────────────────────────────────

/// Speak request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakRequest {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_config: Option<VoiceConfig>,
}

impl SpeakRequest {
    /// Plain text with no voice settings
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice_config: None,
        }
    }

    /// Attach voice settings
    pub fn with_voice(mut self, voice_config: VoiceConfig) -> Self {
        self.voice_config = Some(voice_config);
        self
    }
}

/// Vision analysis response
#[derive(Debug, Deserialize)]
pub struct AnalyzeResponse {
    pub description: Option<String>,
}
