//! Error types for corpus-core.

use thiserror::Error;

use crate::types::CapabilityHealth;

/// Result type alias using corpus-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for engine operations
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Capability not registered: {0}")]
    CapabilityNotRegistered(String),

    #[error("Capability already registered: {0}")]
    DuplicateCapability(String),

    #[error("Invalid configuration for {field}: {message}")]
    InvalidConfig { field: String, message: String },

    // Health gating
    #[error("Capability {name} is {health}")]
    CapabilityUnavailable {
        name: String,
        health: CapabilityHealth,
    },

    // Transport errors
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("Vision response carried no description")]
    MissingDescription,

    // Pipeline conflicts
    #[error("Pipeline already running: {0}")]
    PipelineAlreadyRunning(String),

    #[error("Pipeline not found: {0}")]
    PipelineNotFound(String),

    #[error("Pipeline not running: {0}")]
    PipelineNotRunning(String),

    // Fatal loop errors
    #[error("Pipeline state lock poisoned")]
    LockPoisoned,
}

impl Error {
    /// Create a configuration error for a named field
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Check if this error came from the network layer (timeout, refused, non-2xx)
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::UnexpectedStatus { .. } | Self::MissingDescription
        )
    }

    /// Check if this error is a pipeline lookup miss
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::PipelineNotFound(_))
    }
}
