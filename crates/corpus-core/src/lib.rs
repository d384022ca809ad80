//! corpus-core - Pipeline engine for Corpus
//!
//! This crate coordinates independently running capability services behind a
//! single control point:
//!
//! - **capability**: registry of capability endpoints and concurrent health probing
//! - **client**: HTTP transport to capability services
//! - **pipeline**: vision→speech stage functions and continuous pipeline lifecycle
//! - **command**: free-text command parsing
//! - **status**: system status snapshot
//! - **engine**: the engine object wiring all of the above

pub mod capability;
pub mod client;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod status;
pub mod types;

// Re-export commonly used types
pub use config::EngineConfig;
pub use engine::{Engine, PipelineStatus};
pub use error::{Error, Result};
