//! Pipelines - vision→speech chains run once or on an interval.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      PipelineManager                         │
//! │   id ──► { record, CancellationToken, JoinHandle }           │
//! │                         │ spawns                             │
//! │                         ▼                                    │
//! │   loop { check token → count → step.execute_once → sleep }   │
//! └─────────────────────────┬────────────────────────────────────┘
//!                           │ PipelineStep
//!              ┌────────────▼─────────────┐
//!              │      PipelineStages      │
//!              │ vision → enrich → speech │
//!              └──────────────────────────┘
//! ```

mod manager;
mod stages;

pub use manager::PipelineManager;
pub use stages::{enrich, PipelineStages, PipelineStep, SPEECH, VISION};
