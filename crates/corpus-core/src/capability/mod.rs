//! Capability tracking - the static set of downstream services and their health.
//!
//! ```text
//! config ──► CapabilityRegistry ◄── HealthProber (GET /status, concurrent)
//!                   ▲
//!                   └── stage functions (read; write only with track_calls)
//! ```

mod prober;
mod registry;

pub use prober::{HealthProber, ProbeSummary};
pub use registry::CapabilityRegistry;
