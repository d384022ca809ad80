//! Service layer for corpus-server
//!
//! Background work the server runs around the engine.

pub mod probing;

pub use probing::ProbeService;
