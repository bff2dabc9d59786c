//! Recast Common Utilities
//!
//! Shared infrastructure for all Recast crates:
//! - Error types, failure classification, and result aliases
//! - Recording and pause-aware clocks for stream timestamps
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
