//! Clipcast Common Utilities
//!
//! Shared infrastructure for all Clipcast crates:
//! - Error taxonomy and result aliases
//! - Recording clock
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
