//! camguide Common Utilities
//!
//! Shared infrastructure for all camguide crates:
//! - Error types and result aliases
//! - Wall-clock timestamps and their display formats
//! - Tracing/logging initialization
//! - Layered configuration loading (defaults, file, `.env`, environment)

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
