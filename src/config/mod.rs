//! Writer configuration and constants.
//!
//! This module provides:
//! - Default values and operational limits
//! - The immutable `WriterConfig` snapshot
//! - CLI option types and parsing

mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub use types::{LogFormat, LogLevel, Opt, WriterConfig};
