//! Error handling.
//!
//! This module provides:
//! - Error type definitions for configuration, coercion and sink failures
//! - Sink error categorization (transient vs permanent)
//! - Retry strategy configuration for transient failures

mod categorization;
mod types;

// Re-export public API
pub use categorization::get_retry_strategy;
pub use types::{InitializationError, SinkError, SinkErrorKind, WriterError};
