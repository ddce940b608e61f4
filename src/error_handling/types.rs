//! Error type definitions.
//!
//! This module defines all error types used throughout the writer.

use log::SetLoggerError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),
}

/// Error types for sink operations (bulk insert, single insert, introspection).
#[derive(Error, Debug)]
pub enum SinkError {
    /// Timed out waiting for a pooled connection.
    #[error("Timed out waiting for a database connection")]
    PoolTimeout,

    /// SQL execution error.
    #[error("SQL error: {0}")]
    Database(#[source] sqlx::Error),

    /// Introspection found no such table.
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// The sink refused the write for a reason of its own.
    #[error("Write rejected: {0}")]
    Rejected(String),
}

impl From<sqlx::Error> for SinkError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut => SinkError::PoolTimeout,
            other => SinkError::Database(other),
        }
    }
}

impl SinkError {
    /// Returns the category of this error, used for logging and retry decisions.
    pub fn kind(&self) -> SinkErrorKind {
        match self {
            SinkError::PoolTimeout => SinkErrorKind::PoolTimeout,
            SinkError::Database(sqlx::Error::Database(db)) => {
                // SQLITE_BUSY (5) and SQLITE_LOCKED (6), including extended codes
                let busy = db
                    .code()
                    .and_then(|c| c.parse::<i64>().ok())
                    .map(|c| matches!(c & 0xff, 5 | 6))
                    .unwrap_or(false);
                if busy {
                    SinkErrorKind::Busy
                } else if db.is_unique_violation()
                    || db.is_foreign_key_violation()
                    || db.is_check_violation()
                {
                    SinkErrorKind::Constraint
                } else {
                    SinkErrorKind::Statement
                }
            }
            SinkError::Database(sqlx::Error::PoolClosed)
            | SinkError::Database(sqlx::Error::Io(_)) => SinkErrorKind::Connection,
            SinkError::Database(_) => SinkErrorKind::Statement,
            SinkError::TableNotFound(_) => SinkErrorKind::Schema,
            SinkError::Rejected(_) => SinkErrorKind::Statement,
        }
    }

    /// Whether the same write may succeed if attempted again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind(),
            SinkErrorKind::PoolTimeout | SinkErrorKind::Busy | SinkErrorKind::Connection
        )
    }
}

/// Categories of sink failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum SinkErrorKind {
    PoolTimeout,
    Busy,
    Connection,
    Constraint,
    Statement,
    Schema,
}

impl std::fmt::Display for SinkErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SinkErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SinkErrorKind::PoolTimeout => "connection pool timeout",
            SinkErrorKind::Busy => "database busy",
            SinkErrorKind::Connection => "connection error",
            SinkErrorKind::Constraint => "constraint violation",
            SinkErrorKind::Statement => "statement error",
            SinkErrorKind::Schema => "schema error",
        }
    }
}

/// Errors surfaced by the batch writer to its caller.
#[derive(Error, Debug)]
pub enum WriterError {
    /// Invalid or missing settings; the writer was not constructed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A field held several values and at least one was not a string.
    #[error("Field '{field}' has multiple values that are not all strings: {values}")]
    UnsupportedMultiValue { field: String, values: String },

    /// A bulk or single insert failed.
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// The writer was used after `close()`.
    #[error("Writer is closed")]
    ClosedWriter,

    /// A worker task panicked while sending a batch.
    #[error("Worker panicked while sending batch: {0}")]
    WorkerPanicked(String),

    /// Callbacks can only be registered before the first batch is submitted.
    #[error("Callbacks cannot be registered after batches have been submitted")]
    CallbackRegistrationClosed,

    /// Input could not be turned into a record.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

impl WriterError {
    /// The underlying sink error, if this failure came from the sink.
    pub fn as_sink_error(&self) -> Option<&SinkError> {
        match self {
            WriterError::Sink(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_pool_timeout_maps_to_dedicated_variant() {
        let err = SinkError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, SinkError::PoolTimeout));
        assert!(err.is_transient());
    }

    #[test]
    fn test_row_not_found_is_not_transient() {
        let err = SinkError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.kind(), SinkErrorKind::Statement);
        assert!(!err.is_transient());
    }

    #[test]
    fn test_pool_closed_is_connection_error() {
        let err = SinkError::from(sqlx::Error::PoolClosed);
        assert_eq!(err.kind(), SinkErrorKind::Connection);
        assert!(err.is_transient());
    }

    #[test]
    fn test_rejected_and_missing_table_are_permanent() {
        assert!(!SinkError::Rejected("bad row".into()).is_transient());
        assert!(!SinkError::TableNotFound("t".into()).is_transient());
        assert_eq!(
            SinkError::TableNotFound("t".into()).kind(),
            SinkErrorKind::Schema
        );
    }

    #[test]
    fn test_all_kinds_have_string_representation() {
        for kind in SinkErrorKind::iter() {
            assert!(!kind.as_str().is_empty(), "{:?} should have a label", kind);
        }
    }

    #[test]
    fn test_writer_error_messages() {
        let err = WriterError::UnsupportedMultiValue {
            field: "int_a".into(),
            values: "[1, 2]".into(),
        };
        assert_eq!(
            err.to_string(),
            "Field 'int_a' has multiple values that are not all strings: [1, 2]"
        );
        assert_eq!(WriterError::ClosedWriter.to_string(), "Writer is closed");

        let sink: WriterError = SinkError::Rejected("duplicate".into()).into();
        assert_eq!(sink.to_string(), "Write rejected: duplicate");
        assert!(sink.as_sink_error().is_some());
        assert!(WriterError::ClosedWriter.as_sink_error().is_none());
    }
}
