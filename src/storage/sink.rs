//! The destination the writer persists rows into.
//!
//! The writer never talks to a database directly; it only needs a bulk insert,
//! a single-row insert for isolating bad records, column introspection for
//! picking default columns, and a way to release connections it owns.

use async_trait::async_trait;

use crate::error_handling::SinkError;
use crate::record::Scalar;

/// One table row, values in `ColumnSpec` order.
pub type Row = Vec<Scalar>;

/// A column reported by [`RelationalSink::introspect_columns`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub is_primary_key: bool,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, is_primary_key: bool) -> Self {
        Self {
            name: name.into(),
            is_primary_key,
        }
    }
}

/// A relational table writer.
///
/// Implementations must be safe to call from several worker tasks at once.
#[async_trait]
pub trait RelationalSink: Send + Sync {
    /// Inserts all `rows` or none of them.
    ///
    /// After a failed bulk insert the writer re-inserts every row
    /// individually, so a failure must leave no rows behind.
    async fn bulk_insert(&self, table: &str, columns: &[String], rows: &[Row])
        -> Result<(), SinkError>;

    /// Inserts a single row.
    async fn insert(&self, table: &str, columns: &[String], row: &[Scalar])
        -> Result<(), SinkError>;

    /// Lists the table's columns in table order.
    async fn introspect_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, SinkError>;

    /// Releases connections. Only called by a writer that owns the sink.
    async fn disconnect(&self);
}
