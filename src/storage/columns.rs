//! Column-set resolution.
//!
//! The columns a writer fills are fixed when it is constructed: either the
//! configured list, or every column of the table except the primary key.

use std::collections::HashSet;
use std::sync::Arc;

use log::debug;

use crate::error_handling::WriterError;

use super::sink::RelationalSink;

/// Ordered, distinct, non-empty list of destination columns.
///
/// Cheap to clone; all batches share the same list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    columns: Arc<[String]>,
}

impl ColumnSpec {
    pub fn new(columns: Vec<String>) -> Result<Self, WriterError> {
        if columns.is_empty() {
            return Err(WriterError::Configuration(
                "column list is empty".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(WriterError::Configuration(format!(
                    "column '{}' is listed more than once",
                    column
                )));
            }
        }
        Ok(Self {
            columns: columns.into(),
        })
    }

    pub fn as_slice(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

/// Determines the columns to write into `table`.
///
/// Explicit `columns` are used as given, primary key included if listed.
/// Otherwise the sink is introspected and every column except the primary key
/// is used; `pk_column` names the key when introspection can't (or shouldn't)
/// decide it.
pub async fn resolve_columns(
    sink: &dyn RelationalSink,
    table: &str,
    columns: Option<&[String]>,
    pk_column: Option<&str>,
) -> Result<ColumnSpec, WriterError> {
    if let Some(columns) = columns {
        return ColumnSpec::new(columns.to_vec());
    }

    let info = sink.introspect_columns(table).await?;
    let resolved: Vec<String> = info
        .into_iter()
        .filter(|c| match pk_column {
            Some(pk) => c.name != pk,
            None => !c.is_primary_key,
        })
        .map(|c| c.name)
        .collect();

    debug!("Resolved columns for {}: {:?}", table, resolved);

    ColumnSpec::new(resolved).map_err(|_| {
        WriterError::Configuration(format!(
            "table '{}' has no columns besides its primary key",
            table
        ))
    })
}
