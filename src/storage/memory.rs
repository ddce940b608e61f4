//! In-memory [`RelationalSink`] for tests and dry runs.
//!
//! Stores rows in a `Vec` and can be told to fail in the ways a real database
//! does: every bulk insert failing, particular rows violating a constraint,
//! or the first few writes hitting a pool timeout.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error_handling::SinkError;
use crate::record::Scalar;

use super::sink::{ColumnInfo, RelationalSink, Row};

/// A table row keyed by column name.
pub type StoredRow = HashMap<String, Scalar>;

/// An in-memory single-table sink.
pub struct MemorySink {
    table: String,
    columns: Vec<ColumnInfo>,
    rows: Mutex<Vec<StoredRow>>,
    bulk_sizes: Mutex<Vec<usize>>,
    reject: Option<(String, Scalar)>,
    fail_bulk: AtomicBool,
    transient_failures: AtomicUsize,
    delay: Option<Duration>,
    bulk_calls: AtomicUsize,
    insert_calls: AtomicUsize,
    disconnects: AtomicUsize,
}

impl MemorySink {
    /// Creates a sink holding table `table` with the given columns.
    pub fn new(table: &str, columns: &[&str], primary_key: Option<&str>) -> Self {
        Self {
            table: table.to_string(),
            columns: columns
                .iter()
                .map(|c| ColumnInfo::new(*c, Some(*c) == primary_key))
                .collect(),
            rows: Mutex::new(Vec::new()),
            bulk_sizes: Mutex::new(Vec::new()),
            reject: None,
            fail_bulk: AtomicBool::new(false),
            transient_failures: AtomicUsize::new(0),
            delay: None,
            bulk_calls: AtomicUsize::new(0),
            insert_calls: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
        }
    }

    /// Every bulk insert fails; single-row inserts still work.
    pub fn fail_bulk_inserts(self) -> Self {
        self.fail_bulk.store(true, Ordering::SeqCst);
        self
    }

    /// Rows whose `column` equals `value` violate a constraint.
    pub fn reject_rows_where(mut self, column: &str, value: impl Into<Scalar>) -> Self {
        self.reject = Some((column.to_string(), value.into()));
        self
    }

    /// The next `count` writes (bulk or single) fail with a pool timeout.
    pub fn fail_transiently(self, count: usize) -> Self {
        self.transient_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Every write sleeps for `delay` first.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn rows(&self) -> Vec<StoredRow> {
        self.rows.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().map(|r| r.len()).unwrap_or_default()
    }

    /// Sizes of the bulk inserts that succeeded, in completion order.
    pub fn bulk_sizes(&self) -> Vec<usize> {
        self.bulk_sizes.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn bulk_calls(&self) -> usize {
        self.bulk_calls.load(Ordering::SeqCst)
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    async fn before_write(&self, table: &str) -> Result<(), SinkError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if table != self.table {
            return Err(SinkError::TableNotFound(table.to_string()));
        }
        let took_failure = self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if took_failure {
            return Err(SinkError::PoolTimeout);
        }
        Ok(())
    }

    fn to_stored(&self, columns: &[String], row: &[Scalar]) -> Result<StoredRow, SinkError> {
        if columns.len() != row.len() {
            return Err(SinkError::Rejected(format!(
                "{} values for {} columns",
                row.len(),
                columns.len()
            )));
        }
        let mut stored = StoredRow::new();
        for (column, value) in columns.iter().zip(row) {
            if !self.columns.iter().any(|c| &c.name == column) {
                return Err(SinkError::Rejected(format!("no such column: {}", column)));
            }
            if let Some((reject_column, reject_value)) = &self.reject {
                if reject_column == column && reject_value == value {
                    return Err(SinkError::Rejected(format!(
                        "constraint failed: {} = {}",
                        column, value
                    )));
                }
            }
            stored.insert(column.clone(), value.clone());
        }
        Ok(stored)
    }

    fn append(&self, rows: Vec<StoredRow>) -> Result<(), SinkError> {
        let mut table = self
            .rows
            .lock()
            .map_err(|_| SinkError::Rejected("table lock poisoned".to_string()))?;
        table.extend(rows);
        Ok(())
    }
}

#[async_trait]
impl RelationalSink for MemorySink {
    async fn bulk_insert(
        &self,
        table: &str,
        columns: &[String],
        rows: &[Row],
    ) -> Result<(), SinkError> {
        self.bulk_calls.fetch_add(1, Ordering::SeqCst);
        self.before_write(table).await?;
        if self.fail_bulk.load(Ordering::SeqCst) {
            return Err(SinkError::Rejected("bulk insert disabled".to_string()));
        }

        let stored = rows
            .iter()
            .map(|row| self.to_stored(columns, row))
            .collect::<Result<Vec<_>, _>>()?;
        let count = stored.len();
        self.append(stored)?;
        if let Ok(mut sizes) = self.bulk_sizes.lock() {
            sizes.push(count);
        }
        Ok(())
    }

    async fn insert(&self, table: &str, columns: &[String], row: &[Scalar]) -> Result<(), SinkError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        self.before_write(table).await?;
        let stored = self.to_stored(columns, row)?;
        self.append(vec![stored])
    }

    async fn introspect_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, SinkError> {
        if table != self.table {
            return Err(SinkError::TableNotFound(table.to_string()));
        }
        Ok(self.columns.clone())
    }

    async fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols() -> Vec<String> {
        vec!["id".to_string(), "title".to_string()]
    }

    #[tokio::test]
    async fn test_bulk_insert_is_all_or_nothing() {
        let sink = MemorySink::new("t", &["id", "title"], Some("id")).reject_rows_where("id", 2i64);
        let rows = vec![
            vec![Scalar::Integer(1), Scalar::from("a")],
            vec![Scalar::Integer(2), Scalar::from("b")],
        ];
        assert!(sink.bulk_insert("t", &cols(), &rows).await.is_err());
        assert_eq!(sink.row_count(), 0);

        sink.insert("t", &cols(), &rows[0]).await.unwrap();
        assert!(sink.insert("t", &cols(), &rows[1]).await.is_err());
        assert_eq!(sink.row_count(), 1);
    }

    #[tokio::test]
    async fn test_transient_failures_are_consumed() {
        let sink = MemorySink::new("t", &["id", "title"], None).fail_transiently(1);
        let row = vec![Scalar::Integer(1), Scalar::from("a")];
        let err = sink.insert("t", &cols(), &row).await.unwrap_err();
        assert!(err.is_transient());
        sink.insert("t", &cols(), &row).await.unwrap();
        assert_eq!(sink.insert_calls(), 2);
        assert_eq!(sink.row_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_column_is_rejected() {
        let sink = MemorySink::new("t", &["id"], None);
        let err = sink
            .insert("t", &["nope".to_string()], &[Scalar::Null])
            .await
            .unwrap_err();
        assert!(matches!(err, SinkError::Rejected(_)));
    }
}
