//! State shared between the writer and its batch jobs.

use std::sync::Arc;

use crate::storage::{ColumnSpec, RelationalSink};

use super::callbacks::CallbackRegistry;
use super::stats::{AtomicWriterStats, WriterStats};

/// Read-only settings and shared services used by every batch.
pub(crate) struct Shared {
    pub table: String,
    pub columns: ColumnSpec,
    pub sink: Arc<dyn RelationalSink>,
    pub delimiter: String,
    pub id_field: String,
    pub transient_retries: usize,
    pub callbacks: CallbackRegistry,
    pub stats: AtomicWriterStats,
}

/// A cheap, cloneable view of a writer, passed to callbacks.
#[derive(Clone)]
pub struct WriterHandle {
    pub(crate) shared: Arc<Shared>,
}

impl WriterHandle {
    pub(crate) fn new(shared: Shared) -> Self {
        Self {
            shared: Arc::new(shared),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.shared.table
    }

    pub fn columns(&self) -> &ColumnSpec {
        &self.shared.columns
    }

    pub fn sink(&self) -> &Arc<dyn RelationalSink> {
        &self.shared.sink
    }

    pub fn stats(&self) -> WriterStats {
        self.shared.stats.snapshot()
    }
}
