//! The batching writer.
//!
//! [`BatchWriter`] queues records, cuts them into batches of `batch_size` and
//! hands each batch to a [`BoundedWorkerPool`]. A worker writes the batch with
//! one bulk insert and falls back to single-row inserts when that fails, so a
//! bad record costs only itself. Worker failures are raised on the next
//! `put` or on `close`.
//!
//! ```no_run
//! use table_writer::{BatchWriter, Record, WriterConfig};
//!
//! # async fn run() -> Result<(), table_writer::WriterError> {
//! let config = WriterConfig::new()
//!     .connection_string("sqlite:./books.db")
//!     .table_name("books")
//!     .batch_size(500);
//! let writer = BatchWriter::new(config).await?;
//! writer
//!     .put(Record::new().with("id", "b1").with("authors", vec!["Le Guin", "Delany"]))
//!     .await?;
//! writer.close().await?;
//! # Ok(())
//! # }
//! ```

mod accumulator;
mod callbacks;
mod handle;
mod send;
mod stats;
mod worker_pool;

pub use accumulator::BatchAccumulator;
pub use callbacks::{CallbackRegistry, SendBatchCallback};
pub use handle::WriterHandle;
pub use stats::WriterStats;
pub use worker_pool::{BoundedWorkerPool, FirstError, Job};

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use strum_macros::Display;
use tokio::sync::RwLock;

use crate::config::WriterConfig;
use crate::error_handling::WriterError;
use crate::record::Record;
use crate::storage::{resolve_columns, RelationalSink, SqliteSink};

use handle::Shared;
use send::send_batch;
use stats::AtomicWriterStats;

/// Lifecycle of a writer. There is no way back to `Open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum WriterState {
    Open,
    Closing,
    Closed,
}

/// Asynchronous, batching writer for one table.
pub struct BatchWriter {
    handle: WriterHandle,
    accumulator: BatchAccumulator,
    pool: BoundedWorkerPool,
    state: RwLock<WriterState>,
    batch_size: usize,
    owns_sink: bool,
    shutdown_warn_threshold: Duration,
}

impl BatchWriter {
    /// Validates `config`, connects (or adopts the given sink) and resolves
    /// the column set.
    ///
    /// A sink opened here from `connection_string` is owned by the writer and
    /// disconnected by `close`. A sink passed as `connection` is left alone.
    ///
    /// # Errors
    ///
    /// `WriterError::Configuration` for invalid settings or an empty column
    /// set, `WriterError::Sink` if connecting or introspection fails.
    pub async fn new(config: WriterConfig) -> Result<Self, WriterError> {
        config.validate()?;

        let WriterConfig {
            connection,
            connection_string,
            table_name,
            columns,
            pk_column,
            thread_pool_size,
            batch_size,
            internal_delimiter,
            id_field,
            after_send_batch,
            shutdown_warn_threshold,
            transient_retries,
            max_connections,
        } = config;

        let table = table_name.unwrap_or_default();
        let (sink, owns_sink): (Arc<dyn RelationalSink>, bool) = match (connection, connection_string) {
            (Some(sink), _) => (sink, false),
            (None, Some(url)) => {
                let sink: Arc<dyn RelationalSink> =
                    Arc::new(SqliteSink::connect(&url, max_connections).await?);
                (sink, true)
            }
            (None, None) => {
                return Err(WriterError::Configuration(
                    "one of connection or connection_string is required".to_string(),
                ))
            }
        };

        let columns = match resolve_columns(
            sink.as_ref(),
            &table,
            columns.as_deref(),
            pk_column.as_deref(),
        )
        .await
        {
            Ok(columns) => columns,
            Err(e) => {
                if owns_sink {
                    sink.disconnect().await;
                }
                return Err(e);
            }
        };

        info!(
            "Writing to {} ({} columns, batch size {}, {} workers)",
            table,
            columns.len(),
            batch_size,
            thread_pool_size
        );

        let handle = WriterHandle::new(Shared {
            table,
            columns,
            sink,
            delimiter: internal_delimiter,
            id_field,
            transient_retries,
            callbacks: CallbackRegistry::new(after_send_batch),
            stats: AtomicWriterStats::default(),
        });

        Ok(Self {
            handle,
            accumulator: BatchAccumulator::new(),
            pool: BoundedWorkerPool::new(thread_pool_size),
            state: RwLock::new(WriterState::Open),
            batch_size,
            owns_sink,
            shutdown_warn_threshold,
        })
    }

    pub fn handle(&self) -> &WriterHandle {
        &self.handle
    }

    pub fn table_name(&self) -> &str {
        self.handle.table_name()
    }

    pub fn columns(&self) -> &[String] {
        self.handle.columns().as_slice()
    }

    pub fn stats(&self) -> WriterStats {
        self.handle.stats()
    }

    /// Records queued but not yet handed to a worker.
    pub fn pending_records(&self) -> usize {
        self.accumulator.len()
    }

    pub async fn state(&self) -> WriterState {
        *self.state.read().await
    }

    /// Registers a callback run after every batch.
    ///
    /// # Errors
    ///
    /// `WriterError::CallbackRegistrationClosed` once a batch has been
    /// submitted.
    pub fn after_send_batch<F>(&self, callback: F) -> Result<(), WriterError>
    where
        F: Fn(&[Record], &WriterHandle) + Send + Sync + 'static,
    {
        self.handle.shared.callbacks.register(Arc::new(callback))
    }

    /// Returns the first failure of a batch job since the last check.
    pub fn raise_if_failed(&self) -> Result<(), WriterError> {
        self.pool.raise_if_failed()
    }

    /// Queues `record`, submitting a batch once `batch_size` records are
    /// pending. May wait for room in the worker queue.
    ///
    /// # Errors
    ///
    /// `WriterError::ClosedWriter` after `close`, or the pending failure of an
    /// earlier batch. A record refused this way is not queued.
    pub async fn put(&self, record: Record) -> Result<(), WriterError> {
        let state = self.state.read().await;
        if *state != WriterState::Open {
            return Err(WriterError::ClosedWriter);
        }
        self.pool.raise_if_failed()?;

        self.accumulator.enqueue(record);
        if self.accumulator.len() >= self.batch_size {
            let batch = self.accumulator.drain_all();
            self.submit(batch).await?;
        }
        Ok(())
    }

    async fn submit(&self, batch: Vec<Record>) -> Result<(), WriterError> {
        if batch.is_empty() {
            return Ok(());
        }
        self.handle.shared.callbacks.freeze();
        debug!("Submitting batch of {} records for {}", batch.len(), self.table_name());
        self.pool
            .submit(Box::pin(send_batch(self.handle.clone(), batch)))
            .await
    }

    /// Flushes what is left, waits for every batch and releases an owned sink.
    ///
    /// Shutdown always runs to completion; if any batch failed, the earliest
    /// failure is returned afterwards.
    ///
    /// # Errors
    ///
    /// `WriterError::ClosedWriter` if already closed, otherwise the first
    /// batch failure.
    pub async fn close(&self) -> Result<(), WriterError> {
        let mut state = self.state.write().await;
        if *state != WriterState::Open {
            return Err(WriterError::ClosedWriter);
        }
        *state = WriterState::Closing;

        let pending = self.pool.raise_if_failed().err();

        let tail = self.accumulator.drain_all();
        debug!("Flushing final {} records for {}", tail.len(), self.table_name());
        let submitted = self.submit(tail).await.err();

        let elapsed = self.pool.shutdown_and_wait().await;
        if elapsed > self.shutdown_warn_threshold {
            warn!(
                "Waited {:.1} seconds for all workers, you may want to increase thread_pool_size (currently {})",
                elapsed.as_secs_f64(),
                self.pool.size()
            );
        }
        let late = self.pool.raise_if_failed().err();

        if self.owns_sink {
            self.handle.sink().disconnect().await;
        }
        *state = WriterState::Closed;

        let stats = self.stats();
        info!(
            "Closed writer for {}: {} records written, {} failed, {} batches",
            self.table_name(),
            stats.records_written,
            stats.records_failed,
            stats.batches_sent
        );

        match pending.or(submitted).or(late) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for BatchWriter {
    fn drop(&mut self) {
        if *self.state.get_mut() == WriterState::Open && !self.accumulator.is_empty() {
            warn!(
                "Writer for {} dropped without close(); {} queued records were not sent",
                self.handle.table_name(),
                self.accumulator.len()
            );
        }
    }
}
