//! table_writer: batching, asynchronous writes of semi-structured records into
//! a relational table.
//!
//! Records are queued by [`BatchWriter::put`], cut into batches and written by
//! a bounded pool of worker tasks with one bulk insert per batch. A failed bulk
//! insert falls back to single-row inserts so one bad record costs only
//! itself, and the failure is attributed to that record in the logs.
//!
//! # Example
//!
//! ```no_run
//! use table_writer::{BatchWriter, Record, WriterConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = WriterConfig::new()
//!     .connection_string("sqlite:./books.db")
//!     .table_name("books")
//!     .batch_size(100)
//!     .thread_pool_size(2)
//!     .after_send_batch(|batch, handle| {
//!         println!("{} records sent, {} total", batch.len(), handle.stats().records_written);
//!     });
//!
//! let writer = BatchWriter::new(config).await?;
//! writer
//!     .put(Record::new().with("id", "b1").with("title", "The Dispossessed"))
//!     .await?;
//! writer.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime.

pub mod config;
pub mod error_handling;
pub mod initialization;
pub mod record;
pub mod storage;
pub mod writer;

pub use config::{LogFormat, LogLevel, Opt, WriterConfig};
pub use error_handling::{SinkError, SinkErrorKind, WriterError};
pub use record::{FieldValue, Record, Scalar};
pub use storage::{ColumnInfo, ColumnSpec, MemorySink, RelationalSink, SqliteSink};
pub use writer::{BatchWriter, WriterHandle, WriterState, WriterStats};
