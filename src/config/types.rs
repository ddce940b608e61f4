//! Configuration types and CLI options.
//!
//! This module defines the writer configuration snapshot and the structs used
//! for command-line argument parsing.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::config::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_ID_FIELD, DEFAULT_INTERNAL_DELIMITER, DEFAULT_MAX_CONNECTIONS,
    DEFAULT_THREAD_POOL_SIZE, DEFAULT_TRANSIENT_RETRIES, SHUTDOWN_WARN_THRESHOLD,
};
use crate::error_handling::WriterError;
use crate::record::Record;
use crate::storage::RelationalSink;
use crate::writer::{SendBatchCallback, WriterHandle};

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// Controls how log messages are formatted:
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Immutable settings for a [`BatchWriter`](crate::BatchWriter).
///
/// The writer takes this snapshot at construction and never mutates it, so
/// concurrently running batches read it without locking.
///
/// Exactly one of `connection` (a borrowed sink, never disconnected by the
/// writer) or `connection_string` (the writer opens and owns a SQLite sink)
/// must be set, together with `table_name`.
///
/// # Examples
///
/// ```no_run
/// use table_writer::WriterConfig;
///
/// let config = WriterConfig::new()
///     .connection_string("sqlite:./records.db")
///     .table_name("records")
///     .batch_size(500)
///     .thread_pool_size(2);
/// ```
#[derive(Clone)]
pub struct WriterConfig {
    /// Externally owned sink
    pub connection: Option<Arc<dyn RelationalSink>>,

    /// SQLite connection string for a sink the writer owns
    pub connection_string: Option<String>,

    /// Destination table (required)
    pub table_name: Option<String>,

    /// Explicit column list; introspected from the table when absent
    pub columns: Option<Vec<String>>,

    /// Primary key column to exclude from introspected columns
    pub pk_column: Option<String>,

    /// Number of worker tasks; 0 sends batches inline
    pub thread_pool_size: usize,

    /// Records per batch
    pub batch_size: usize,

    /// Separator for joining multi-valued string fields
    pub internal_delimiter: String,

    /// Field used to identify a batch in warnings
    pub id_field: String,

    /// Callbacks invoked after each batch, in order
    pub after_send_batch: Vec<SendBatchCallback>,

    /// Close waits longer than this are logged as warnings
    pub shutdown_warn_threshold: Duration,

    /// Extra attempts for single-row inserts failing with a transient error
    pub transient_retries: usize,

    /// Pool size for an owned SQLite sink
    pub max_connections: u32,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            connection: None,
            connection_string: None,
            table_name: None,
            columns: None,
            pk_column: None,
            thread_pool_size: DEFAULT_THREAD_POOL_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            internal_delimiter: DEFAULT_INTERNAL_DELIMITER.to_string(),
            id_field: DEFAULT_ID_FIELD.to_string(),
            after_send_batch: Vec::new(),
            shutdown_warn_threshold: SHUTDOWN_WARN_THRESHOLD,
            transient_retries: DEFAULT_TRANSIENT_RETRIES,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl fmt::Debug for WriterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterConfig")
            .field("connection", &self.connection.as_ref().map(|_| "<sink>"))
            .field("connection_string", &self.connection_string)
            .field("table_name", &self.table_name)
            .field("columns", &self.columns)
            .field("pk_column", &self.pk_column)
            .field("thread_pool_size", &self.thread_pool_size)
            .field("batch_size", &self.batch_size)
            .field("internal_delimiter", &self.internal_delimiter)
            .field("id_field", &self.id_field)
            .field("after_send_batch", &self.after_send_batch.len())
            .field("shutdown_warn_threshold", &self.shutdown_warn_threshold)
            .field("transient_retries", &self.transient_retries)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl WriterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an externally owned sink.
    pub fn connection(mut self, sink: Arc<dyn RelationalSink>) -> Self {
        self.connection = Some(sink);
        self
    }

    /// Open (and own) a SQLite sink from a connection string.
    pub fn connection_string(mut self, url: impl Into<String>) -> Self {
        self.connection_string = Some(url.into());
        self
    }

    pub fn table_name(mut self, table: impl Into<String>) -> Self {
        self.table_name = Some(table.into());
        self
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn pk_column(mut self, column: impl Into<String>) -> Self {
        self.pk_column = Some(column.into());
        self
    }

    pub fn thread_pool_size(mut self, size: usize) -> Self {
        self.thread_pool_size = size;
        self
    }

    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn internal_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.internal_delimiter = delimiter.into();
        self
    }

    pub fn id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    /// Append a callback run after every batch.
    pub fn after_send_batch<F>(mut self, callback: F) -> Self
    where
        F: Fn(&[Record], &WriterHandle) + Send + Sync + 'static,
    {
        self.after_send_batch.push(Arc::new(callback));
        self
    }

    pub fn shutdown_warn_threshold(mut self, threshold: Duration) -> Self {
        self.shutdown_warn_threshold = threshold;
        self
    }

    pub fn transient_retries(mut self, retries: usize) -> Self {
        self.transient_retries = retries;
        self
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Checks the settings that can be verified without any I/O.
    ///
    /// # Errors
    ///
    /// Returns `WriterError::Configuration` unless exactly one of `connection`
    /// and `connection_string` is set, `table_name` is non-empty and
    /// `batch_size` is at least 1.
    pub fn validate(&self) -> Result<(), WriterError> {
        match (&self.connection, &self.connection_string) {
            (Some(_), Some(_)) => {
                return Err(WriterError::Configuration(
                    "connection and connection_string are mutually exclusive".to_string(),
                ))
            }
            (None, None) => {
                return Err(WriterError::Configuration(
                    "one of connection or connection_string is required".to_string(),
                ))
            }
            _ => {}
        }

        match self.table_name.as_deref() {
            Some(t) if !t.trim().is_empty() => {}
            _ => {
                return Err(WriterError::Configuration(
                    "table_name is required".to_string(),
                ))
            }
        }

        if self.batch_size == 0 {
            return Err(WriterError::Configuration(
                "batch_size must be at least 1".to_string(),
            ));
        }

        if let Some(columns) = &self.columns {
            if columns.is_empty() {
                return Err(WriterError::Configuration(
                    "columns must not be empty when given".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Command-line options for the `table_writer` binary.
#[derive(Debug, Parser)]
#[command(
    name = "table_writer",
    about = "Writes JSON-lines records into a SQLite table in batches."
)]
pub struct Opt {
    /// JSON-lines file to read records from ("-" reads stdin)
    pub file: PathBuf,

    /// SQLite database file
    #[arg(long, default_value = "./table_writer.db")]
    pub db_path: PathBuf,

    /// Destination table
    #[arg(long)]
    pub table: String,

    /// Comma-separated column list (defaults to every non-primary-key column)
    #[arg(long, value_delimiter = ',')]
    pub columns: Option<Vec<String>>,

    /// Primary key column to exclude when columns are introspected
    #[arg(long)]
    pub pk_column: Option<String>,

    /// Records per batch
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Worker tasks sending batches (0 sends inline)
    #[arg(long, default_value_t = DEFAULT_THREAD_POOL_SIZE)]
    pub thread_pool_size: usize,

    /// Separator used to join multi-valued string fields
    #[arg(long, default_value = DEFAULT_INTERNAL_DELIMITER)]
    pub internal_delimiter: String,

    /// Field identifying a record in warnings
    #[arg(long, default_value = DEFAULT_ID_FIELD)]
    pub id_field: String,

    /// Log level
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,
}

impl Opt {
    /// Builds the writer configuration for these options.
    pub fn writer_config(&self) -> WriterConfig {
        let mut config = WriterConfig::new()
            .connection_string(format!("sqlite:{}", self.db_path.to_string_lossy()))
            .table_name(self.table.clone())
            .batch_size(self.batch_size)
            .thread_pool_size(self.thread_pool_size)
            .internal_delimiter(self.internal_delimiter.clone())
            .id_field(self.id_field.clone());
        if let Some(columns) = &self.columns {
            config = config.columns(columns.iter().cloned());
        }
        if let Some(pk) = &self.pk_column {
            config = config.pk_column(pk.clone());
        }
        config
    }
}
