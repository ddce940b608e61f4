//! Configuration constants.
//!
//! This module defines the defaults used when a setting is not supplied,
//! plus the operational limits of the SQLite sink.

use std::time::Duration;

// Writer defaults
/// Records per batch before a flush is triggered
pub const DEFAULT_BATCH_SIZE: usize = 100;
/// Worker tasks sending batches. 0 sends inline in the caller's task.
/// Default of 1 overlaps database I/O with record production.
pub const DEFAULT_THREAD_POOL_SIZE: usize = 1;
/// Separator used when joining multi-valued string fields
pub const DEFAULT_INTERNAL_DELIMITER: &str = ",";
/// Field looked up on the first record of a failed batch to identify it in logs
pub const DEFAULT_ID_FIELD: &str = "id";
/// Close waits longer than this are logged as a warning (undersized pool or slow sink)
pub const SHUTDOWN_WARN_THRESHOLD: Duration = Duration::from_secs(60);
/// Pending jobs allowed per worker before `submit` waits for queue space
pub const QUEUE_SIZE_MULTIPLIER: usize = 3;

// Retry strategy (single-row inserts failing with a transient error)
/// Extra attempts for a single-row insert that failed with a transient error
pub const DEFAULT_TRANSIENT_RETRIES: usize = 2;
/// Base delay in milliseconds for the exponential backoff
pub const RETRY_INITIAL_DELAY_MS: u64 = 10;
/// Factor by which retry delay is multiplied on each attempt
pub const RETRY_FACTOR: u64 = 2;
/// Maximum delay between retries in milliseconds
pub const RETRY_MAX_DELAY_MS: u64 = 1000;

// SQLite sink
/// Connections kept by a sink that owns its pool
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
/// How long a write waits for a pooled connection before failing with a pool timeout
pub const DB_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
/// SQLite's bound-parameter limit (SQLITE_MAX_VARIABLE_NUMBER since 3.32)
pub const SQLITE_MAX_VARIABLES: usize = 32_766;
