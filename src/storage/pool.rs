//! Database connection pool management.
//!
//! This module initializes and configures the SQLite connection pool with:
//! - WAL mode enabled for concurrent access
//! - Connection limits and acquire timeouts
//! - Automatic database file creation

use std::path::Path;
use std::str::FromStr;

use log::{error, info};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::config::DB_ACQUIRE_TIMEOUT;
use crate::error_handling::SinkError;

/// Initializes a connection pool from a SQLite connection string.
///
/// Creates the database file if it doesn't exist and enables WAL mode for
/// better concurrent access. In-memory databases are private to a single
/// connection, so their pool is capped at one connection.
///
/// # Errors
///
/// Returns `SinkError::Database` if the connection string is invalid or the
/// database cannot be opened.
pub async fn init_db_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SinkError> {
    let options = SqliteConnectOptions::from_str(url)
        .map_err(|e| {
            error!("Invalid SQLite connection string '{}': {e}", url);
            SinkError::from(e)
        })?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(DB_ACQUIRE_TIMEOUT);

    let in_memory = url.contains(":memory:") || url.contains("mode=memory");
    let max_connections = if in_memory {
        1
    } else {
        max_connections.max(1)
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(DB_ACQUIRE_TIMEOUT)
        .connect_with(options)
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {e}");
            SinkError::from(e)
        })?;

    info!(
        "Connected to {} (max {} connection{})",
        url,
        max_connections,
        if max_connections == 1 { "" } else { "s" }
    );
    Ok(pool)
}

/// Initializes a connection pool for a database file path.
pub async fn init_db_pool_with_path(
    db_path: &Path,
    max_connections: u32,
) -> Result<SqlitePool, SinkError> {
    init_db_pool(
        &format!("sqlite:{}", db_path.to_string_lossy()),
        max_connections,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_db_pool_creates_file() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("created.db");
        assert!(!path.exists());

        let pool = init_db_pool_with_path(&path, 2).await.expect("pool");
        sqlx::query("CREATE TABLE t (id INTEGER)")
            .execute(&pool)
            .await
            .expect("create table");
        pool.close().await;

        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_in_memory_pool_is_single_connection() {
        let pool = init_db_pool("sqlite::memory:", 8).await.expect("pool");
        assert_eq!(pool.options().get_max_connections(), 1);
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected() {
        assert!(init_db_pool("postgres://localhost/db", 1).await.is_err());
    }
}
