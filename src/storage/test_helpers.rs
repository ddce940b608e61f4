//! Shared test helpers for storage and writer tests.
//!
//! This module provides common utilities for database setup used across
//! module tests.

#[cfg(test)]
use sqlx::sqlite::SqlitePoolOptions;
#[cfg(test)]
use sqlx::SqlitePool;

#[cfg(test)]
pub use super::memory::MemorySink;

/// Schema of the `test` table used throughout the tests.
#[cfg(test)]
pub const TEST_TABLE_SQL: &str = "CREATE TABLE test (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at TEXT,
    string_a TEXT,
    string_b TEXT,
    string_c TEXT,
    boolean_a BOOLEAN,
    int_a INTEGER
)";

/// Creates an in-memory test database with the `test` table.
/// Pinned to one connection: each SQLite memory connection is its own database.
#[cfg(test)]
pub async fn create_test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test database pool");
    sqlx::query(TEST_TABLE_SQL)
        .execute(&pool)
        .await
        .expect("Failed to create test table");
    pool
}

/// Counts the rows of `table`.
#[cfg(test)]
pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .expect("Failed to count rows")
}
