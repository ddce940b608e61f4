// Shared helpers for integration tests: temporary SQLite databases.

use std::path::{Path, PathBuf};

use sqlx::SqlitePool;
use tempfile::TempDir;

use table_writer::storage::init_db_pool_with_path;

/// Schema used by most integration tests.
#[allow(dead_code)]
pub const TEST_TABLE_SQL: &str = "CREATE TABLE test (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at TEXT,
    string_a TEXT,
    string_b TEXT,
    string_c TEXT,
    boolean_a BOOLEAN,
    int_a INTEGER
)";

/// Creates a database file in `dir`, runs `schema` and returns its path and
/// an open pool for inspecting results.
pub async fn create_test_db(dir: &TempDir, schema: &str) -> (PathBuf, SqlitePool) {
    let path = dir.path().join("test.db");
    let pool = init_db_pool_with_path(&path, 2)
        .await
        .expect("Failed to create test database");
    sqlx::query(schema)
        .execute(&pool)
        .await
        .expect("Failed to create test table");
    (path, pool)
}

/// `sqlite:` connection string for a database file.
pub fn connection_string(path: &Path) -> String {
    format!("sqlite:{}", path.display())
}

#[allow(dead_code)] // Not every test file counts rows
pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .expect("Failed to count rows")
}
