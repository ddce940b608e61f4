// storage/mod.rs
// Destination table access

pub mod columns;
pub mod memory;
pub mod pool;
pub mod sink;
pub mod sqlite;
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used items
pub use columns::{resolve_columns, ColumnSpec};
pub use memory::MemorySink;
pub use pool::{init_db_pool, init_db_pool_with_path};
pub use sink::{ColumnInfo, RelationalSink, Row};
pub use sqlite::SqliteSink;
