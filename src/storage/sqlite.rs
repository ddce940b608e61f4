//! SQLite implementation of [`RelationalSink`].

use async_trait::async_trait;
use sqlx::query_builder::Separated;
use sqlx::{QueryBuilder, Row as _, Sqlite, SqlitePool};

use crate::config::SQLITE_MAX_VARIABLES;
use crate::error_handling::SinkError;
use crate::record::Scalar;

use super::pool::init_db_pool;
use super::sink::{ColumnInfo, RelationalSink, Row};

/// Writes rows into SQLite tables through a `sqlx` pool.
#[derive(Clone)]
pub struct SqliteSink {
    pool: SqlitePool,
}

impl SqliteSink {
    /// Wraps an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens a pool for `url` (e.g. `sqlite:./records.db`).
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, SinkError> {
        Ok(Self::new(init_db_pool(url, max_connections).await?))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Quotes an identifier for SQLite, doubling embedded quotes.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn insert_prefix<'args>(table: &str, columns: &[String]) -> QueryBuilder<'args, Sqlite> {
    let column_list = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    QueryBuilder::new(format!(
        "INSERT INTO {} ({}) ",
        quote_ident(table),
        column_list
    ))
}

fn bind_scalar(b: &mut Separated<'_, '_, Sqlite, &'static str>, value: &Scalar) {
    match value {
        Scalar::Null => b.push_bind(None::<String>),
        Scalar::Bool(v) => b.push_bind(*v),
        Scalar::Integer(v) => b.push_bind(*v),
        Scalar::Float(v) => b.push_bind(*v),
        Scalar::Text(v) => b.push_bind(v.clone()),
    };
}

#[async_trait]
impl RelationalSink for SqliteSink {
    async fn bulk_insert(
        &self,
        table: &str,
        columns: &[String],
        rows: &[Row],
    ) -> Result<(), SinkError> {
        if rows.is_empty() {
            return Ok(());
        }

        // One statement can bind at most SQLITE_MAX_VARIABLES values; larger
        // batches are split across statements inside one transaction.
        let rows_per_statement = (SQLITE_MAX_VARIABLES / columns.len().max(1)).max(1);

        let mut tx = self.pool.begin().await?;
        for chunk in rows.chunks(rows_per_statement) {
            let mut query_builder = insert_prefix(table, columns);
            query_builder.push_values(chunk, |mut b, row| {
                for value in row {
                    bind_scalar(&mut b, value);
                }
            });
            query_builder.build().execute(&mut *tx).await?;
        }
        tx.commit().await?;

        log::trace!("Inserted {} rows into {}", rows.len(), table);
        Ok(())
    }

    async fn insert(&self, table: &str, columns: &[String], row: &[Scalar]) -> Result<(), SinkError> {
        let mut query_builder = insert_prefix(table, columns);
        query_builder.push_values(std::iter::once(row), |mut b, row| {
            for value in row {
                bind_scalar(&mut b, value);
            }
        });
        query_builder.build().execute(&self.pool).await?;
        Ok(())
    }

    async fn introspect_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, SinkError> {
        let rows = sqlx::query(&format!("PRAGMA table_info({})", quote_ident(table)))
            .fetch_all(&self.pool)
            .await?;

        if rows.is_empty() {
            return Err(SinkError::TableNotFound(table.to_string()));
        }

        rows.iter()
            .map(|r| {
                let name: String = r.try_get("name")?;
                let pk: i64 = r.try_get("pk")?;
                Ok(ColumnInfo::new(name, pk > 0))
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(SinkError::from)
    }

    async fn disconnect(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_helpers::{count_rows, create_test_pool};

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("plain"), "\"plain\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[tokio::test]
    async fn test_introspect_reports_primary_key() {
        let sink = SqliteSink::new(create_test_pool().await);
        let info = sink.introspect_columns("test").await.expect("introspect");

        assert_eq!(info[0], ColumnInfo::new("id", true));
        let names: Vec<&str> = info.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["id", "created_at", "string_a", "string_b", "string_c", "boolean_a", "int_a"]
        );
        assert!(info[1..].iter().all(|c| !c.is_primary_key));
    }

    #[tokio::test]
    async fn test_introspect_missing_table() {
        let sink = SqliteSink::new(create_test_pool().await);
        let err = sink.introspect_columns("nope").await.unwrap_err();
        assert!(matches!(err, SinkError::TableNotFound(t) if t == "nope"));
    }

    #[tokio::test]
    async fn test_bulk_insert_binds_every_scalar_kind() {
        let pool = create_test_pool().await;
        let sink = SqliteSink::new(pool.clone());
        let cols = columns(&["string_a", "string_b", "boolean_a", "int_a"]);
        let rows = vec![
            vec![
                Scalar::from("a"),
                Scalar::Null,
                Scalar::Bool(true),
                Scalar::Integer(1),
            ],
            vec![
                Scalar::from("b"),
                Scalar::from("x,y"),
                Scalar::Bool(false),
                Scalar::Float(2.0),
            ],
        ];

        sink.bulk_insert("test", &cols, &rows).await.expect("bulk insert");
        assert_eq!(count_rows(&pool, "test").await, 2);

        let (string_b, int_a): (Option<String>, i64) =
            sqlx::query_as("SELECT string_b, int_a FROM test WHERE string_a = 'b'")
                .fetch_one(&pool)
                .await
                .expect("select");
        assert_eq!(string_b.as_deref(), Some("x,y"));
        assert_eq!(int_a, 2);
    }

    #[tokio::test]
    async fn test_failed_bulk_insert_writes_nothing() {
        let pool = create_test_pool().await;
        sqlx::query("CREATE UNIQUE INDEX uniq_a ON test (string_a)")
            .execute(&pool)
            .await
            .expect("index");
        let sink = SqliteSink::new(pool.clone());
        let cols = columns(&["string_a"]);
        let rows = vec![
            vec![Scalar::from("same")],
            vec![Scalar::from("other")],
            vec![Scalar::from("same")],
        ];

        let err = sink.bulk_insert("test", &cols, &rows).await.unwrap_err();
        assert_eq!(err.kind(), crate::error_handling::SinkErrorKind::Constraint);
        assert_eq!(count_rows(&pool, "test").await, 0);
    }

    #[tokio::test]
    async fn test_bulk_insert_splits_large_batches() {
        let pool = create_test_pool().await;
        let sink = SqliteSink::new(pool.clone());
        let cols = columns(&["int_a"]);
        let rows: Vec<Row> = (0..(SQLITE_MAX_VARIABLES as i64 + 10))
            .map(|i| vec![Scalar::Integer(i)])
            .collect();

        sink.bulk_insert("test", &cols, &rows).await.expect("bulk insert");
        assert_eq!(count_rows(&pool, "test").await, rows.len() as i64);
    }

    #[tokio::test]
    async fn test_single_insert() {
        let pool = create_test_pool().await;
        let sink = SqliteSink::new(pool.clone());
        sink.insert("test", &columns(&["string_a"]), &[Scalar::from("one")])
            .await
            .expect("insert");
        assert_eq!(count_rows(&pool, "test").await, 1);

        let err = sink
            .insert("test", &columns(&["no_such_column"]), &[Scalar::from("x")])
            .await
            .unwrap_err();
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_disconnect_closes_pool() {
        let pool = create_test_pool().await;
        let sink = SqliteSink::new(pool.clone());
        sink.disconnect().await;
        assert!(pool.is_closed());
    }
}
