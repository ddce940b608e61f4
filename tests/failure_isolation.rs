//! A bad record must not take its batch down with it.

mod helpers;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sqlx::Row;
use tempfile::TempDir;

use helpers::{connection_string, count_rows, create_test_db};
use table_writer::{
    BatchWriter, MemorySink, Record, SinkErrorKind, WriterConfig, WriterError, WriterHandle,
};

const UNIQUE_TABLE_SQL: &str = "CREATE TABLE books (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    isbn TEXT UNIQUE,
    title TEXT
)";

fn book(isbn: &str, title: &str) -> Record {
    Record::new().with("isbn", isbn).with("title", title)
}

#[tokio::test]
async fn test_constraint_violation_loses_only_the_offending_record() {
    let dir = TempDir::new().unwrap();
    let (path, pool) = create_test_db(&dir, UNIQUE_TABLE_SQL).await;

    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&accepted);
    let writer = BatchWriter::new(
        WriterConfig::new()
            .connection_string(connection_string(&path))
            .table_name("books")
            .batch_size(4)
            .id_field("isbn")
            .after_send_batch(move |batch: &[Record], _: &WriterHandle| {
                counter.fetch_add(batch.len(), Ordering::SeqCst);
            }),
    )
    .await
    .unwrap();

    writer.put(book("111", "one")).await.unwrap();
    writer.put(book("222", "two")).await.unwrap();
    writer.put(book("111", "duplicate")).await.unwrap();
    writer.put(book("333", "three")).await.unwrap();

    let err = writer.close().await.unwrap_err();
    let sink_error = err.as_sink_error().expect("expected a sink error");
    assert_eq!(sink_error.kind(), SinkErrorKind::Constraint);
    assert!(!sink_error.is_transient());

    assert_eq!(count_rows(&pool, "books").await, 3);
    let titles: Vec<String> = sqlx::query("SELECT title FROM books ORDER BY id")
        .fetch_all(&pool)
        .await
        .unwrap()
        .iter()
        .map(|r| r.get("title"))
        .collect();
    assert_eq!(titles, vec!["one", "two", "three"]);
    assert_eq!(accepted.load(Ordering::SeqCst), 3);

    let stats = writer.stats();
    assert_eq!(stats.records_written, 3);
    assert_eq!(stats.records_failed, 1);
    assert_eq!(stats.bulk_fallbacks, 1);
}

#[tokio::test]
async fn test_failure_in_one_batch_is_raised_on_next_put() {
    let sink = Arc::new(
        MemorySink::new("books", &["id", "isbn", "title"], Some("id"))
            .reject_rows_where("isbn", "bad"),
    );
    let writer = BatchWriter::new(
        WriterConfig::new()
            .connection(sink.clone())
            .table_name("books")
            .batch_size(2)
            .thread_pool_size(0),
    )
    .await
    .unwrap();

    writer.put(book("bad", "rejected")).await.unwrap();
    writer.put(book("1", "kept")).await.unwrap();

    let err = writer.put(book("2", "refused")).await.unwrap_err();
    assert!(matches!(err, WriterError::Sink(_)));

    writer.put(book("3", "after")).await.unwrap();
    writer.close().await.unwrap();

    let isbns: Vec<String> = sink
        .rows()
        .iter()
        .map(|r| r["isbn"].as_text().unwrap().to_string())
        .collect();
    assert_eq!(isbns, vec!["1", "3"]);
}

#[tokio::test]
async fn test_many_workers_write_every_record_once() {
    let sink = Arc::new(
        MemorySink::new("books", &["id", "isbn", "title"], Some("id"))
            .with_delay(Duration::from_millis(2)),
    );
    let writer = BatchWriter::new(
        WriterConfig::new()
            .connection(sink.clone())
            .table_name("books")
            .batch_size(10)
            .thread_pool_size(4),
    )
    .await
    .unwrap();

    for i in 0..1_000 {
        writer
            .put(book(&i.to_string(), "concurrent"))
            .await
            .unwrap();
    }
    writer.close().await.unwrap();

    let mut isbns: Vec<i64> = sink
        .rows()
        .iter()
        .map(|r| r["isbn"].as_text().unwrap().parse().unwrap())
        .collect();
    isbns.sort_unstable();
    assert_eq!(isbns, (0..1_000).collect::<Vec<_>>());
    assert_eq!(sink.bulk_calls(), 100);
    assert_eq!(sink.disconnect_count(), 0);
}

#[tokio::test]
async fn test_multi_valued_non_string_field_fails_only_that_record() {
    let sink = Arc::new(MemorySink::new("books", &["id", "isbn", "title"], Some("id")));
    let writer = BatchWriter::new(
        WriterConfig::new()
            .connection(sink.clone())
            .table_name("books")
            .batch_size(3),
    )
    .await
    .unwrap();

    writer.put(book("1", "ok")).await.unwrap();
    writer
        .put(Record::new().with("isbn", "2").with("title", vec![1.5, 2.5]))
        .await
        .unwrap();
    writer.put(book("3", "ok")).await.unwrap();

    let err = writer.close().await.unwrap_err();
    assert!(matches!(err, WriterError::UnsupportedMultiValue { .. }));
    assert_eq!(sink.row_count(), 2);
}
