//! Sending one batch to the sink.
//!
//! A batch is first written with a single bulk insert. If that fails the
//! records are inserted one at a time, so the good records still land and the
//! bad one is identified. Records that cannot be converted to a row never
//! reach the sink.

use log::{debug, error, warn};
use tokio_retry::RetryIf;

use crate::error_handling::{get_retry_strategy, SinkError, WriterError};
use crate::record::{record_to_row, Record, Scalar};

use super::handle::{Shared, WriterHandle};

/// Persists `batch` and runs the callbacks.
///
/// Callbacks receive only the records that were written and are skipped when
/// none were. A batch whose records all failed conversion never reaches the
/// sink and is not counted in `batches_sent`. The first record failure
/// (conversion or insert) is returned after every other record has been
/// attempted.
pub(crate) async fn send_batch(handle: WriterHandle, batch: Vec<Record>) -> Result<(), WriterError> {
    let shared = handle.shared.as_ref();
    let table = shared.table.as_str();
    let columns = shared.columns.as_slice();
    let batch_len = batch.len();
    let first_id = batch
        .first()
        .and_then(|r| r.get(&shared.id_field))
        .map(|v| v.to_string())
        .unwrap_or_else(|| "<none>".to_string());

    let mut first_error: Option<WriterError> = None;
    let mut accepted = Vec::with_capacity(batch_len);
    let mut rows = Vec::with_capacity(batch_len);

    for record in batch {
        match record_to_row(&record, columns, &shared.delimiter) {
            Ok(row) => {
                rows.push(row);
                accepted.push(record);
            }
            Err(e) => {
                error!("Could not convert record for {}: {}; record: {}", table, e, record);
                shared.stats.record_failed(1);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    if !rows.is_empty() {
        match shared.sink.bulk_insert(table, columns, &rows).await {
            Ok(()) => {
                shared.stats.record_written(rows.len() as u64);
                debug!("Sent batch of {} records to {}", rows.len(), table);
            }
            Err(e) => {
                warn!(
                    "Bulk insert of {} records into {} failed ({}: {}), first record {}={}; inserting records individually",
                    rows.len(),
                    table,
                    e.kind(),
                    e,
                    shared.id_field,
                    first_id
                );
                shared.stats.bulk_fallback();

                let mut written = Vec::with_capacity(accepted.len());
                for (record, row) in accepted.into_iter().zip(rows) {
                    match insert_with_retry(shared, &row).await {
                        Ok(()) => {
                            shared.stats.record_written(1);
                            written.push(record);
                        }
                        Err(e) => {
                            error!(
                                "Could not insert record into {}: {}; record: {}",
                                table, e, record
                            );
                            shared.stats.record_failed(1);
                            if first_error.is_none() {
                                first_error = Some(e.into());
                            }
                        }
                    }
                }
                accepted = written;
            }
        }
        shared.stats.batch_sent();
    }

    if !accepted.is_empty() {
        shared.callbacks.invoke(&accepted, &handle);
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Single-row insert, retried while the failure is transient.
async fn insert_with_retry(shared: &Shared, row: &[Scalar]) -> Result<(), SinkError> {
    let sink = &shared.sink;
    let table = shared.table.as_str();
    let columns = shared.columns.as_slice();

    RetryIf::spawn(
        get_retry_strategy(shared.transient_retries),
        move || sink.insert(table, columns, row),
        |e: &SinkError| {
            let transient = e.is_transient();
            if transient {
                debug!("Retrying insert into {} after {}", table, e.kind());
            }
            transient
        },
    )
    .await
}
