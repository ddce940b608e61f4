//! Writer counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of a writer's counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Records persisted
    pub records_written: u64,
    /// Records that could not be converted or inserted
    pub records_failed: u64,
    /// Batches processed (including ones that fell back to single inserts)
    pub batches_sent: u64,
    /// Batches whose bulk insert failed
    pub bulk_fallbacks: u64,
}

#[derive(Debug, Default)]
pub(crate) struct AtomicWriterStats {
    records_written: AtomicU64,
    records_failed: AtomicU64,
    batches_sent: AtomicU64,
    bulk_fallbacks: AtomicU64,
}

impl AtomicWriterStats {
    pub fn record_written(&self, count: u64) {
        self.records_written.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_failed(&self, count: u64) {
        self.records_failed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn batch_sent(&self) {
        self.batches_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bulk_fallback(&self) {
        self.bulk_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> WriterStats {
        WriterStats {
            records_written: self.records_written.load(Ordering::Relaxed),
            records_failed: self.records_failed.load(Ordering::Relaxed),
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            bulk_fallbacks: self.bulk_fallbacks.load(Ordering::Relaxed),
        }
    }
}
