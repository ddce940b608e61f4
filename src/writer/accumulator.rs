//! Pending-record queue.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use crate::record::Record;

/// Unbounded FIFO of records waiting to be batched.
///
/// Producers never wait on fullness; backpressure comes from the worker pool.
/// `drain_all` swaps the whole queue out under the lock, so two drains never
/// share a record and a record enqueued before a drain is seen by that drain
/// or the next.
#[derive(Default)]
pub struct BatchAccumulator {
    queue: Mutex<VecDeque<Record>>,
}

impl BatchAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Record>> {
        // A poisoned queue still holds valid records.
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn enqueue(&self, record: Record) {
        self.lock().push_back(record);
    }

    /// Removes and returns every queued record, oldest first.
    pub fn drain_all(&self) -> Vec<Record> {
        let drained = std::mem::take(&mut *self.lock());
        Vec::from(drained)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn record(i: i64) -> Record {
        Record::new().with("id", i)
    }

    fn id_of(record: &Record) -> String {
        record.get("id").map(|v| v.to_string()).unwrap_or_default()
    }

    #[test]
    fn test_drain_preserves_fifo_order() {
        let acc = BatchAccumulator::new();
        for i in 0..5 {
            acc.enqueue(record(i));
        }
        assert_eq!(acc.len(), 5);

        let drained: Vec<String> = acc.drain_all().iter().map(id_of).collect();
        assert_eq!(drained, vec!["0", "1", "2", "3", "4"]);
        assert!(acc.is_empty());
    }

    #[test]
    fn test_drain_on_empty_queue() {
        let acc = BatchAccumulator::new();
        assert!(acc.drain_all().is_empty());
    }

    #[test]
    fn test_concurrent_enqueue_and_drain_loses_nothing() {
        let acc = Arc::new(BatchAccumulator::new());
        let producers: Vec<_> = (0..4)
            .map(|p| {
                let acc = Arc::clone(&acc);
                std::thread::spawn(move || {
                    for i in 0..250 {
                        acc.enqueue(record(p * 1000 + i));
                    }
                })
            })
            .collect();

        let drainer = {
            let acc = Arc::clone(&acc);
            std::thread::spawn(move || {
                let mut seen = Vec::new();
                for _ in 0..100 {
                    seen.extend(acc.drain_all());
                    std::thread::yield_now();
                }
                seen
            })
        };

        for p in producers {
            p.join().expect("producer panicked");
        }
        let mut all = drainer.join().expect("drainer panicked");
        all.extend(acc.drain_all());

        assert_eq!(all.len(), 1000);
        let unique: HashSet<String> = all.iter().map(id_of).collect();
        assert_eq!(unique.len(), 1000);
    }
}
