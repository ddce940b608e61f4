//! Bounded pool of worker tasks sending batches.
//!
//! Jobs go through one bounded FIFO channel shared by all workers, so
//! submission order is preserved and a full queue makes `submit` wait. A pool
//! of size 0 has no workers and runs each job inline in the submitting task.
//!
//! Job failures are not returned to the submitter. The first one is parked in
//! a [`FirstError`] cell and handed out by `raise_if_failed`.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::FutureExt;
use log::{debug, error, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::QUEUE_SIZE_MULTIPLIER;
use crate::error_handling::WriterError;

/// A unit of work run by the pool.
pub type Job = BoxFuture<'static, Result<(), WriterError>>;

/// Holds the first error reported to it until taken.
///
/// Errors arriving while one is already held are logged and dropped.
#[derive(Default)]
pub struct FirstError {
    slot: Mutex<Option<WriterError>>,
}

impl FirstError {
    fn lock(&self) -> MutexGuard<'_, Option<WriterError>> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Stores `error` unless one is already held. Returns whether it was stored.
    pub fn record(&self, error: WriterError) -> bool {
        let mut slot = self.lock();
        if slot.is_some() {
            warn!("Additional worker failure (an earlier one is pending): {}", error);
            return false;
        }
        *slot = Some(error);
        true
    }

    /// Removes and returns the held error.
    pub fn take(&self) -> Option<WriterError> {
        self.lock().take()
    }

    pub fn is_set(&self) -> bool {
        self.lock().is_some()
    }
}

/// Runs batch jobs on up to `size` tokio tasks.
pub struct BoundedWorkerPool {
    size: usize,
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    failure: Arc<FirstError>,
    queued: Arc<AtomicUsize>,
}

impl BoundedWorkerPool {
    /// Starts `size` workers. Must be called from within a tokio runtime when
    /// `size > 0`.
    pub fn new(size: usize) -> Self {
        let failure = Arc::new(FirstError::default());
        let queued = Arc::new(AtomicUsize::new(0));

        if size == 0 {
            return Self {
                size,
                sender: Mutex::new(None),
                workers: Mutex::new(Vec::new()),
                failure,
                queued,
            };
        }

        let (tx, rx) = mpsc::channel::<Job>(size * QUEUE_SIZE_MULTIPLIER);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let workers = (0..size)
            .map(|id| {
                tokio::spawn(worker_loop(
                    id,
                    Arc::clone(&rx),
                    Arc::clone(&failure),
                    Arc::clone(&queued),
                ))
            })
            .collect();

        Self {
            size,
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
            failure,
            queued,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Jobs submitted but not yet picked up by a worker.
    pub fn queued_jobs(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    /// Hands `job` to the pool.
    ///
    /// With workers, returns once the job is queued (waiting for space if the
    /// queue is full). Without workers, runs the job before returning. Either
    /// way the job's own failure is reported through `raise_if_failed`.
    ///
    /// # Errors
    ///
    /// `WriterError::ClosedWriter` if the pool has been shut down.
    pub async fn submit(&self, job: Job) -> Result<(), WriterError> {
        if self.size == 0 {
            run_job(job, &self.failure).await;
            return Ok(());
        }

        let sender = self
            .sender
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(WriterError::ClosedWriter)?;

        self.queued.fetch_add(1, Ordering::SeqCst);
        if sender.send(job).await.is_err() {
            self.queued.fetch_sub(1, Ordering::SeqCst);
            return Err(WriterError::ClosedWriter);
        }
        Ok(())
    }

    /// Returns the first captured job failure, once.
    pub fn raise_if_failed(&self) -> Result<(), WriterError> {
        match self.failure.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn has_failed(&self) -> bool {
        self.failure.is_set()
    }

    /// Stops accepting jobs and waits for every queued and running job.
    ///
    /// Returns how long the wait took. Calling it again returns immediately.
    pub async fn shutdown_and_wait(&self) -> Duration {
        let start = Instant::now();

        drop(self.sender.lock().unwrap_or_else(|e| e.into_inner()).take());
        let workers = std::mem::take(&mut *self.workers.lock().unwrap_or_else(|e| e.into_inner()));

        for worker in workers {
            if let Err(e) = worker.await {
                error!("Worker task ended abnormally: {}", e);
                self.failure
                    .record(WriterError::WorkerPanicked(e.to_string()));
            }
        }

        start.elapsed()
    }
}

async fn worker_loop(
    id: usize,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<Job>>>,
    failure: Arc<FirstError>,
    queued: Arc<AtomicUsize>,
) {
    loop {
        let job = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };
        let Some(job) = job else {
            break;
        };
        queued.fetch_sub(1, Ordering::SeqCst);
        run_job(job, &failure).await;
    }
    debug!("Worker {} finished", id);
}

async fn run_job(job: Job, failure: &FirstError) {
    match AssertUnwindSafe(job).catch_unwind().await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            failure.record(e);
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!("Batch job panicked: {}", message);
            failure.record(WriterError::WorkerPanicked(message));
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
