//! Post-batch callbacks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::error_handling::WriterError;
use crate::record::Record;

use super::handle::WriterHandle;

/// Called after each batch with the records accepted for writing.
pub type SendBatchCallback = Arc<dyn Fn(&[Record], &WriterHandle) + Send + Sync>;

/// Append-only list of callbacks, invoked in registration order.
///
/// Registration is open until the writer submits its first batch; after that
/// the list is frozen and `register` fails. Callbacks run on worker tasks and
/// must not block for long.
pub struct CallbackRegistry {
    callbacks: RwLock<Vec<SendBatchCallback>>,
    frozen: AtomicBool,
}

impl CallbackRegistry {
    pub fn new(initial: Vec<SendBatchCallback>) -> Self {
        Self {
            callbacks: RwLock::new(initial),
            frozen: AtomicBool::new(false),
        }
    }

    pub fn register(&self, callback: SendBatchCallback) -> Result<(), WriterError> {
        // checked under the write lock so a concurrent freeze() is either
        // fully before or fully after the push
        let mut callbacks = self.callbacks.write().unwrap_or_else(|e| e.into_inner());
        if self.frozen.load(Ordering::SeqCst) {
            return Err(WriterError::CallbackRegistrationClosed);
        }
        callbacks.push(callback);
        Ok(())
    }

    pub(crate) fn freeze(&self) {
        if self.frozen.load(Ordering::SeqCst) {
            return;
        }
        let _callbacks = self.callbacks.write().unwrap_or_else(|e| e.into_inner());
        self.frozen.store(true, Ordering::SeqCst);
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.callbacks.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn invoke(&self, batch: &[Record], handle: &WriterHandle) {
        let callbacks = self
            .callbacks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for callback in callbacks {
            callback(batch, handle);
        }
    }
}
