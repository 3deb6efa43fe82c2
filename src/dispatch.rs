//! Routes each callback's work onto the execution context its class requires
//! and blocks the calling thread until exactly one result comes back.

use std::time::Duration;

use tracing::trace;

use crate::executor::{ConcurrentExecutor, Job, SerialExecutor};
use crate::ops::{OpClass, OpKind};
use crate::DispatchError;

/// Owns the two execution contexts of a mount session.
pub struct Dispatcher {
    serial: SerialExecutor,
    concurrent: ConcurrentExecutor,
}

impl Dispatcher {
    /// Start the serial worker; the concurrent pool grows on demand.
    pub fn new(thread_name: &str, keep_alive: Duration) -> Result<Self, DispatchError> {
        Ok(Self {
            serial: SerialExecutor::new(thread_name)?,
            concurrent: ConcurrentExecutor::new(thread_name, keep_alive),
        })
    }

    /// Run `work` in the context `kind` is classified into and wait for it.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::ShutDown`] if the session is being torn down
    /// - [`DispatchError::WorkerLost`] if `work` panicked
    /// - [`DispatchError::Spawn`] if the pool could not start a worker
    pub fn dispatch<T, F>(&self, kind: OpKind, work: F) -> Result<T, DispatchError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        let job: Job = Box::new(move || {
            // The caller only goes away if it is itself unwinding.
            let _ = reply_tx.send(work());
        });

        let class = kind.class();
        trace!(op = kind.name(), ?class, "dispatching");
        match class {
            OpClass::Serialized => self.serial.submit(job)?,
            OpClass::Concurrent => self.concurrent.submit(job)?,
        }

        reply_rx.recv().map_err(|_| DispatchError::WorkerLost {
            operation: kind.name(),
        })
    }

    /// Drain and join both contexts. Idempotent.
    pub fn shutdown(&self) {
        self.serial.shutdown();
        self.concurrent.shutdown();
    }

    /// Live threads in the concurrent pool.
    pub fn concurrent_workers(&self) -> usize {
        self.concurrent.worker_count()
    }
}
