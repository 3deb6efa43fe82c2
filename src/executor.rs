//! Execution contexts owned by a mount session.
//!
//! - [`SerialExecutor`]: one worker thread, FIFO. Nothing submitted here ever
//!   overlaps with anything else submitted here.
//! - [`ConcurrentExecutor`]: a cached pool that hands each job to an idle
//!   worker or starts a new one, so a job never queues behind another.
//!
//! Both catch panics per job so a faulting callback cannot take its worker
//! (and with it every later submission) down.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::{Mutex, RwLock};
use tracing::{error, trace};

use crate::DispatchError;

/// A unit of work handed to an executor.
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

fn run_job(context: &'static str, job: Job) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
        error!(context, panic = panic_message(&*payload), "job panicked");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        *msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Single worker thread draining a FIFO queue.
pub struct SerialExecutor {
    sender: RwLock<Option<Sender<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SerialExecutor {
    const CONTEXT: &'static str = "serial";

    /// Start the worker thread, named `{thread_name}-serial`.
    pub fn new(thread_name: &str) -> Result<Self, DispatchError> {
        let (sender, receiver) = crossbeam_channel::unbounded::<Job>();
        let worker = thread::Builder::new()
            .name(format!("{thread_name}-serial"))
            .spawn(move || {
                for job in receiver.iter() {
                    run_job(Self::CONTEXT, job);
                }
                trace!("serial worker exiting");
            })
            .map_err(|source| DispatchError::Spawn {
                context: Self::CONTEXT,
                source,
            })?;

        Ok(Self {
            sender: RwLock::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Queue a job behind everything submitted before it.
    pub(crate) fn submit(&self, job: Job) -> Result<(), DispatchError> {
        let sender = self.sender.read();
        let sender = sender.as_ref().ok_or(DispatchError::ShutDown {
            context: Self::CONTEXT,
        })?;
        sender.send(job).map_err(|_| DispatchError::ShutDown {
            context: Self::CONTEXT,
        })
    }

    /// Stop accepting work, run what is already queued, and join the worker.
    ///
    /// Idempotent.
    pub fn shutdown(&self) {
        drop(self.sender.write().take());
        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                error!(context = Self::CONTEXT, "worker thread panicked");
            }
        }
    }
}

impl Drop for SerialExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Default time an idle pool worker waits for new work before exiting.
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(60);

/// Unbounded cached thread pool.
///
/// `idle` counts workers that are parked on the queue and not yet promised
/// to a submitted job. A submitter takes one of those slots before sending,
/// or spawns a fresh worker when there is none; a parked worker may only
/// retire by taking a slot too. Every queued job therefore has its own
/// waiting worker.
pub struct ConcurrentExecutor {
    sender: RwLock<Option<Sender<Job>>>,
    receiver: Receiver<Job>,
    idle: Arc<AtomicUsize>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    spawned: AtomicUsize,
    keep_alive: Duration,
    thread_name: String,
}

impl ConcurrentExecutor {
    const CONTEXT: &'static str = "concurrent";

    /// Create an empty pool. Workers are started on demand and named
    /// `{thread_name}-worker-{n}`.
    pub fn new(thread_name: &str, keep_alive: Duration) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded::<Job>();
        Self {
            sender: RwLock::new(Some(sender)),
            receiver,
            idle: Arc::new(AtomicUsize::new(0)),
            workers: Mutex::new(Vec::new()),
            spawned: AtomicUsize::new(0),
            keep_alive,
            thread_name: thread_name.to_owned(),
        }
    }

    /// Run a job on an idle worker, or on a new one if none is free.
    pub(crate) fn submit(&self, job: Job) -> Result<(), DispatchError> {
        let sender = self.sender.read();
        let sender = sender.as_ref().ok_or(DispatchError::ShutDown {
            context: Self::CONTEXT,
        })?;

        if take_idle_slot(&self.idle) {
            return sender.send(job).map_err(|_| DispatchError::ShutDown {
                context: Self::CONTEXT,
            });
        }
        self.spawn_worker(job)
    }

    fn spawn_worker(&self, first: Job) -> Result<(), DispatchError> {
        let n = self.spawned.fetch_add(1, Ordering::Relaxed);
        let receiver = self.receiver.clone();
        let idle = Arc::clone(&self.idle);
        let keep_alive = self.keep_alive;

        let handle = thread::Builder::new()
            .name(format!("{}-worker-{n}", self.thread_name))
            .spawn(move || worker_loop(first, receiver, idle, keep_alive))
            .map_err(|source| DispatchError::Spawn {
                context: Self::CONTEXT,
                source,
            })?;

        let mut workers = self.workers.lock();
        workers.retain(|worker| !worker.is_finished());
        workers.push(handle);
        Ok(())
    }

    /// Number of worker threads currently alive.
    pub fn worker_count(&self) -> usize {
        self.workers
            .lock()
            .iter()
            .filter(|worker| !worker.is_finished())
            .count()
    }

    /// Stop accepting work, let queued jobs finish, and join every worker.
    ///
    /// Idempotent.
    pub fn shutdown(&self) {
        drop(self.sender.write().take());
        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            if worker.join().is_err() {
                error!(context = Self::CONTEXT, "worker thread panicked");
            }
        }
    }
}

impl Drop for ConcurrentExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn take_idle_slot(idle: &AtomicUsize) -> bool {
    idle.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        .is_ok()
}

fn worker_loop(first: Job, receiver: Receiver<Job>, idle: Arc<AtomicUsize>, keep_alive: Duration) {
    run_job(ConcurrentExecutor::CONTEXT, first);
    loop {
        idle.fetch_add(1, Ordering::AcqRel);
        loop {
            match receiver.recv_timeout(keep_alive) {
                Ok(job) => {
                    run_job(ConcurrentExecutor::CONTEXT, job);
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {
                    // No free slot: a submitter has promised this worker a job.
                    if take_idle_slot(&idle) {
                        trace!("pool worker retiring after keep-alive");
                        return;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }
    }
}
