//! Fixed-width worker pool over a crossbeam job queue
//!
//! ```text
//!    execute() ──► unbounded channel ──► worker 1..N ──► job()
//! ```
//!
//! A panicking job is caught and logged; the worker keeps pulling jobs.
//! `shutdown` closes the queue and waits up to a deadline. Past the deadline
//! the pool is cancelled: jobs still queued are dropped unrun and running
//! workers are detached.

use crossbeam_channel::{unbounded, Sender};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Worker pool is shut down")]
    ShutDown,

    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

pub struct WorkerPool {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    cancelled: Arc<AtomicBool>,
    shutdown_timeout: Duration,
}

impl WorkerPool {
    /// Spawn `width` workers (at least one)
    pub fn new(width: usize, shutdown_timeout: Duration) -> Result<Self, PoolError> {
        let width = width.max(1);
        let (sender, receiver) = unbounded::<Job>();
        let cancelled = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(width);
        for id in 0..width {
            let rx = receiver.clone();
            let cancelled = Arc::clone(&cancelled);
            let handle = thread::Builder::new()
                .name(format!("repoqa-worker-{}", id))
                .spawn(move || {
                    for job in rx {
                        if cancelled.load(Ordering::Acquire) {
                            drop(job);
                            continue;
                        }
                        if let Err(panic) = catch_unwind(AssertUnwindSafe(job)) {
                            warn!("Worker {} job panicked: {}", id, panic_message(panic.as_ref()));
                        }
                    }
                    debug!("Worker {} exiting", id);
                })?;
            workers.push(handle);
        }

        Ok(Self {
            sender: Some(sender),
            workers,
            cancelled,
            shutdown_timeout,
        })
    }

    pub fn width(&self) -> usize {
        self.workers.len()
    }

    /// Queue a job. Never blocks.
    pub fn execute(&self, job: impl FnOnce() + Send + 'static) -> Result<(), PoolError> {
        let sender = self.sender.as_ref().ok_or(PoolError::ShutDown)?;
        sender.send(Box::new(job)).map_err(|_| PoolError::ShutDown)
    }

    /// Close the queue and wait for workers up to `timeout`.
    ///
    /// Returns `true` when every worker finished in time.
    pub fn shutdown(&mut self, timeout: Duration) -> bool {
        drop(self.sender.take());

        let deadline = Instant::now() + timeout;
        while !self.workers.iter().all(|w| w.is_finished()) {
            if Instant::now() >= deadline {
                self.cancelled.store(true, Ordering::Release);
                let stragglers = self.workers.iter().filter(|w| !w.is_finished()).count();
                warn!(
                    "Worker pool did not drain within {:?}; cancelling queued jobs and detaching {} worker(s)",
                    timeout, stragglers
                );
                self.workers.clear();
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }

        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
        true
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if self.sender.is_some() || !self.workers.is_empty() {
            self.shutdown(self.shutdown_timeout);
        }
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
