//! Shared worker pool and task handles.
//!
//! One pool is shared by the dispatcher and by any algorithm that spawns
//! sub-work through its context. The pool itself is opaque and safe for
//! concurrent submission; all coordination state lives next to it: a
//! draining flag that rejects late submissions once shutdown has begun, and
//! an in-flight counter that shutdown waits on.

use crate::error::ConfigurationError;
use crossbeam_channel::{bounded, Receiver};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Upper bound on how long [`WorkerPool::shutdown`] waits for in-flight
/// tasks. Deliberately enormous: shutdown means "wait for completion", not
/// "kill stragglers". A hung task delays shutdown rather than losing results.
pub const SHUTDOWN_BOUND: Duration = Duration::from_secs(24 * 60 * 60);

/// Rejection returned by [`WorkerPool::submit`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    /// Shutdown has begun; the pool no longer accepts work.
    #[error("worker pool is draining, submission rejected")]
    Draining,
}

/// Error returned by [`TaskHandle::join`] when the task died without
/// producing a value (it panicked inside the pool).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("task ended without producing a value")]
pub struct TaskLost;

/// A bounded pool of worker threads.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    draining: AtomicBool,
    in_flight: AtomicUsize,
    drain_lock: Mutex<()>,
    drained: Condvar,
}

impl WorkerPool {
    /// Builds a pool with exactly `workers` threads.
    pub fn new(workers: usize) -> Result<Arc<Self>, ConfigurationError> {
        if workers == 0 {
            return Err(ConfigurationError::InvalidParameter(
                "worker pool needs at least one thread".to_string(),
            ));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("heurlab-worker-{i}"))
            .build()
            .map_err(|e| {
                ConfigurationError::InvalidParameter(format!("failed to build worker pool: {e}"))
            })?;
        Ok(Arc::new(Self {
            pool,
            draining: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
            drain_lock: Mutex::new(()),
            drained: Condvar::new(),
        }))
    }

    /// Number of worker threads.
    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Whether shutdown has begun.
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    /// Tasks submitted but not yet finished.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Submits a task and returns a handle to its eventual result.
    ///
    /// Rejected once the pool is draining. A task that panics loses its
    /// handle; the panic is contained to the worker thread and surfaces as
    /// [`TaskLost`] for whoever joins the handle.
    pub fn submit<T, F>(self: &Arc<Self>, task: F) -> Result<TaskHandle<T>, SubmitError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        if self.is_draining() {
            return Err(SubmitError::Draining);
        }
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        let (tx, rx) = bounded(1);
        let pool = Arc::clone(self);
        self.pool.spawn(move || {
            match catch_unwind(AssertUnwindSafe(task)) {
                Ok(value) => {
                    // The receiver may already be gone, nothing to do then.
                    let _ = tx.send(value);
                }
                Err(_) => {
                    tracing::error!("task panicked inside the worker pool, dropping its handle");
                    drop(tx);
                }
            }
            pool.task_finished();
        });
        Ok(TaskHandle {
            inner: HandleState::Pending(rx),
        })
    }

    fn task_finished(&self) {
        let previous = self.in_flight.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "in-flight counter underflow");
        if previous == 1 {
            let _guard = self
                .drain_lock
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            self.drained.notify_all();
        }
    }

    /// Stops accepting new submissions and blocks until every in-flight
    /// task has finished, or [`SHUTDOWN_BOUND`] elapses. Idempotent.
    pub fn shutdown(&self) {
        self.draining.store(true, Ordering::Release);
        let deadline = Instant::now() + SHUTDOWN_BOUND;
        let mut guard = self
            .drain_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while self.in_flight.load(Ordering::Acquire) > 0 {
            if Instant::now() >= deadline {
                tracing::warn!(
                    remaining = self.in_flight(),
                    "shutdown bound elapsed with tasks still running"
                );
                break;
            }
            let (g, _) = self
                .drained
                .wait_timeout(guard, Duration::from_millis(50))
                .unwrap_or_else(PoisonError::into_inner);
            guard = g;
        }
    }
}

/// Handle to a submitted (or inline-executed) task.
pub struct TaskHandle<T> {
    inner: HandleState<T>,
}

enum HandleState<T> {
    /// The task already ran inline; the value is right here.
    Ready(T),
    Pending(Receiver<T>),
}

impl<T> TaskHandle<T> {
    /// Wraps an already-computed value, used when work runs inline because
    /// no pool is configured.
    pub(crate) fn ready(value: T) -> Self {
        Self {
            inner: HandleState::Ready(value),
        }
    }

    /// Blocks until the task completes and returns its value.
    pub fn join(self) -> Result<T, TaskLost> {
        match self.inner {
            HandleState::Ready(value) => Ok(value),
            HandleState::Pending(rx) => rx.recv().map_err(|_| TaskLost),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn test_submit_and_join() {
        let pool = WorkerPool::new(2).unwrap();
        let handle = pool.submit(|| 21 * 2).unwrap();
        assert_eq!(handle.join(), Ok(42));
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(WorkerPool::new(0).is_err());
    }

    #[test]
    fn test_many_tasks_all_complete() {
        let pool = WorkerPool::new(4).unwrap();
        let counter = Arc::new(AtomicU32::new(0));
        let handles: Vec<_> = (0..100)
            .map(|i| {
                let counter = Arc::clone(&counter);
                pool.submit(move || {
                    counter.fetch_add(1, Ordering::Relaxed);
                    i
                })
                .unwrap()
            })
            .collect();
        let mut values: Vec<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        values.sort_unstable();
        assert_eq!(values, (0..100).collect::<Vec<_>>());
        assert_eq!(counter.load(Ordering::Relaxed), 100);
    }

    #[test]
    fn test_shutdown_rejects_new_submissions() {
        let pool = WorkerPool::new(2).unwrap();
        pool.shutdown();
        let result = pool.submit(|| 1);
        assert!(matches!(result, Err(SubmitError::Draining)));
    }

    #[test]
    fn test_shutdown_waits_for_in_flight() {
        let pool = WorkerPool::new(2).unwrap();
        let done = Arc::new(AtomicBool::new(false));
        let done_clone = Arc::clone(&done);
        let handle = pool
            .submit(move || {
                std::thread::sleep(Duration::from_millis(100));
                done_clone.store(true, Ordering::Release);
            })
            .unwrap();

        pool.shutdown();
        assert!(done.load(Ordering::Acquire), "shutdown returned early");
        assert_eq!(pool.in_flight(), 0);
        assert!(handle.join().is_ok());
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let pool = WorkerPool::new(1).unwrap();
        pool.shutdown();
        pool.shutdown();
        assert!(pool.is_draining());
    }

    #[test]
    fn test_panicking_task_loses_handle_only() {
        let pool = WorkerPool::new(2).unwrap();
        let bad = pool.submit(|| -> u32 { panic!("boom") }).unwrap();
        assert_eq!(bad.join(), Err(TaskLost));

        // The pool is still fully operational afterwards.
        let good = pool.submit(|| 7).unwrap();
        assert_eq!(good.join(), Ok(7));
        pool.shutdown();
        assert_eq!(pool.in_flight(), 0);
    }

    #[test]
    fn test_ready_handle() {
        let handle = TaskHandle::ready("done");
        assert_eq!(handle.join(), Ok("done"));
    }

    #[test]
    fn test_workers_reports_thread_count() {
        let pool = WorkerPool::new(3).unwrap();
        assert_eq!(pool.workers(), 3);
    }
}
