//! Native implementation of `WorkerPool` using OS threads.
//!
//! Each worker thread blocks on the shared channel until an operation arrives,
//! then drives it with `block_on` through the pool's tokio runtime. That
//! runtime has threads of its own, so futures a task spawns keep running
//! after the task returns [`Outcome::Deferred`]. Dropping the sender unblocks
//! every worker, which is how shutdown is signalled.
//!
//! [`Outcome::Deferred`]: crate::core::Outcome::Deferred

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::WorkerPoolConfig;
use crate::core::error::OperationError;
use crate::core::operation::Operation;
use crate::runtime::tokio_spawner::OwnedRuntime;

use super::{PoolCounters, PoolError, PoolStats};

/// Worker pool with dedicated OS threads.
///
/// Concurrency is bounded by the configured worker count. Operations are
/// dispatched only once they are ready, so the channel never holds work that
/// is waiting on something else.
pub struct WorkerPool {
    /// Pool configuration.
    config: WorkerPoolConfig,

    /// Sender to workers. `None` once shut down.
    task_tx: Mutex<Option<Sender<Operation>>>,

    /// Kept to abandon operations no worker picked up before shutdown.
    task_rx: Receiver<Operation>,

    /// Runtime the workers block on; shared so it outlives detached workers.
    runtime: Arc<OwnedRuntime>,

    /// Pool statistics counters.
    counters: Arc<PoolCounters>,

    /// Shutdown flag.
    shutdown: Arc<AtomicBool>,

    /// Worker thread handles.
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Create a new worker pool and spawn its worker threads.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::InvalidConfig` if the configuration is invalid and
    /// `PoolError::Internal` if a worker thread cannot be spawned.
    pub fn new(config: WorkerPoolConfig) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;

        let (task_tx, task_rx) = unbounded::<Operation>();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.worker_count.clamp(1, 4))
            .thread_name(format!("{}-rt", config.thread_name_prefix))
            .enable_all()
            .build()
            .map_err(|e| PoolError::Internal(format!("failed to build worker runtime: {e}")))?;
        let handle = runtime.handle().clone();
        let runtime = Arc::new(OwnedRuntime::new(runtime));
        let counters = Arc::new(PoolCounters::default());
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(config.worker_count);
        for worker_id in 0..config.worker_count {
            let worker = spawn_worker(
                worker_id,
                &config,
                task_rx.clone(),
                handle.clone(),
                Arc::clone(&runtime),
                Arc::clone(&counters),
                Arc::clone(&shutdown),
            );
            match worker {
                Ok(handle) => workers.push(handle),
                Err(err) => {
                    shutdown.store(true, Ordering::Release);
                    return Err(PoolError::Internal(format!(
                        "failed to spawn worker {worker_id}: {err}"
                    )));
                }
            }
        }

        info!(
            worker_count = config.worker_count,
            thread_name_prefix = %config.thread_name_prefix,
            "WorkerPool initialized with dedicated OS threads"
        );

        Ok(Self {
            config,
            task_tx: Mutex::new(Some(task_tx)),
            task_rx,
            runtime,
            counters,
            shutdown,
            workers: Mutex::new(workers),
        })
    }

    /// Hand a ready operation to the workers.
    pub(crate) fn dispatch(&self, operation: Operation) -> Result<(), PoolError> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(PoolError::PoolShutdown);
        }

        let task_tx = self.task_tx.lock();
        let Some(task_tx) = task_tx.as_ref() else {
            return Err(PoolError::PoolShutdown);
        };

        let name = operation.name().to_string();
        // Counted before sending so a fast worker never decrements first.
        self.counters.queued.fetch_add(1, Ordering::Relaxed);
        if task_tx.send(operation).is_err() {
            self.counters.queued.fetch_sub(1, Ordering::Relaxed);
            return Err(PoolError::PoolShutdown);
        }
        self.counters.dispatched.fetch_add(1, Ordering::Relaxed);
        debug!(operation = %name, "operation dispatched to worker pool");
        Ok(())
    }

    /// Get current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.counters.snapshot(self.config.worker_count)
    }

    /// Number of worker threads.
    #[must_use]
    pub const fn worker_count(&self) -> usize {
        self.config.worker_count
    }

    /// `true` once [`shutdown`](Self::shutdown) ran or the pool was dropped.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Shut down the pool gracefully with timeout.
    ///
    /// Drops the sender to unblock idle workers, then joins each worker for up
    /// to two seconds. Workers still busy after that are detached. Operations
    /// still queued are not run; they finish cancelled with
    /// [`OperationError::Scheduling`].
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }

        info!("Shutting down worker pool");

        {
            let mut task_tx = self.task_tx.lock();
            *task_tx = None;
        }

        let mut workers = self.workers.lock();
        let worker_count = workers.len();

        for (idx, worker) in workers.drain(..).enumerate() {
            let (tx, rx) = std::sync::mpsc::channel();
            let join_thread = thread::spawn(move || {
                let result = worker.join();
                let _ = tx.send(result.is_ok());
            });

            match rx.recv_timeout(Duration::from_secs(2)) {
                Ok(true) => debug!(worker_id = idx, "Worker joined successfully"),
                Ok(false) => warn!(worker_id = idx, "Worker panicked"),
                Err(_) => {
                    warn!(worker_id = idx, "Worker did not exit within timeout - detaching");
                    continue;
                }
            }

            let _ = join_thread.join();
        }

        // Workers that exited or never started leave their share behind.
        let mut abandoned = 0_usize;
        while let Ok(operation) = self.task_rx.try_recv() {
            self.counters.queued.fetch_sub(1, Ordering::Relaxed);
            abandon(&operation);
            abandoned += 1;
        }
        if abandoned > 0 {
            warn!(abandoned = abandoned, "operations abandoned at shutdown");
        }

        info!(worker_count = worker_count, "Worker pool shut down complete");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Signal only. Joining here would hang if an operation is still running.
        if !self.shutdown.swap(true, Ordering::AcqRel) {
            let mut task_tx = self.task_tx.lock();
            *task_tx = None;
            debug!("WorkerPool dropped without explicit shutdown - workers will be detached");
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("worker_count", &self.config.worker_count)
            .field("shutdown", &self.is_shut_down())
            .field("runtime_owners", &Arc::strong_count(&self.runtime))
            .finish_non_exhaustive()
    }
}

fn spawn_worker(
    worker_id: usize,
    config: &WorkerPoolConfig,
    task_rx: Receiver<Operation>,
    handle: tokio::runtime::Handle,
    runtime: Arc<OwnedRuntime>,
    counters: Arc<PoolCounters>,
    shutdown: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("{}-{worker_id}", config.thread_name_prefix))
        .stack_size(config.thread_stack_size)
        .spawn(move || {
            debug!(worker_id = worker_id, "Worker thread started");
            let _runtime = runtime;

            // recv() keeps yielding buffered operations after the sender is
            // dropped and fails once the channel is empty.
            while let Ok(operation) = task_rx.recv() {
                counters.queued.fetch_sub(1, Ordering::Relaxed);
                if shutdown.load(Ordering::Acquire) {
                    debug!(worker_id = worker_id, operation = %operation.name(), "Worker abandoning operation after shutdown");
                    abandon(&operation);
                    continue;
                }
                counters.active.fetch_add(1, Ordering::Relaxed);
                debug!(worker_id = worker_id, operation = %operation.name(), "Worker running operation");

                let result = catch_unwind(AssertUnwindSafe(|| handle.block_on(operation.start())));
                if let Err(payload) = result {
                    let message = panic_message(payload.as_ref());
                    error!(worker_id = worker_id, operation = %operation.name(), panic = %message, "operation panicked");
                    counters.panicked.fetch_add(1, Ordering::Relaxed);
                    operation.finish_with(OperationError::Panicked(message));
                }

                counters.completed.fetch_add(1, Ordering::Relaxed);
                counters.active.fetch_sub(1, Ordering::Relaxed);
            }

            debug!(worker_id = worker_id, "Worker thread exiting");
        })
}

/// Finish an operation that will never run.
fn abandon(operation: &Operation) {
    operation.cancel_with(OperationError::Scheduling("pool shut down".into()));
    operation.finish_cancelled();
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
