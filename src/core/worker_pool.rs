//! Worker pool executing ready operations on dedicated threads.
//!
//! The pool never decides readiness itself. An [`OperationQueue`] dispatches
//! an operation only after its readiness check passed; the pool's job is to
//! run it with bounded concurrency and to guarantee that it reaches a
//! terminal state even if its task panics or the pool shuts down first.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use prometheus_operations::config::WorkerPoolConfig;
//! use prometheus_operations::core::WorkerPool;
//!
//! let pool = Arc::new(WorkerPool::new(WorkerPoolConfig::new().with_worker_count(4))?);
//! // hand the pool to one or more queues ...
//! pool.shutdown();
//! ```
//!
//! [`OperationQueue`]: crate::core::OperationQueue

mod native;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Errors that can occur when using a `WorkerPool`.
#[derive(Debug)]
pub enum PoolError {
    /// The pool has been shut down.
    PoolShutdown,

    /// Configuration validation failed.
    InvalidConfig(String),

    /// Internal error (thread spawn failure, channel closed, etc.).
    Internal(String),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PoolShutdown => write!(f, "pool has been shut down"),
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for PoolError {}

/// Statistics about pool utilization.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Number of worker threads.
    pub worker_count: usize,

    /// Operations dispatched and not yet picked up by a worker.
    pub queued_operations: u64,

    /// Operations currently being run by a worker.
    pub active_operations: u64,

    /// Total operations a worker finished running.
    pub completed_operations: u64,

    /// Total operations whose task panicked.
    pub panicked_operations: u64,

    /// Total operations dispatched to the pool.
    pub dispatched_operations: u64,
}

/// Internal counters for pool statistics (thread-safe).
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub queued: AtomicU64,
    pub active: AtomicU64,
    pub completed: AtomicU64,
    pub panicked: AtomicU64,
    pub dispatched: AtomicU64,
}

impl PoolCounters {
    /// Get a snapshot of current statistics.
    pub fn snapshot(&self, worker_count: usize) -> PoolStats {
        PoolStats {
            worker_count,
            queued_operations: self.queued.load(Ordering::Relaxed),
            active_operations: self.active.load(Ordering::Relaxed),
            completed_operations: self.completed.load(Ordering::Relaxed),
            panicked_operations: self.panicked.load(Ordering::Relaxed),
            dispatched_operations: self.dispatched.load(Ordering::Relaxed),
        }
    }
}

pub use native::WorkerPool;
