//! Build an operation queue from configuration.

use std::sync::Arc;

use tracing::info;

use crate::config::QueueConfig;
use crate::core::{ExclusivityController, OperationQueue, SchedulerError, Spawn, WorkerPool};

/// Build a queue with its own worker pool and exclusivity registry.
///
/// Queues that must share exclusivity rules should be created with
/// [`OperationQueue::new`] from one registry instead.
///
/// # Errors
///
/// Returns `SchedulerError::Config` if `cfg` is invalid and
/// `SchedulerError::Pool` if the worker pool cannot be started.
pub fn build_queue(
    cfg: &QueueConfig,
    spawner: Arc<dyn Spawn>,
) -> Result<OperationQueue, SchedulerError> {
    cfg.validate().map_err(SchedulerError::Config)?;

    let pool = Arc::new(WorkerPool::new(cfg.pool.clone())?);
    let exclusivity = Arc::new(ExclusivityController::new());
    let queue = OperationQueue::new(cfg.name.clone(), pool, exclusivity, spawner);
    if cfg.start_suspended {
        queue.suspend();
    }

    info!(queue = %cfg.name, workers = cfg.pool.worker_count, suspended = cfg.start_suspended, "operation queue built");
    Ok(queue)
}
