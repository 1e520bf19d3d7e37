//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use prometheus_operations::config::WorkerPoolConfig;
use prometheus_operations::core::{
    ExclusivityController, ExecutionContext, Operation, OperationQueue, Outcome, Task, WorkerPool,
};
use prometheus_operations::runtime::TokioSpawner;

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Queue with its own pool and registry, evaluating conditions on the
/// current tokio runtime.
pub fn make_queue(name: &str, workers: usize) -> OperationQueue {
    let pool = WorkerPool::new(WorkerPoolConfig::new().with_worker_count(workers))
        .expect("worker pool");
    OperationQueue::new(
        name,
        Arc::new(pool),
        Arc::new(ExclusivityController::new()),
        Arc::new(TokioSpawner::current().expect("tokio runtime")),
    )
}

/// Queue sharing pool, registry and spawner with `parent`.
pub fn sibling_queue(name: &str, parent: &OperationQueue) -> OperationQueue {
    OperationQueue::new(
        name,
        Arc::clone(parent.pool()),
        Arc::clone(parent.exclusivity()),
        Arc::new(TokioSpawner::current().expect("tokio runtime")),
    )
}

pub async fn wait_finished(operation: &Operation) {
    tokio::time::timeout(TIMEOUT, async {
        while !operation.is_finished() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("`{}` did not finish in time ({:?})", operation.name(), operation.state()));
}

pub async fn wait_until<F>(what: &str, predicate: F)
where
    F: Fn() -> bool,
{
    tokio::time::timeout(TIMEOUT, async {
        while !predicate() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {what}"));
}

/// Ordered record of events across threads.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.0.lock().iter().position(|e| e == event)
    }
}

/// Operation that logs `name` when it executes.
pub fn logging(name: &str, log: &EventLog) -> Operation {
    let log = log.clone();
    let label = name.to_string();
    Operation::from_fn(name, move |_| {
        log.push(label.clone());
        Outcome::Success
    })
}

/// Operation that counts its executions.
pub fn counting(name: &str, counter: &Arc<AtomicUsize>) -> Operation {
    let counter = Arc::clone(counter);
    Operation::from_fn(name, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Outcome::Success
    })
}

/// Logs `start:{label}`, sleeps, then logs `end:{label}`.
pub struct SleepTask {
    pub label: String,
    pub delay: Duration,
    pub log: EventLog,
}

#[async_trait]
impl Task for SleepTask {
    async fn execute(&self, _ctx: ExecutionContext) -> Outcome {
        self.log.push(format!("start:{}", self.label));
        tokio::time::sleep(self.delay).await;
        self.log.push(format!("end:{}", self.label));
        Outcome::Success
    }
}

pub fn sleeping(name: &str, delay: Duration, log: &EventLog) -> Operation {
    Operation::new(
        name,
        SleepTask {
            label: name.to_string(),
            delay,
            log: log.clone(),
        },
    )
}

/// Starts executing and stays there until finished from outside.
pub struct HoldTask {
    pub started: Arc<AtomicUsize>,
}

#[async_trait]
impl Task for HoldTask {
    async fn execute(&self, _ctx: ExecutionContext) -> Outcome {
        self.started.fetch_add(1, Ordering::SeqCst);
        Outcome::Deferred
    }
}

pub fn holding(name: &str) -> (Operation, Arc<AtomicUsize>) {
    let started = Arc::new(AtomicUsize::new(0));
    let operation = Operation::new(
        name,
        HoldTask {
            started: Arc::clone(&started),
        },
    );
    (operation, started)
}
