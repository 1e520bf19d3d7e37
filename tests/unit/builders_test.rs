//! Tests for builder modules

use std::sync::Arc;

use prometheus_operations::builders::build_queue;
use prometheus_operations::config::{QueueConfig, WorkerPoolConfig};
use prometheus_operations::core::{Operation, SchedulerError};
use prometheus_operations::runtime::TokioSpawner;

#[tokio::test]
async fn test_build_queue_from_config() {
    let config = QueueConfig {
        name: "built".to_string(),
        pool: WorkerPoolConfig::new().with_worker_count(2),
        start_suspended: true,
    };
    let queue = build_queue(&config, Arc::new(TokioSpawner::current().unwrap())).unwrap();

    assert_eq!(queue.name(), "built");
    assert!(queue.is_suspended());
    assert_eq!(queue.pool().worker_count(), 2);

    let op = Operation::noop("op");
    queue.submit(&op);
    queue.resume();
    tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while !op.is_finished() {
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
    })
    .await
    .unwrap();
    queue.pool().shutdown();
}

#[tokio::test]
async fn test_build_queue_rejects_invalid_config() {
    let config = QueueConfig {
        pool: WorkerPoolConfig::new().with_worker_count(0),
        ..QueueConfig::default()
    };
    let result = build_queue(&config, Arc::new(TokioSpawner::current().unwrap()));
    assert!(matches!(result, Err(SchedulerError::Config(_))));
}
