//! Tests for configuration validation

use prometheus_operations::config::{QueueConfig, WorkerPoolConfig};

#[test]
fn test_pool_config_defaults_are_valid() {
    let config = WorkerPoolConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.worker_count, num_cpus::get());
    assert_eq!(config.thread_stack_size, 2 * 1024 * 1024);
    assert_eq!(config.thread_name_prefix, "op-worker");
}

#[test]
fn test_pool_config_invalid_worker_count() {
    let invalid = WorkerPoolConfig::new().with_worker_count(0);
    let err = invalid.validate().unwrap_err();
    assert!(err.contains("worker_count"));
}

#[test]
fn test_pool_config_invalid_stack_size() {
    let invalid = WorkerPoolConfig::new().with_thread_stack_size(1024);
    assert!(invalid.validate().unwrap_err().contains("thread_stack_size"));
}

#[test]
fn test_pool_config_blank_prefix() {
    let invalid = WorkerPoolConfig::new().with_thread_name_prefix("  ");
    assert!(invalid.validate().is_err());
}

#[test]
fn test_pool_config_from_json_fills_defaults() {
    let config = WorkerPoolConfig::from_json_str(r#"{ "worker_count": 3 }"#).unwrap();
    assert_eq!(config.worker_count, 3);
    assert_eq!(config.thread_name_prefix, "op-worker");
}

#[test]
fn test_pool_config_from_json_rejects_invalid() {
    let err = WorkerPoolConfig::from_json_str(r#"{ "worker_count": 0 }"#).unwrap_err();
    assert!(err.contains("worker_count"));
    let err = WorkerPoolConfig::from_json_str("{ not json").unwrap_err();
    assert!(err.starts_with("parse error"));
}

#[test]
fn test_pool_config_from_env() {
    // Only this test touches these variables.
    std::env::set_var("OPERATIONS_WORKER_COUNT", "5");
    std::env::set_var("OPERATIONS_THREAD_NAME_PREFIX", "env-worker");
    let config = WorkerPoolConfig::from_env().unwrap();
    assert_eq!(config.worker_count, 5);
    assert_eq!(config.thread_name_prefix, "env-worker");

    std::env::set_var("OPERATIONS_WORKER_COUNT", "many");
    assert!(WorkerPoolConfig::from_env().is_err());

    std::env::remove_var("OPERATIONS_WORKER_COUNT");
    std::env::remove_var("OPERATIONS_THREAD_NAME_PREFIX");
}

#[test]
fn test_queue_config_validation() {
    assert!(QueueConfig::default().validate().is_ok());

    let unnamed = QueueConfig {
        name: String::new(),
        ..QueueConfig::default()
    };
    assert!(unnamed.validate().is_err());

    let bad_pool = QueueConfig {
        name: "uploads".to_string(),
        pool: WorkerPoolConfig::new().with_worker_count(0),
        start_suspended: false,
    };
    let err = bad_pool.validate().unwrap_err();
    assert!(err.contains("uploads"));
}

#[test]
fn test_queue_config_from_json() {
    let json = r#"{
        "name": "uploads",
        "pool": { "worker_count": 2, "thread_name_prefix": "upload" },
        "start_suspended": true
    }"#;

    let config = QueueConfig::from_json_str(json).unwrap();
    assert_eq!(config.name, "uploads");
    assert_eq!(config.pool.worker_count, 2);
    assert_eq!(config.pool.thread_name_prefix, "upload");
    assert!(config.start_suspended);
}
