//! Worker pool and queue configuration structures.

use serde::{Deserialize, Serialize};

use crate::core::error::AppResult;

const DEFAULT_STACK_SIZE: usize = 2 * 1024 * 1024;
const MIN_STACK_SIZE: usize = 64 * 1024;

/// Worker pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerPoolConfig {
    /// Number of worker threads; the maximum number of concurrently
    /// executing operations.
    pub worker_count: usize,
    /// Stack size of each worker thread, in bytes.
    pub thread_stack_size: usize,
    /// Worker threads are named `{prefix}-{index}`.
    pub thread_name_prefix: String,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get(),
            thread_stack_size: DEFAULT_STACK_SIZE,
            thread_name_prefix: "op-worker".to_string(),
        }
    }
}

impl WorkerPoolConfig {
    /// Defaults: one worker per CPU, 2 MiB stacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker count.
    #[must_use]
    pub const fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Set the worker thread stack size.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, thread_stack_size: usize) -> Self {
        self.thread_stack_size = thread_stack_size;
        self
    }

    /// Set the worker thread name prefix.
    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_count == 0 {
            return Err("worker_count must be greater than 0".into());
        }
        if self.thread_stack_size < MIN_STACK_SIZE {
            return Err(format!(
                "thread_stack_size must be at least {MIN_STACK_SIZE} bytes"
            ));
        }
        if self.thread_name_prefix.trim().is_empty() {
            return Err("thread_name_prefix must not be empty".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from the environment.
    ///
    /// Loads a `.env` file if present, then reads `OPERATIONS_WORKER_COUNT`,
    /// `OPERATIONS_THREAD_STACK_SIZE` and `OPERATIONS_THREAD_NAME_PREFIX`.
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Fails if a variable cannot be parsed or the result is invalid.
    pub fn from_env() -> AppResult<Self> {
        let _ = dotenvy::dotenv();
        let mut cfg = Self::default();
        if let Ok(value) = std::env::var("OPERATIONS_WORKER_COUNT") {
            cfg.worker_count = value
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("OPERATIONS_WORKER_COUNT `{value}`: {e}"))?;
        }
        if let Ok(value) = std::env::var("OPERATIONS_THREAD_STACK_SIZE") {
            cfg.thread_stack_size = value
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("OPERATIONS_THREAD_STACK_SIZE `{value}`: {e}"))?;
        }
        if let Ok(value) = std::env::var("OPERATIONS_THREAD_NAME_PREFIX") {
            cfg.thread_name_prefix = value;
        }
        cfg.validate().map_err(anyhow::Error::msg)?;
        Ok(cfg)
    }
}

/// Configuration for a queue built by
/// [`build_queue`](crate::builders::build_queue).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Queue name, used in logs.
    pub name: String,
    /// Worker pool backing the queue.
    pub pool: WorkerPoolConfig,
    /// Whether the queue starts suspended.
    pub start_suspended: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            pool: WorkerPoolConfig::default(),
            start_suspended: false,
        }
    }
}

impl QueueConfig {
    /// Validate the queue and its pool.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("queue name must not be empty".into());
        }
        self.pool
            .validate()
            .map_err(|e| format!("queue `{}` pool invalid: {e}", self.name))
    }

    /// Parse queue configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
