//! Configuration models for worker pools and queues.

pub mod pool;

pub use pool::{QueueConfig, WorkerPoolConfig};
