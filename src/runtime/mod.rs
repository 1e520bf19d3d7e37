//! Runtime adapters for async side-work.

pub mod tokio_spawner;

pub use tokio_spawner::TokioSpawner;
