//! Tokio runtime spawner implementation.

use std::sync::Arc;

use crate::core::error::SchedulerError;
use crate::core::spawn::{BoxedFuture, Spawn};

/// Tokio-based spawner used for condition evaluation.
#[derive(Clone)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
    /// Keeps a runtime created by this spawner alive.
    _owned: Option<Arc<OwnedRuntime>>,
}

/// Runtime shut down in the background once its last owner drops it.
pub(crate) struct OwnedRuntime(Option<tokio::runtime::Runtime>);

impl OwnedRuntime {
    pub(crate) const fn new(runtime: tokio::runtime::Runtime) -> Self {
        Self(Some(runtime))
    }
}

impl Drop for OwnedRuntime {
    fn drop(&mut self) {
        // May be dropped from inside async context; never block here.
        if let Some(runtime) = self.0.take() {
            runtime.shutdown_background();
        }
    }
}

impl TokioSpawner {
    /// Create a new `TokioSpawner` from a tokio runtime handle.
    #[must_use]
    pub const fn new(handle: tokio::runtime::Handle) -> Self {
        Self {
            handle,
            _owned: None,
        }
    }

    /// Capture the runtime the caller is running in.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Runtime` outside a tokio runtime.
    pub fn current() -> Result<Self, SchedulerError> {
        tokio::runtime::Handle::try_current()
            .map(Self::new)
            .map_err(|e| SchedulerError::Runtime(e.to_string()))
    }

    /// Create a `TokioSpawner` owning a new multi-threaded runtime.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Runtime` if the runtime cannot be built.
    pub fn with_worker_threads(worker_threads: usize) -> Result<Self, SchedulerError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads)
            .thread_name("op-conditions")
            .enable_all()
            .build()
            .map_err(|e| SchedulerError::Runtime(e.to_string()))?;
        Ok(Self {
            handle: runtime.handle().clone(),
            _owned: Some(Arc::new(OwnedRuntime::new(runtime))),
        })
    }

    /// Handle of the runtime futures are spawned on.
    #[must_use]
    pub const fn handle(&self) -> &tokio::runtime::Handle {
        &self.handle
    }
}

impl Spawn for TokioSpawner {
    fn spawn(&self, fut: BoxedFuture) {
        self.handle.spawn(fut);
    }
}
