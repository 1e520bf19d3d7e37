//! Abstraction for running asynchronous side-work off the worker pool.

use std::future::Future;
use std::pin::Pin;

/// A boxed, sendable future with no output.
pub type BoxedFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Abstraction for spawning async work on a runtime.
///
/// Condition evaluation runs through this seam so that waiting on a
/// condition never occupies a worker thread. Implementations must provide a
/// tokio context to the spawned future, since the evaluator fans conditions
/// out with `tokio::spawn`.
pub trait Spawn: Send + Sync {
    /// Spawn a future and return immediately.
    fn spawn(&self, fut: BoxedFuture);
}
