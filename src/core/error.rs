//! Error types for operations and scheduler components.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::core::operation::{Operation, OperationId};
use crate::core::worker_pool::PoolError;

/// Identifies a dependency inside an error without keeping it alive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyRef {
    /// Identifier of the dependency.
    pub id: OperationId,
    /// Human-readable name of the dependency.
    pub name: String,
}

impl DependencyRef {
    /// Capture the identity of `operation`.
    #[must_use]
    pub fn of(operation: &Operation) -> Self {
        Self {
            id: operation.id(),
            name: operation.name().to_string(),
        }
    }
}

impl fmt::Display for DependencyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` ({})", self.name, self.id)
    }
}

/// A dependency together with the errors it finished with.
#[derive(Debug, Clone)]
pub struct DependencyFailure {
    /// The failed dependency.
    pub dependency: DependencyRef,
    /// Errors reported by the dependency, in reporting order.
    pub errors: Vec<OperationError>,
}

impl fmt::Display for DependencyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} with {} error(s)", self.dependency, self.errors.len())
    }
}

/// Errors carried by operations.
///
/// Operations never throw: every failure is a value collected into an ordered
/// list that is published once, when the operation finishes. Lists are never
/// deduplicated.
#[derive(Debug, Clone, Error)]
pub enum OperationError {
    /// A condition could not be evaluated or rejected the operation.
    #[error("condition `{condition}` failed: {reason}")]
    ConditionFailed {
        /// Name of the condition.
        condition: String,
        /// Why it failed.
        reason: String,
    },
    /// One or more dependencies were cancelled.
    #[error("dependencies were cancelled: {}", describe_refs(.0))]
    DependenciesCancelled(Vec<DependencyRef>),
    /// One or more dependencies finished with errors.
    #[error("dependencies failed: {}", describe_failures(.0))]
    DependenciesFailed(Vec<DependencyFailure>),
    /// A single dependency finished with errors.
    #[error("dependency {0}")]
    DependencyFailed(DependencyFailure),
    /// A dependency had not finished when it was inspected.
    #[error("dependency {0} has not finished")]
    DependencyUnfinished(DependencyRef),
    /// The operation's own work failed.
    #[error("execution failed: {0}")]
    Execution(String),
    /// The operation's work panicked on a worker thread.
    #[error("operation panicked: {0}")]
    Panicked(String),
    /// The operation was cancelled with a reason.
    #[error("cancelled: {0}")]
    Cancelled(String),
    /// The scheduler could not run the operation.
    #[error("scheduling failed: {0}")]
    Scheduling(String),
    /// Application-defined error.
    #[error("{0}")]
    Custom(Arc<dyn std::error::Error + Send + Sync>),
}

impl OperationError {
    /// Wrap an application error.
    pub fn custom<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(error))
    }

    /// Downcast a [`OperationError::Custom`] payload.
    #[must_use]
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match self {
            Self::Custom(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }
}

fn describe_refs(refs: &[DependencyRef]) -> String {
    refs.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_failures(failures: &[DependencyFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors produced while constructing or driving scheduler components.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The worker pool rejected the request.
    #[error("worker pool error: {0}")]
    Pool(#[from] PoolError),
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// No async runtime was available for condition evaluation.
    #[error("runtime unavailable: {0}")]
    Runtime(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
