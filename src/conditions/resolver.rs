use async_trait::async_trait;

use crate::core::condition::{Condition, ConditionResult};
use crate::core::error::{DependencyFailure, DependencyRef, OperationError};
use crate::core::operation::Operation;

/// What to do with a dependency's errors.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// Run the dependent as if the dependency had succeeded.
    Proceed,
    /// Fail the dependent with the dependency's errors.
    Propagate,
    /// Fail the dependent with a different error.
    Substitute(OperationError),
}

/// Maps a failed dependency's errors to a [`Resolution`].
///
/// Closures taking `(&Operation, &[OperationError])` implement this trait.
pub trait ErrorResolver: Send + Sync {
    /// Decide how `dependency`'s non-empty `errors` affect the dependent.
    fn resolve(&self, dependency: &Operation, errors: &[OperationError]) -> Resolution;
}

impl<F> ErrorResolver for F
where
    F: Fn(&Operation, &[OperationError]) -> Resolution + Send + Sync,
{
    fn resolve(&self, dependency: &Operation, errors: &[OperationError]) -> Resolution {
        self(dependency, errors)
    }
}

/// Gates an operation on one dependency through an [`ErrorResolver`].
///
/// A dependency that finished cleanly always satisfies the condition; the
/// resolver is consulted only when it reported errors.
pub struct ResolvedDependency {
    dependency: Operation,
    resolver: Box<dyn ErrorResolver>,
}

impl ResolvedDependency {
    /// Resolve `dependency`'s errors with `resolver`.
    pub fn new<R>(dependency: Operation, resolver: R) -> Self
    where
        R: ErrorResolver + 'static,
    {
        Self {
            dependency,
            resolver: Box::new(resolver),
        }
    }
}

#[async_trait]
impl Condition for ResolvedDependency {
    fn name(&self) -> String {
        format!("ResolvedDependency({})", self.dependency.name())
    }

    async fn evaluate(&self, _operation: &Operation) -> ConditionResult {
        let dependency = DependencyRef::of(&self.dependency);
        let Some(errors) = self.dependency.errors() else {
            return ConditionResult::Failed(OperationError::DependencyUnfinished(dependency));
        };
        if errors.is_empty() {
            return ConditionResult::Satisfied;
        }
        match self.resolver.resolve(&self.dependency, &errors) {
            Resolution::Proceed => ConditionResult::Satisfied,
            Resolution::Propagate => {
                ConditionResult::Failed(OperationError::DependencyFailed(DependencyFailure {
                    dependency,
                    errors,
                }))
            }
            Resolution::Substitute(error) => ConditionResult::Failed(error),
        }
    }
}
