use async_trait::async_trait;

use crate::core::condition::{Condition, ConditionResult};
use crate::core::error::{DependencyFailure, DependencyRef, OperationError};
use crate::core::operation::{ErrorPurpose, Operation};

fn relevant_errors(
    dependency: &Operation,
    errors: Vec<OperationError>,
    significant_only: bool,
) -> Vec<OperationError> {
    if significant_only {
        errors
            .into_iter()
            .filter(|error| dependency.error_purpose(error) == ErrorPurpose::Fatal)
            .collect()
    } else {
        errors
    }
}

/// Fails if any dependency finished with errors.
///
/// By default every dependency error counts. With
/// [`significant_only`](Self::significant_only) only errors the dependency's
/// [`ErrorInformer`](crate::core::ErrorInformer) classifies as fatal do.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFailedDependencies {
    significant_only: bool,
}

impl NoFailedDependencies {
    /// Treat every dependency error as fatal.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            significant_only: false,
        }
    }

    /// Ignore dependency errors classified as informative.
    #[must_use]
    pub const fn significant_only() -> Self {
        Self {
            significant_only: true,
        }
    }
}

#[async_trait]
impl Condition for NoFailedDependencies {
    fn name(&self) -> String {
        "NoFailedDependencies".to_string()
    }

    async fn evaluate(&self, operation: &Operation) -> ConditionResult {
        let failures: Vec<_> = operation
            .dependencies()
            .iter()
            .filter_map(|dependency| {
                let errors = dependency.errors().unwrap_or_default();
                let errors = relevant_errors(dependency, errors, self.significant_only);
                (!errors.is_empty()).then(|| DependencyFailure {
                    dependency: DependencyRef::of(dependency),
                    errors,
                })
            })
            .collect();
        if failures.is_empty() {
            ConditionResult::Satisfied
        } else {
            ConditionResult::Failed(OperationError::DependenciesFailed(failures))
        }
    }
}

/// Fails if one specific dependency finished with errors.
///
/// Attached by [`Operation::add_dependency_with`] when success is expected.
#[derive(Debug, Clone)]
pub struct NoFailedDependency {
    dependency: Operation,
    significant_only: bool,
}

impl NoFailedDependency {
    /// Watch `dependency`. It must also be a dependency of the host operation.
    #[must_use]
    pub const fn new(dependency: Operation) -> Self {
        Self {
            dependency,
            significant_only: false,
        }
    }

    /// Ignore errors classified as informative.
    #[must_use]
    pub const fn significant_only(mut self) -> Self {
        self.significant_only = true;
        self
    }
}

#[async_trait]
impl Condition for NoFailedDependency {
    fn name(&self) -> String {
        format!("NoFailedDependency({})", self.dependency.name())
    }

    async fn evaluate(&self, _operation: &Operation) -> ConditionResult {
        let Some(errors) = self.dependency.errors() else {
            return ConditionResult::Failed(OperationError::DependencyUnfinished(
                DependencyRef::of(&self.dependency),
            ));
        };
        let errors = relevant_errors(&self.dependency, errors, self.significant_only);
        if errors.is_empty() {
            ConditionResult::Satisfied
        } else {
            ConditionResult::Failed(OperationError::DependencyFailed(DependencyFailure {
                dependency: DependencyRef::of(&self.dependency),
                errors,
            }))
        }
    }
}
