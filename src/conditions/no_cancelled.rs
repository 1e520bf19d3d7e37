use async_trait::async_trait;

use crate::core::condition::{Condition, ConditionResult};
use crate::core::error::{DependencyRef, OperationError};
use crate::core::operation::Operation;

/// Fails if any dependency of the operation was cancelled.
///
/// The failure names exactly the cancelled dependencies, in dependency order.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCancelledDependencies;

impl NoCancelledDependencies {
    /// Create the condition.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Condition for NoCancelledDependencies {
    fn name(&self) -> String {
        "NoCancelledDependencies".to_string()
    }

    async fn evaluate(&self, operation: &Operation) -> ConditionResult {
        let cancelled: Vec<_> = operation
            .dependencies()
            .iter()
            .filter(|dependency| dependency.is_cancelled())
            .map(DependencyRef::of)
            .collect();
        if cancelled.is_empty() {
            ConditionResult::Satisfied
        } else {
            ConditionResult::Failed(OperationError::DependenciesCancelled(cancelled))
        }
    }
}
