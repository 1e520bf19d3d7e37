use async_trait::async_trait;

use crate::core::condition::{Condition, ConditionResult};
use crate::core::operation::Operation;

/// Evaluates the wrapped condition without its companion operation.
///
/// Useful when the companion would prompt or otherwise act on its own and
/// only the check itself is wanted.
#[derive(Debug, Clone)]
pub struct SilentCondition<C> {
    inner: C,
}

impl<C> SilentCondition<C>
where
    C: Condition,
{
    /// Wrap `inner`.
    pub const fn new(inner: C) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<C> Condition for SilentCondition<C>
where
    C: Condition,
{
    fn name(&self) -> String {
        format!("Silent<{}>", self.inner.name())
    }

    async fn evaluate(&self, operation: &Operation) -> ConditionResult {
        self.inner.evaluate(operation).await
    }
}
