//! Operation lifecycle states.

use std::fmt;

/// Lifecycle state of an [`Operation`](crate::core::Operation).
///
/// States are ordered; every legal transition moves forward and
/// [`OperationState::Finished`] is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OperationState {
    /// Created, not yet submitted to a queue.
    Initialized,
    /// Submitted; waiting for dependencies before evaluating conditions.
    Pending,
    /// Conditions are being evaluated asynchronously.
    EvaluatingConditions,
    /// Conditions evaluated; may run once dependencies are satisfied.
    Ready,
    /// The task is running.
    Executing,
    /// Finish has begun; observers are being notified.
    Finishing,
    /// Terminal state.
    Finished,
}

impl OperationState {
    /// Return `true` if `self` may transition to `target`.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Initialized, Self::Pending)
                | (Self::Pending, Self::EvaluatingConditions)
                | (Self::EvaluatingConditions, Self::Ready)
                | (Self::Ready, Self::Executing | Self::Finishing)
                | (Self::Executing, Self::Finishing)
                | (Self::Finishing, Self::Finished)
        )
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Initialized => "initialized",
            Self::Pending => "pending",
            Self::EvaluatingConditions => "evaluating_conditions",
            Self::Ready => "ready",
            Self::Executing => "executing",
            Self::Finishing => "finishing",
            Self::Finished => "finished",
        };
        f.write_str(label)
    }
}
