//! Sample condition policies built on the condition protocol.
//!
//! These are ordinary [`Condition`](crate::core::Condition) implementations;
//! applications are expected to write their own alongside them.

mod no_cancelled;
mod no_failed;
mod resolver;
mod silent;

pub use no_cancelled::NoCancelledDependencies;
pub use no_failed::{NoFailedDependencies, NoFailedDependency};
pub use resolver::{ErrorResolver, Resolution, ResolvedDependency};
pub use silent::SilentCondition;
