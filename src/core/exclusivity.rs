//! Mutual exclusion registry.
//!
//! Operations sharing a category run one at a time, in registration order.
//! Registration chains each new operation onto the previous member of the
//! category with an ordinary dependency, so FIFO order falls out of the
//! readiness protocol.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;

use crate::core::operation::Operation;

/// A value naming a mutual-exclusion category.
///
/// Strings are used as-is. Enum categories typically render as
/// `"Type:variant"` so that variants of different enums never collide:
///
/// ```rust
/// use prometheus_operations::core::ExclusivityCategory;
///
/// enum Alert { Modal }
///
/// impl ExclusivityCategory for Alert {
///     fn category_identifier(&self) -> String {
///         match self {
///             Alert::Modal => "Alert:modal".to_string(),
///         }
///     }
/// }
/// ```
pub trait ExclusivityCategory {
    /// String identifier of the category.
    fn category_identifier(&self) -> String;
}

impl ExclusivityCategory for str {
    fn category_identifier(&self) -> String {
        self.to_string()
    }
}

impl ExclusivityCategory for String {
    fn category_identifier(&self) -> String {
        self.clone()
    }
}

/// Registry of in-flight operations per exclusivity category.
///
/// One instance is shared by every queue that must observe the same
/// exclusivity rules; [`GroupOperation`](crate::core::GroupOperation) private
/// queues share their parent's instance.
#[derive(Default)]
pub struct ExclusivityController {
    categories: Mutex<HashMap<String, Vec<Operation>>>,
}

impl ExclusivityController {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `operation` to each category, depending on the previous member.
    ///
    /// Completes before returning; the queue calls this before the operation
    /// can be observed as schedulable.
    pub fn register(&self, operation: &Operation, categories: &[String]) {
        let mut map = self.categories.lock();
        for category in categories {
            let members = map.entry(category.clone()).or_default();
            if let Some(previous) = members.last() {
                debug!(operation = %operation.name(), previous = %previous.name(), %category, "chaining exclusive operation");
                operation.add_dependency(previous);
            }
            members.push(operation.clone());
        }
    }

    /// Remove `operation` from each category.
    pub fn unregister(&self, operation: &Operation, categories: &[String]) {
        let mut map = self.categories.lock();
        for category in categories {
            if let Some(members) = map.get_mut(category) {
                members.retain(|member| member != operation);
                if members.is_empty() {
                    map.remove(category);
                }
            }
        }
    }

    /// In-flight members of `category`, in registration order.
    #[must_use]
    pub fn members(&self, category: &str) -> Vec<Operation> {
        self.categories
            .lock()
            .get(category)
            .cloned()
            .unwrap_or_default()
    }
}
