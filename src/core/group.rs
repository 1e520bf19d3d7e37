//! Composite operations backed by a private queue.
//!
//! A group runs its children on a private [`OperationQueue`] that is suspended
//! until the group itself executes. Two no-op sentinels frame the sub-graph:
//! every child depends on the starting sentinel, and the finishing sentinel
//! depends on every child, including children produced while the group runs.
//! The group finishes when the finishing sentinel does.

use std::sync::{Arc, OnceLock, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::core::error::OperationError;
use crate::core::operation::{ExecutionContext, Operation, Outcome, Task, WeakOperation};
use crate::core::queue::{OperationQueue, OperationQueueDelegate};
use crate::core::state::OperationState;

/// Customization points for a [`GroupOperation`].
pub trait GroupHooks: Send + Sync {
    /// A child finished with `errors`. Not called for the sentinels.
    fn operation_did_finish(
        &self,
        _group: &GroupOperation,
        _operation: &Operation,
        _errors: &[OperationError],
    ) {
    }

    /// The group is about to finish. No operations may be added from here on.
    fn will_finish(&self, _group: &GroupOperation) {}
}

struct GroupShared {
    queue: OperationQueue,
    starting: Operation,
    finishing: Operation,
    aggregated: Mutex<Vec<OperationError>>,
    hooks: Option<Arc<dyn GroupHooks>>,
    group: OnceLock<WeakOperation>,
    delegate: OnceLock<Arc<GroupDelegate>>,
}

impl GroupShared {
    fn group(self: &Arc<Self>) -> Option<GroupOperation> {
        let operation = self.group.get()?.upgrade()?;
        Some(GroupOperation {
            operation,
            shared: Arc::clone(self),
        })
    }
}

/// An operation that schedules a private sub-graph and finishes with it.
///
/// ```rust,ignore
/// let group = GroupOperation::new(&queue, "sync", vec![download, parse]);
/// queue.submit(group.operation());
/// ```
#[derive(Clone)]
pub struct GroupOperation {
    operation: Operation,
    shared: Arc<GroupShared>,
}

impl GroupOperation {
    /// Create a group running `operations`.
    ///
    /// The private queue shares the worker pool, exclusivity registry and
    /// spawner of `parent`. The group itself still has to be submitted.
    pub fn new(parent: &OperationQueue, name: &str, operations: Vec<Operation>) -> Self {
        Self::build(parent, name, operations, None)
    }

    /// Like [`new`](Self::new), with hooks.
    pub fn with_hooks(
        parent: &OperationQueue,
        name: &str,
        operations: Vec<Operation>,
        hooks: Arc<dyn GroupHooks>,
    ) -> Self {
        Self::build(parent, name, operations, Some(hooks))
    }

    fn build(
        parent: &OperationQueue,
        name: &str,
        operations: Vec<Operation>,
        hooks: Option<Arc<dyn GroupHooks>>,
    ) -> Self {
        let queue = OperationQueue::new(
            format!("{name}.internal"),
            Arc::clone(parent.pool()),
            Arc::clone(parent.exclusivity()),
            parent.spawner(),
        );
        queue.suspend();

        let shared = Arc::new(GroupShared {
            queue,
            starting: Operation::noop(format!("{name}.starting")),
            finishing: Operation::noop(format!("{name}.finishing")),
            aggregated: Mutex::new(Vec::new()),
            hooks,
            group: OnceLock::new(),
            delegate: OnceLock::new(),
        });

        let delegate = Arc::new(GroupDelegate {
            shared: Arc::downgrade(&shared),
        });
        shared.queue.set_delegate(&delegate);
        let _ = shared.delegate.set(delegate);

        shared.queue.submit(&shared.starting);
        for operation in &operations {
            shared.queue.submit(operation);
        }

        let operation = Operation::new(
            name,
            GroupTask {
                shared: Arc::clone(&shared),
            },
        );
        let _ = shared.group.set(operation.downgrade());

        Self { operation, shared }
    }

    /// The schedulable operation representing the group.
    #[must_use]
    pub const fn operation(&self) -> &Operation {
        &self.operation
    }

    /// The private queue running the children.
    #[must_use]
    pub fn internal_queue(&self) -> &OperationQueue {
        &self.shared.queue
    }

    /// Add a child.
    ///
    /// # Panics
    ///
    /// Panics once the finishing sentinel has started evaluating.
    pub fn add_operation(&self, operation: &Operation) {
        self.shared.queue.submit(operation);
    }

    /// Record an error to be reported when the group finishes.
    pub fn aggregate_error(&self, error: OperationError) {
        self.shared.aggregated.lock().push(error);
    }
}

impl std::fmt::Debug for GroupOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupOperation")
            .field("operation", &self.operation)
            .field("queue", &self.shared.queue)
            .finish()
    }
}

struct GroupTask {
    shared: Arc<GroupShared>,
}

#[async_trait]
impl Task for GroupTask {
    async fn execute(&self, _ctx: ExecutionContext) -> Outcome {
        self.shared.queue.resume();
        self.shared.queue.submit(&self.shared.finishing);
        Outcome::Deferred
    }

    fn will_cancel(&self, operation: &Operation) {
        debug!(group = %operation.name(), "cancelling group children");
        for child in self.shared.queue.operations() {
            if child != self.shared.finishing {
                child.cancel();
            }
        }
    }
}

struct GroupDelegate {
    shared: Weak<GroupShared>,
}

impl OperationQueueDelegate for GroupDelegate {
    fn will_add_operation(&self, _queue: &OperationQueue, operation: &Operation) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        assert!(
            shared.finishing.state() < OperationState::EvaluatingConditions,
            "cannot add `{}` to a group that has already completed",
            operation.name()
        );
        if *operation != shared.finishing {
            shared.finishing.add_dependency(operation);
        }
        if *operation != shared.starting {
            operation.add_dependency(&shared.starting);
        }
    }

    fn operation_did_finish(
        &self,
        queue: &OperationQueue,
        operation: &Operation,
        errors: &[OperationError],
    ) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        shared.aggregated.lock().extend_from_slice(errors);

        if *operation == shared.finishing {
            queue.suspend();
            let Some(group) = shared.group() else {
                return;
            };
            if let Some(hooks) = &shared.hooks {
                hooks.will_finish(&group);
            }
            let aggregated = shared.aggregated.lock().clone();
            debug!(group = %group.operation.name(), errors = aggregated.len(), "group finishing");
            group.operation.finish(aggregated);
        } else if *operation != shared.starting {
            if let (Some(hooks), Some(group)) = (&shared.hooks, shared.group()) {
                hooks.operation_did_finish(&group, operation, errors);
            }
        }
    }
}
