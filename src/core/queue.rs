//! The operation queue and its enqueue pipeline.
//!
//! Submission wires every implicit dependency of an operation (vital
//! barriers, condition companions, exclusivity chains) before the operation
//! is allowed to leave [`OperationState::Initialized`]. After that the queue
//! only reacts to readiness pushes from its operations and dispatches those
//! that report ready to the [`WorkerPool`].
//!
//! [`OperationState::Initialized`]: crate::core::OperationState::Initialized

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::core::error::OperationError;
use crate::core::exclusivity::ExclusivityController;
use crate::core::observer::{BlockObserver, Observer};
use crate::core::operation::{Operation, Scheduling};
use crate::core::spawn::Spawn;
use crate::core::worker_pool::WorkerPool;

/// Receives queue-level notifications.
///
/// A queue holds its delegate weakly.
pub trait OperationQueueDelegate: Send + Sync {
    /// `operation` passed the enqueue pipeline and is about to become pending.
    fn will_add_operation(&self, _queue: &OperationQueue, _operation: &Operation) {}

    /// `operation` is finishing with `errors`.
    fn operation_did_finish(
        &self,
        _queue: &OperationQueue,
        _operation: &Operation,
        _errors: &[OperationError],
    ) {
    }
}

/// A hook run for every extended operation submitted to a queue.
///
/// Unlike the delegate, any number of modules can be installed.
pub trait EnqueuingModule: Send + Sync {
    /// Called during submission, after dependencies have been wired.
    fn will_enqueue(&self, operation: &Operation, queue: &OperationQueue);

    /// Called when `operation` is finishing.
    fn did_finish(&self, _operation: &Operation, _errors: &[OperationError], _queue: &OperationQueue) {
    }
}

impl<F> EnqueuingModule for F
where
    F: Fn(&Operation, &OperationQueue) + Send + Sync,
{
    fn will_enqueue(&self, operation: &Operation, queue: &OperationQueue) {
        self(operation, queue);
    }
}

struct QueueShared {
    name: String,
    pool: Arc<WorkerPool>,
    exclusivity: Arc<ExclusivityController>,
    spawner: Arc<dyn Spawn>,
    operations: Mutex<Vec<Operation>>,
    vitals: Mutex<Vec<Operation>>,
    modules: RwLock<Vec<Arc<dyn EnqueuingModule>>>,
    delegate: RwLock<Option<Weak<dyn OperationQueueDelegate>>>,
    suspended: AtomicBool,
}

/// Schedules operations onto a [`WorkerPool`].
///
/// Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct OperationQueue {
    shared: Arc<QueueShared>,
}

impl OperationQueue {
    /// Create a running queue.
    pub fn new(
        name: impl Into<String>,
        pool: Arc<WorkerPool>,
        exclusivity: Arc<ExclusivityController>,
        spawner: Arc<dyn Spawn>,
    ) -> Self {
        Self {
            shared: Arc::new(QueueShared {
                name: name.into(),
                pool,
                exclusivity,
                spawner,
                operations: Mutex::new(Vec::new()),
                vitals: Mutex::new(Vec::new()),
                modules: RwLock::new(Vec::new()),
                delegate: RwLock::new(None),
                suspended: AtomicBool::new(false),
            }),
        }
    }

    fn from_weak(weak: &Weak<QueueShared>) -> Option<Self> {
        weak.upgrade().map(|shared| Self { shared })
    }

    /// Queue name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Worker pool backing this queue.
    #[must_use]
    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.shared.pool
    }

    /// Exclusivity registry used by this queue.
    #[must_use]
    pub fn exclusivity(&self) -> &Arc<ExclusivityController> {
        &self.shared.exclusivity
    }

    pub(crate) fn spawner(&self) -> Arc<dyn Spawn> {
        Arc::clone(&self.shared.spawner)
    }

    /// Operations submitted and not yet finished.
    #[must_use]
    pub fn operations(&self) -> Vec<Operation> {
        self.shared.operations.lock().clone()
    }

    /// Install a delegate. The queue keeps only a weak reference.
    pub fn set_delegate<D>(&self, delegate: &Arc<D>)
    where
        D: OperationQueueDelegate + 'static,
    {
        let delegate: Arc<dyn OperationQueueDelegate> = Arc::clone(delegate) as _;
        *self.shared.delegate.write() = Some(Arc::downgrade(&delegate));
    }

    /// Remove the delegate.
    pub fn clear_delegate(&self) {
        *self.shared.delegate.write() = None;
    }

    fn delegate(&self) -> Option<Arc<dyn OperationQueueDelegate>> {
        self.shared.delegate.read().as_ref().and_then(Weak::upgrade)
    }

    /// Install an enqueuing module.
    pub fn add_enqueuing_module<M>(&self, module: M)
    where
        M: EnqueuingModule + 'static,
    {
        self.shared.modules.write().push(Arc::new(module));
    }

    fn modules(&self) -> Vec<Arc<dyn EnqueuingModule>> {
        self.shared.modules.read().clone()
    }

    /// Stop dispatching. Submissions are still accepted.
    pub fn suspend(&self) {
        if !self.shared.suspended.swap(true, Ordering::AcqRel) {
            debug!(queue = %self.shared.name, "queue suspended");
        }
    }

    /// Resume dispatching and re-check every held operation.
    pub fn resume(&self) {
        if self.shared.suspended.swap(false, Ordering::AcqRel) {
            debug!(queue = %self.shared.name, "queue resumed");
        }
        for operation in self.operations() {
            self.poll(&operation);
        }
    }

    /// `true` while suspended.
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.shared.suspended.load(Ordering::Acquire)
    }

    /// Cancel every operation currently held.
    pub fn cancel_all(&self) {
        for operation in self.operations() {
            operation.cancel();
        }
    }

    /// Register `operation` as vital without submitting it.
    ///
    /// Every operation submitted afterwards depends on it until it finishes.
    /// The vital operation itself may run on any queue.
    pub fn add_vital(&self, operation: &Operation) {
        self.shared.vitals.lock().push(operation.clone());
        let weak = Arc::downgrade(&self.shared);
        operation.on_completion(move |finished| {
            if let Some(shared) = weak.upgrade() {
                shared.vitals.lock().retain(|vital| vital != finished);
            }
        });
    }

    /// Register `operation` as vital and submit it.
    ///
    /// # Panics
    ///
    /// See [`submit`](Self::submit).
    pub fn submit_vital(&self, operation: &Operation) {
        self.add_vital(operation);
        self.submit(operation);
    }

    /// Submit several operations in order.
    ///
    /// # Panics
    ///
    /// See [`submit`](Self::submit).
    pub fn submit_all<'a, I>(&self, operations: I)
    where
        I: IntoIterator<Item = &'a Operation>,
    {
        for operation in operations {
            self.submit(operation);
        }
    }

    /// Submit `operation`.
    ///
    /// Wires vital dependencies, the queue observer, condition companion
    /// operations, exclusivity and enqueuing modules, in that order, and only
    /// then moves the operation to pending.
    ///
    /// # Panics
    ///
    /// Panics if `operation` was already submitted to any queue.
    pub fn submit(&self, operation: &Operation) {
        debug!(queue = %self.shared.name, operation = %operation.name(), "submitting operation");

        {
            let vitals = self.shared.vitals.lock();
            for vital in vitals.iter().filter(|vital| *vital != operation) {
                operation.add_dependency(vital);
            }
        }

        if operation.is_plain() {
            self.track_plain(operation);
        } else {
            self.wire_extended(operation);
        }

        self.shared.operations.lock().push(operation.clone());
        let weak = Arc::downgrade(&self.shared);
        operation.on_completion(move |finished| {
            if let Some(shared) = weak.upgrade() {
                shared.operations.lock().retain(|held| held != finished);
            }
        });

        if let Some(delegate) = self.delegate() {
            delegate.will_add_operation(self, operation);
        }

        let readiness_queue = Arc::downgrade(&self.shared);
        operation.will_enqueue(Scheduling {
            readiness: Arc::new(move |ready: &Operation| {
                if let Some(queue) = Self::from_weak(&readiness_queue) {
                    queue.poll(ready);
                }
            }),
            spawner: Arc::clone(&self.shared.spawner),
        });

        self.poll(operation);
    }

    fn track_plain(&self, operation: &Operation) {
        let weak = Arc::downgrade(&self.shared);
        operation.on_completion(move |finished| {
            let Some(queue) = Self::from_weak(&weak) else {
                return;
            };
            if let Some(delegate) = queue.delegate() {
                delegate.operation_did_finish(&queue, finished, &[]);
            }
        });
    }

    fn wire_extended(&self, operation: &Operation) {
        operation.add_observer(QueueObserver {
            queue: Arc::downgrade(&self.shared),
        });

        for condition in operation.conditions() {
            if let Some(companion) = condition.dependency_for(operation) {
                debug!(operation = %operation.name(), companion = %companion.name(), condition = %condition.name(), "submitting condition dependency");
                operation.add_dependency(&companion);
                self.submit(&companion);
            }
        }

        let categories = operation.exclusivity_categories();
        if !categories.is_empty() {
            self.shared.exclusivity.register(operation, &categories);
            let controller = Arc::clone(&self.shared.exclusivity);
            operation.add_observer(BlockObserver::new().on_finish(move |finished, _| {
                controller.unregister(finished, &categories);
            }));
        }

        for module in self.modules() {
            module.will_enqueue(operation, self);
        }
    }

    /// Dispatch `operation` if it reports ready.
    fn poll(&self, operation: &Operation) {
        if self.is_suspended() {
            return;
        }
        if !operation.is_ready() || !operation.claim_dispatch() {
            return;
        }
        if let Err(err) = self.shared.pool.dispatch(operation.clone()) {
            warn!(queue = %self.shared.name, operation = %operation.name(), error = %err, "dispatch failed, cancelling operation");
            operation.cancel_with(OperationError::Scheduling(err.to_string()));
            operation.finish_cancelled();
        }
    }

    fn operation_did_finish(&self, operation: &Operation, errors: &[OperationError]) {
        if let Some(delegate) = self.delegate() {
            delegate.operation_did_finish(self, operation, errors);
        }
        for module in self.modules() {
            module.did_finish(operation, errors, self);
        }
    }
}

impl fmt::Debug for OperationQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationQueue")
            .field("name", &self.shared.name)
            .field("operations", &self.shared.operations.lock().len())
            .field("suspended", &self.is_suspended())
            .finish_non_exhaustive()
    }
}

/// Installed on every extended operation a queue accepts.
struct QueueObserver {
    queue: Weak<QueueShared>,
}

impl Observer for QueueObserver {
    fn did_produce(&self, _operation: &Operation, produced: &Operation) {
        if let Some(queue) = OperationQueue::from_weak(&self.queue) {
            queue.submit(produced);
        }
    }

    fn did_finish(&self, operation: &Operation, errors: &[OperationError]) {
        if let Some(queue) = OperationQueue::from_weak(&self.queue) {
            queue.operation_did_finish(operation, errors);
        }
    }
}
