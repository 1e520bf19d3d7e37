//! The operation state machine and readiness protocol.
//!
//! An [`Operation`] is a schedulable, cancellable unit of work. Its behaviour
//! comes from a held [`Task`] strategy; its scheduling is driven by the
//! [`OperationQueue`](crate::core::OperationQueue) that owns it.
//!
//! # Locking
//!
//! The state field is guarded by a short critical section around the read or
//! write only. Every notification that follows a state change (readiness
//! checks, dependents, completion callbacks, observers) runs after that lock is
//! released, because those notifications re-enter [`Operation::is_ready`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, error, trace};
use uuid::Uuid;

use crate::conditions::{NoFailedDependency, ResolvedDependency};
use crate::core::condition::{Condition, ConditionEvaluator};
use crate::core::error::OperationError;
use crate::core::exclusivity::ExclusivityCategory;
use crate::core::observer::{Observer, ObserverBuilder};
use crate::core::spawn::Spawn;
use crate::core::state::OperationState;
use crate::conditions::ErrorResolver;

/// Unique identity of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OperationId(Uuid);

impl OperationId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Result of running a [`Task`].
#[derive(Debug)]
pub enum Outcome {
    /// The work completed without errors.
    Success,
    /// The work completed with errors.
    Failure(Vec<OperationError>),
    /// The task will finish later through [`ExecutionContext::finish`].
    Deferred,
}

impl From<Result<(), OperationError>> for Outcome {
    fn from(result: Result<(), OperationError>) -> Self {
        match result {
            Ok(()) => Self::Success,
            Err(error) => Self::Failure(vec![error]),
        }
    }
}

/// The work an operation performs.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use prometheus_operations::core::{ExecutionContext, Outcome, Task};
///
/// struct Download { url: String }
///
/// #[async_trait]
/// impl Task for Download {
///     async fn execute(&self, ctx: ExecutionContext) -> Outcome {
///         if ctx.is_cancelled() {
///             return Outcome::Success;
///         }
///         fetch(&self.url).await.into()
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Run the work. Called at most once, on a worker thread.
    async fn execute(&self, ctx: ExecutionContext) -> Outcome;

    /// Called when the operation is about to finish, before observers.
    fn finished(&self, _operation: &Operation, _errors: &[OperationError]) {}

    /// Called when the operation is cancelled, before the flag is set.
    fn will_cancel(&self, _operation: &Operation) {}
}

/// Whether an error should block dependents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPurpose {
    /// The error blocks dependents that expect success.
    Fatal,
    /// The error is informational only.
    Informative,
}

/// Classifies the errors an operation reports.
pub trait ErrorInformer: Send + Sync {
    /// Decide whether `error` is fatal.
    fn purpose(&self, error: &OperationError) -> ErrorPurpose;
}

impl<F> ErrorInformer for F
where
    F: Fn(&OperationError) -> ErrorPurpose + Send + Sync,
{
    fn purpose(&self, error: &OperationError) -> ErrorPurpose {
        self(error)
    }
}

/// Options for [`Operation::add_dependency_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DependencyOptions {
    expect_success: bool,
    significant_only: bool,
}

impl DependencyOptions {
    /// Fail if the dependency finishes with any error.
    #[must_use]
    pub const fn expect_success() -> Self {
        Self {
            expect_success: true,
            significant_only: false,
        }
    }

    /// Only errors the dependency's [`ErrorInformer`] marks fatal count.
    #[must_use]
    pub const fn significant_only(mut self) -> Self {
        self.significant_only = true;
        self
    }
}

type ReadinessHook = Arc<dyn Fn(&Operation) + Send + Sync>;
type CompletionCallback = Box<dyn FnOnce(&Operation) + Send>;

/// Hooks installed by the owning queue when the operation is submitted.
#[derive(Clone)]
pub(crate) struct Scheduling {
    pub(crate) readiness: ReadinessHook,
    pub(crate) spawner: Arc<dyn Spawn>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Extended,
    Plain,
}

struct Inner {
    id: OperationId,
    name: String,
    kind: Kind,
    task: Arc<dyn Task>,
    state: Mutex<OperationState>,
    cancelled: AtomicBool,
    has_finished: AtomicBool,
    dispatched: AtomicBool,
    dependencies: Mutex<Vec<Operation>>,
    dependents: Mutex<Vec<Weak<Inner>>>,
    conditions: Mutex<Vec<Arc<dyn Condition>>>,
    observers: Mutex<Vec<Arc<dyn Observer>>>,
    exclusivity: Mutex<Vec<String>>,
    internal_errors: Mutex<Vec<OperationError>>,
    combined_errors: OnceLock<Vec<OperationError>>,
    error_informer: Mutex<Option<Arc<dyn ErrorInformer>>>,
    scheduling: Mutex<Option<Scheduling>>,
    /// `None` once the completion callbacks have run.
    completion: Mutex<Option<Vec<CompletionCallback>>>,
}

/// A schedulable unit of work with its own readiness state machine.
///
/// `Operation` is a cheap handle; clones refer to the same operation.
/// Equality and hashing use the operation's identity.
#[derive(Clone)]
pub struct Operation {
    inner: Arc<Inner>,
}

/// A non-owning reference to an [`Operation`].
#[derive(Clone)]
pub struct WeakOperation {
    inner: Weak<Inner>,
}

impl WeakOperation {
    /// Upgrade to an [`Operation`] if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Operation> {
        self.inner.upgrade().map(|inner| Operation { inner })
    }
}

impl Operation {
    /// Create an operation driven by `task`.
    pub fn new(name: impl Into<String>, task: impl Task) -> Self {
        Self::with_kind(name.into(), Arc::new(task), Kind::Extended)
    }

    /// Create an operation from a synchronous closure.
    pub fn from_fn<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&ExecutionContext) -> Outcome + Send + Sync + 'static,
    {
        Self::new(name, FnTask { f })
    }

    /// Create an operation that succeeds without doing anything.
    pub fn noop(name: impl Into<String>) -> Self {
        Self::from_fn(name, |_| Outcome::Success)
    }

    /// Create a minimally tracked work item.
    ///
    /// The queue honours vital barriers for plain work and reports its
    /// completion with an empty error list, but installs no observers,
    /// condition dependencies, exclusivity or enqueuing modules for it.
    pub fn plain<F>(name: impl Into<String>, work: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let work: Box<dyn FnOnce() + Send> = Box::new(work);
        let task = PlainTask {
            work: Mutex::new(Some(work)),
        };
        Self::with_kind(name.into(), Arc::new(task), Kind::Plain)
    }

    fn with_kind(name: String, task: Arc<dyn Task>, kind: Kind) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: OperationId::new(),
                name,
                kind,
                task,
                state: Mutex::new(OperationState::Initialized),
                cancelled: AtomicBool::new(false),
                has_finished: AtomicBool::new(false),
                dispatched: AtomicBool::new(false),
                dependencies: Mutex::new(Vec::new()),
                dependents: Mutex::new(Vec::new()),
                conditions: Mutex::new(Vec::new()),
                observers: Mutex::new(Vec::new()),
                exclusivity: Mutex::new(Vec::new()),
                internal_errors: Mutex::new(Vec::new()),
                combined_errors: OnceLock::new(),
                error_informer: Mutex::new(None),
                scheduling: Mutex::new(None),
                completion: Mutex::new(Some(Vec::new())),
            }),
        }
    }

    /// Unique identity.
    #[must_use]
    pub fn id(&self) -> OperationId {
        self.inner.id
    }

    /// Human-readable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> OperationState {
        *self.inner.state.lock()
    }

    /// `true` once [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// `true` while the task is running.
    #[must_use]
    pub fn is_executing(&self) -> bool {
        self.state() == OperationState::Executing
    }

    /// `true` once the operation reached its terminal state.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state() == OperationState::Finished
    }

    /// `true` for work created with [`Operation::plain`].
    #[must_use]
    pub fn is_plain(&self) -> bool {
        self.inner.kind == Kind::Plain
    }

    /// A non-owning handle to this operation.
    #[must_use]
    pub fn downgrade(&self) -> WeakOperation {
        WeakOperation {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Snapshot of the dependencies, in insertion order.
    #[must_use]
    pub fn dependencies(&self) -> Vec<Self> {
        self.inner.dependencies.lock().clone()
    }

    /// The final error list.
    ///
    /// Returns `None` until the operation is finished. Observers run just
    /// before the terminal transition, so they receive the list as an argument
    /// instead of reading it here.
    #[must_use]
    pub fn errors(&self) -> Option<Vec<OperationError>> {
        if self.is_finished() {
            self.inner.combined_errors.get().cloned()
        } else {
            None
        }
    }

    // ------------------------------------------------------------------
    // Composition
    // ------------------------------------------------------------------

    /// Make `self` wait for `dependency` to finish.
    ///
    /// # Panics
    ///
    /// Panics if condition evaluation has already begun, or if `dependency`
    /// is `self`.
    pub fn add_dependency(&self, dependency: &Self) {
        self.assert_before(
            OperationState::EvaluatingConditions,
            "dependencies cannot be modified after condition evaluation has begun",
        );
        assert!(
            dependency.id() != self.id(),
            "operation `{}` cannot depend on itself",
            self.name()
        );
        dependency
            .inner
            .dependents
            .lock()
            .push(Arc::downgrade(&self.inner));
        self.inner.dependencies.lock().push(dependency.clone());
    }

    /// Add a dependency with extra semantics.
    ///
    /// With [`DependencyOptions::expect_success`] a [`NoFailedDependency`]
    /// condition is attached, so `self` fails when `dependency` does.
    pub fn add_dependency_with(&self, dependency: &Self, options: DependencyOptions) {
        self.add_dependency(dependency);
        if options.expect_success {
            let condition = NoFailedDependency::new(dependency.clone());
            let condition = if options.significant_only {
                condition.significant_only()
            } else {
                condition
            };
            self.add_condition(condition);
        }
    }

    /// Add a dependency whose errors are mapped through `resolver`.
    pub fn add_dependency_resolving<R>(&self, dependency: &Self, resolver: R)
    where
        R: ErrorResolver + 'static,
    {
        self.add_dependency(dependency);
        self.add_condition(ResolvedDependency::new(dependency.clone(), resolver));
    }

    /// Attach a condition that must be satisfied before execution.
    ///
    /// # Panics
    ///
    /// Panics if condition evaluation has already begun or the operation is
    /// plain work.
    pub fn add_condition<C>(&self, condition: C)
    where
        C: Condition + 'static,
    {
        self.add_condition_arc(Arc::new(condition));
    }

    /// Attach a shared condition.
    ///
    /// # Panics
    ///
    /// See [`add_condition`](Self::add_condition).
    pub fn add_condition_arc(&self, condition: Arc<dyn Condition>) {
        assert!(
            !self.is_plain(),
            "plain work `{}` does not support conditions",
            self.name()
        );
        self.assert_before(
            OperationState::EvaluatingConditions,
            "conditions cannot be modified after condition evaluation has begun",
        );
        self.inner.conditions.lock().push(condition);
    }

    /// Attach an observer.
    ///
    /// # Panics
    ///
    /// Panics if execution has already begun.
    pub fn add_observer<O>(&self, observer: O)
    where
        O: Observer + 'static,
    {
        self.add_observer_arc(Arc::new(observer));
    }

    /// Attach a shared observer.
    ///
    /// # Panics
    ///
    /// Panics if execution has already begun.
    pub fn add_observer_arc(&self, observer: Arc<dyn Observer>) {
        self.assert_before(
            OperationState::Executing,
            "observers cannot be modified after execution has begun",
        );
        self.inner.observers.lock().push(observer);
    }

    /// Register closures for lifecycle events.
    ///
    /// ```rust,ignore
    /// operation.observe(|o| {
    ///     o.did_start(|| tracing::info!("started"));
    ///     o.did_fail(|errors| tracing::warn!(count = errors.len(), "failed"));
    /// });
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if execution has already begun.
    pub fn observe<F>(&self, build: F)
    where
        F: FnOnce(&mut ObserverBuilder),
    {
        let mut builder = ObserverBuilder::default();
        build(&mut builder);
        self.add_observer(builder.build());
    }

    /// Declare that `self` must not run concurrently with other operations
    /// of `category`.
    ///
    /// # Panics
    ///
    /// Panics if condition evaluation has already begun or the operation is
    /// plain work.
    pub fn set_mutually_exclusive<C>(&self, category: &C)
    where
        C: ExclusivityCategory + ?Sized,
    {
        assert!(
            !self.is_plain(),
            "plain work `{}` does not support exclusivity",
            self.name()
        );
        self.assert_before(
            OperationState::EvaluatingConditions,
            "exclusivity cannot be modified after condition evaluation has begun",
        );
        self.inner.exclusivity.lock().push(category.category_identifier());
    }

    /// Classify this operation's errors for significance-aware dependents.
    pub fn set_error_informer<I>(&self, informer: I)
    where
        I: ErrorInformer + 'static,
    {
        *self.inner.error_informer.lock() = Some(Arc::new(informer));
    }

    /// Purpose of `error` as reported by this operation's informer.
    /// Without an informer every error is [`ErrorPurpose::Fatal`].
    #[must_use]
    pub fn error_purpose(&self, error: &OperationError) -> ErrorPurpose {
        let informer = self.inner.error_informer.lock().clone();
        informer.map_or(ErrorPurpose::Fatal, |informer| informer.purpose(error))
    }

    pub(crate) fn conditions(&self) -> Vec<Arc<dyn Condition>> {
        self.inner.conditions.lock().clone()
    }

    pub(crate) fn exclusivity_categories(&self) -> Vec<String> {
        self.inner.exclusivity.lock().clone()
    }

    /// Run `callback` once the operation reaches [`OperationState::Finished`].
    /// Runs immediately if it already has.
    pub(crate) fn on_completion<F>(&self, callback: F)
    where
        F: FnOnce(&Self) + Send + 'static,
    {
        let mut pending = self.inner.completion.lock();
        if let Some(callbacks) = pending.as_mut() {
            callbacks.push(Box::new(callback));
            return;
        }
        drop(pending);
        callback(self);
    }

    fn assert_before(&self, limit: OperationState, message: &str) {
        let state = self.state();
        assert!(
            state < limit,
            "{message} (operation `{}` is {state})",
            self.name()
        );
    }

    // ------------------------------------------------------------------
    // State machine
    // ------------------------------------------------------------------

    fn transition(&self, target: OperationState) {
        {
            let mut state = self.inner.state.lock();
            if *state == OperationState::Finished {
                return;
            }
            let legal = state.can_transition_to(target);
            debug_assert!(
                legal,
                "invalid state transition {} -> {target} for `{}`",
                *state,
                self.inner.name
            );
            if !legal {
                error!(operation = %self.inner.name, from = %*state, to = %target, "ignoring invalid state transition");
                return;
            }
            *state = target;
        }
        self.state_did_change(target);
    }

    fn try_transition(&self, from: OperationState, to: OperationState) -> bool {
        {
            let mut state = self.inner.state.lock();
            if *state != from {
                return false;
            }
            *state = to;
        }
        self.state_did_change(to);
        true
    }

    fn state_did_change(&self, state: OperationState) {
        trace!(operation = %self.inner.name, %state, "state changed");
        match state {
            OperationState::Ready => self.request_readiness_check(),
            OperationState::Finished => self.did_reach_finished(),
            _ => {}
        }
    }

    fn did_reach_finished(&self) {
        let callbacks = self.inner.completion.lock().take().unwrap_or_default();
        for callback in callbacks {
            callback(self);
        }
        let dependents: Vec<_> = self
            .inner
            .dependents
            .lock()
            .iter()
            .filter_map(Weak::upgrade)
            .collect();
        for inner in dependents {
            Self { inner }.request_readiness_check();
        }
    }

    /// Ask the owning queue to re-query readiness.
    pub(crate) fn request_readiness_check(&self) {
        let hook = self
            .inner
            .scheduling
            .lock()
            .as_ref()
            .map(|scheduling| Arc::clone(&scheduling.readiness));
        if let Some(hook) = hook {
            hook(self);
        }
    }

    fn dependencies_satisfied(&self) -> bool {
        self.dependencies().iter().all(Self::is_finished)
    }

    /// Whether a worker may pick this operation up.
    ///
    /// Derived from the current state on every call. In the pending state,
    /// satisfied dependencies start condition evaluation as a side effect and
    /// the operation reports not-ready until evaluation completes.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        match self.state() {
            OperationState::Initialized => self.is_cancelled(),
            OperationState::Pending => {
                if self.is_cancelled() {
                    return true;
                }
                if self.dependencies_satisfied() {
                    self.evaluate_conditions();
                }
                false
            }
            OperationState::Ready => self.is_cancelled() || self.dependencies_satisfied(),
            OperationState::EvaluatingConditions
            | OperationState::Executing
            | OperationState::Finishing
            | OperationState::Finished => false,
        }
    }

    fn evaluate_conditions(&self) {
        if !self.try_transition(
            OperationState::Pending,
            OperationState::EvaluatingConditions,
        ) {
            return;
        }
        let conditions = self.conditions();
        if conditions.is_empty() {
            self.transition(OperationState::Ready);
            return;
        }
        let spawner = self
            .inner
            .scheduling
            .lock()
            .as_ref()
            .map(|scheduling| Arc::clone(&scheduling.spawner));
        let Some(spawner) = spawner else {
            error!(operation = %self.inner.name, "conditions reached evaluation without a queue");
            self.inner
                .internal_errors
                .lock()
                .push(OperationError::Scheduling("operation is not attached to a queue".into()));
            self.transition(OperationState::Ready);
            return;
        };
        debug!(operation = %self.inner.name, count = conditions.len(), "evaluating conditions");
        let operation = self.clone();
        spawner.spawn(Box::pin(async move {
            let failures = ConditionEvaluator::evaluate(&operation, &conditions).await;
            if !failures.is_empty() {
                debug!(operation = %operation.inner.name, failures = failures.len(), "conditions failed");
            }
            operation.inner.internal_errors.lock().extend(failures);
            operation.transition(OperationState::Ready);
        }));
    }

    /// Called by the queue once every enqueue step has run.
    ///
    /// # Panics
    ///
    /// Panics if the operation was already submitted.
    pub(crate) fn will_enqueue(&self, scheduling: Scheduling) {
        assert_eq!(
            self.state(),
            OperationState::Initialized,
            "operation `{}` was submitted twice",
            self.name()
        );
        *self.inner.scheduling.lock() = Some(scheduling);
        self.transition(OperationState::Pending);
    }

    pub(crate) fn claim_dispatch(&self) -> bool {
        !self.inner.dispatched.swap(true, Ordering::AcqRel)
    }

    // ------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------

    /// Entry point used by workers.
    pub(crate) async fn start(&self) {
        if self.is_cancelled() {
            self.finish_cancelled();
            return;
        }
        self.main().await;
    }

    async fn main(&self) {
        debug_assert_eq!(
            self.state(),
            OperationState::Ready,
            "operation must be performed by a queue"
        );
        let blocked = !self.inner.internal_errors.lock().is_empty() || self.is_cancelled();
        if blocked {
            self.finish(Vec::new());
            return;
        }

        self.transition(OperationState::Executing);
        for observer in self.observers() {
            observer.did_start(self);
        }
        debug!(operation = %self.inner.name, "executing");

        let task = Arc::clone(&self.inner.task);
        match task.execute(ExecutionContext::new(self.clone())).await {
            Outcome::Success => self.finish(Vec::new()),
            Outcome::Failure(errors) => self.finish(errors),
            Outcome::Deferred => {}
        }
    }

    /// Walk a cancelled operation to its terminal state without executing.
    pub(crate) fn finish_cancelled(&self) {
        if self.try_transition(
            OperationState::Pending,
            OperationState::EvaluatingConditions,
        ) {
            self.transition(OperationState::Ready);
        }
        if self.state() == OperationState::EvaluatingConditions {
            // Evaluation is still running; its Ready transition dispatches again.
            self.inner.dispatched.store(false, Ordering::Release);
            self.request_readiness_check();
            return;
        }
        self.finish(Vec::new());
    }

    fn observers(&self) -> Vec<Arc<dyn Observer>> {
        self.inner.observers.lock().clone()
    }

    /// Hand `operation` to every observer; the owning queue submits it.
    pub fn produce(&self, operation: &Self) {
        for observer in self.observers() {
            observer.did_produce(self, operation);
        }
    }

    /// Finish with `errors`, in addition to any collected before execution.
    ///
    /// Only the first call has any effect.
    pub fn finish(&self, errors: Vec<OperationError>) {
        if self.inner.has_finished.swap(true, Ordering::AcqRel) {
            return;
        }
        self.transition(OperationState::Finishing);

        let mut combined = self.inner.internal_errors.lock().clone();
        combined.extend(errors);
        let combined = self.inner.combined_errors.get_or_init(|| combined).clone();
        debug!(operation = %self.inner.name, errors = combined.len(), "finishing");

        self.inner.task.finished(self, &combined);
        for observer in self.observers() {
            observer.did_finish(self, &combined);
        }

        self.transition(OperationState::Finished);
    }

    /// Finish reporting a single error.
    pub fn finish_with(&self, error: OperationError) {
        self.finish(vec![error]);
    }

    /// Mark the operation cancelled.
    ///
    /// Cancellation is cooperative: a running task observes it through
    /// [`ExecutionContext::is_cancelled`]. An operation that has not started
    /// finishes on its next readiness pass without executing.
    pub fn cancel(&self) {
        if self.is_finished() || self.is_cancelled() {
            return;
        }
        self.inner.task.will_cancel(self);
        if self.inner.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!(operation = %self.inner.name, "cancelled");
        self.request_readiness_check();
    }

    /// Record `error` and cancel.
    pub fn cancel_with(&self, error: OperationError) {
        if self.is_finished() {
            return;
        }
        self.inner.internal_errors.lock().push(error);
        self.cancel();
    }
}

impl PartialEq for Operation {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Operation {}

impl std::hash::Hash for Operation {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("state", &self.state())
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Handle given to a running [`Task`].
#[derive(Clone)]
pub struct ExecutionContext {
    operation: Operation,
}

impl ExecutionContext {
    const fn new(operation: Operation) -> Self {
        Self { operation }
    }

    /// The running operation.
    #[must_use]
    pub const fn operation(&self) -> &Operation {
        &self.operation
    }

    /// `true` if the operation was cancelled while running.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.operation.is_cancelled()
    }

    /// Submit `child` to the queue running this operation.
    ///
    /// Inside a [`GroupOperation`](crate::core::GroupOperation) the group
    /// waits for `child` before finishing.
    pub fn spawn(&self, child: Operation) {
        self.operation.produce(&child);
    }

    /// Finish the operation. Used by tasks that returned [`Outcome::Deferred`].
    pub fn finish(&self, errors: Vec<OperationError>) {
        self.operation.finish(errors);
    }

    /// Finish reporting a single error.
    pub fn finish_with(&self, error: OperationError) {
        self.operation.finish_with(error);
    }
}

struct FnTask<F> {
    f: F,
}

#[async_trait]
impl<F> Task for FnTask<F>
where
    F: Fn(&ExecutionContext) -> Outcome + Send + Sync + 'static,
{
    async fn execute(&self, ctx: ExecutionContext) -> Outcome {
        (self.f)(&ctx)
    }
}

struct PlainTask {
    work: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

#[async_trait]
impl Task for PlainTask {
    async fn execute(&self, _ctx: ExecutionContext) -> Outcome {
        let work = self.work.lock().take();
        if let Some(work) = work {
            work();
        }
        Outcome::Success
    }
}
