//! Lifecycle observers.

use crate::core::error::OperationError;
use crate::core::operation::Operation;

/// Receives lifecycle notifications from an [`Operation`].
///
/// Every method defaults to a no-op. Notifications are delivered on whichever
/// thread drives the transition, with no operation lock held.
pub trait Observer: Send + Sync {
    /// The operation began executing.
    fn did_start(&self, _operation: &Operation) {}

    /// The operation produced `produced` for its queue to run.
    fn did_produce(&self, _operation: &Operation, _produced: &Operation) {}

    /// The operation is finishing with `errors`.
    fn did_finish(&self, _operation: &Operation, _errors: &[OperationError]) {}
}

type StartFn = Box<dyn Fn(&Operation) + Send + Sync>;
type ProduceFn = Box<dyn Fn(&Operation, &Operation) + Send + Sync>;
type FinishFn = Box<dyn Fn(&Operation, &[OperationError]) + Send + Sync>;

/// Observer assembled from optional closures.
#[derive(Default)]
pub struct BlockObserver {
    start: Option<StartFn>,
    produce: Option<ProduceFn>,
    finish: Option<FinishFn>,
}

impl BlockObserver {
    /// Observer with no handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle [`Observer::did_start`].
    #[must_use]
    pub fn on_start<F>(mut self, f: F) -> Self
    where
        F: Fn(&Operation) + Send + Sync + 'static,
    {
        self.start = Some(Box::new(f));
        self
    }

    /// Handle [`Observer::did_produce`].
    #[must_use]
    pub fn on_produce<F>(mut self, f: F) -> Self
    where
        F: Fn(&Operation, &Operation) + Send + Sync + 'static,
    {
        self.produce = Some(Box::new(f));
        self
    }

    /// Handle [`Observer::did_finish`].
    #[must_use]
    pub fn on_finish<F>(mut self, f: F) -> Self
    where
        F: Fn(&Operation, &[OperationError]) + Send + Sync + 'static,
    {
        self.finish = Some(Box::new(f));
        self
    }
}

impl Observer for BlockObserver {
    fn did_start(&self, operation: &Operation) {
        if let Some(f) = &self.start {
            f(operation);
        }
    }

    fn did_produce(&self, operation: &Operation, produced: &Operation) {
        if let Some(f) = &self.produce {
            f(operation, produced);
        }
    }

    fn did_finish(&self, operation: &Operation, errors: &[OperationError]) {
        if let Some(f) = &self.finish {
            f(operation, errors);
        }
    }
}

/// Collects handlers for [`Operation::observe`].
///
/// A `did_finish` handler takes precedence: when one is registered,
/// `did_success` and `did_fail` are not called.
#[derive(Default)]
pub struct ObserverBuilder {
    start: Option<Box<dyn Fn() + Send + Sync>>,
    produce: Option<Box<dyn Fn(&Operation) + Send + Sync>>,
    finish: Option<Box<dyn Fn(&[OperationError]) + Send + Sync>>,
    success: Option<Box<dyn Fn() + Send + Sync>>,
    fail: Option<Box<dyn Fn(&[OperationError]) + Send + Sync>>,
}

impl ObserverBuilder {
    /// Called when execution begins.
    pub fn did_start<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.start = Some(Box::new(f));
        self
    }

    /// Called with each produced operation.
    pub fn did_produce<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&Operation) + Send + Sync + 'static,
    {
        self.produce = Some(Box::new(f));
        self
    }

    /// Called on finish with the final errors.
    pub fn did_finish<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&[OperationError]) + Send + Sync + 'static,
    {
        self.finish = Some(Box::new(f));
        self
    }

    /// Called on finish when there are no errors.
    pub fn did_success<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.success = Some(Box::new(f));
        self
    }

    /// Called on finish when there are errors.
    pub fn did_fail<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&[OperationError]) + Send + Sync + 'static,
    {
        self.fail = Some(Box::new(f));
        self
    }

    pub(crate) fn build(self) -> BuiltObserver {
        BuiltObserver { handlers: self }
    }
}

pub(crate) struct BuiltObserver {
    handlers: ObserverBuilder,
}

impl Observer for BuiltObserver {
    fn did_start(&self, _operation: &Operation) {
        if let Some(f) = &self.handlers.start {
            f();
        }
    }

    fn did_produce(&self, _operation: &Operation, produced: &Operation) {
        if let Some(f) = &self.handlers.produce {
            f(produced);
        }
    }

    fn did_finish(&self, _operation: &Operation, errors: &[OperationError]) {
        let handlers = &self.handlers;
        if let Some(f) = &handlers.finish {
            f(errors);
        } else if errors.is_empty() {
            if let Some(f) = &handlers.success {
                f();
            }
        } else if let Some(f) = &handlers.fail {
            f(errors);
        }
    }
}
