//! Core scheduling abstractions: operations, conditions, queues and groups.

pub mod condition;
pub mod error;
pub mod exclusivity;
pub mod group;
pub mod observer;
pub mod operation;
pub mod queue;
pub mod spawn;
pub mod state;
pub mod worker_pool;

pub use condition::{Condition, ConditionEvaluator, ConditionResult};
pub use error::{AppResult, DependencyFailure, DependencyRef, OperationError, SchedulerError};
pub use exclusivity::{ExclusivityCategory, ExclusivityController};
pub use group::{GroupHooks, GroupOperation};
pub use observer::{BlockObserver, Observer, ObserverBuilder};
pub use operation::{
    DependencyOptions, ErrorInformer, ErrorPurpose, ExecutionContext, Operation, OperationId,
    Outcome, Task, WeakOperation,
};
pub use queue::{EnqueuingModule, OperationQueue, OperationQueueDelegate};
pub use spawn::{BoxedFuture, Spawn};
pub use state::OperationState;
pub use worker_pool::{PoolError, PoolStats, WorkerPool};
