//! # Prometheus Operations
//!
//! A dependency-aware operation scheduler.
//!
//! Independently written units of work ("operations") declare dependencies,
//! asynchronous readiness conditions, mutual-exclusion categories and
//! lifecycle observers. The scheduler runs them in dependency order, at most
//! one at a time per exclusivity category, and aggregates their errors
//! deterministically.
//!
//! ## Key Features
//!
//! - **Readiness state machine**: operations move through a strict chain of
//!   states; readiness is re-derived on every dependency completion
//! - **Concurrent conditions**: all conditions of an operation are evaluated
//!   concurrently off the worker pool; failures keep declaration order
//! - **Enqueue pipeline**: vital barriers, condition companion operations,
//!   exclusivity chains and enqueuing modules are wired before an operation
//!   can become pending
//! - **Groups**: a [`GroupOperation`](core::GroupOperation) runs a private
//!   sub-graph, including work its children spawn while running
//! - **Worker pool**: dedicated OS threads with bounded concurrency
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use prometheus_operations::builders::build_queue;
//! use prometheus_operations::conditions::NoFailedDependencies;
//! use prometheus_operations::config::QueueConfig;
//! use prometheus_operations::core::{Operation, Outcome};
//! use prometheus_operations::runtime::TokioSpawner;
//!
//! let queue = build_queue(&QueueConfig::default(), Arc::new(TokioSpawner::current()?))?;
//!
//! let download = Operation::from_fn("download", |_| Outcome::Success);
//! let parse = Operation::from_fn("parse", |_| Outcome::Success);
//! parse.add_dependency(&download);
//! parse.add_condition(NoFailedDependencies::new());
//! parse.observe(|o| {
//!     o.did_fail(|errors| tracing::warn!(count = errors.len(), "parse failed"));
//! });
//!
//! queue.submit_all([&download, &parse]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions: operations, conditions, queues and groups.
pub mod core;
/// Sample condition policies built on the condition protocol.
pub mod conditions;
/// Configuration models for worker pools and queues.
pub mod config;
/// Builders to construct queues from configuration.
pub mod builders;
/// Runtime adapters for async side-work.
pub mod runtime;
/// Shared utilities.
pub mod util;
