//! Deterministic batch execution engine for metaheuristic experiments.
//!
//! `heurlab` runs many independent trials (an algorithm applied to a problem
//! instance, repeated N times) across a configurable number of worker
//! threads, guaranteeing bit-for-bit reproducibility of every trial's random
//! choices regardless of how many workers run or how the scheduler
//! interleaves them:
//!
//! - **Random streams**: every work unit draws from its own pseudo-random
//!   stream, derived from the base seed and the unit's ordinal by jumping a
//!   Xoshiro256++ generator. Streams are disjoint by construction and never
//!   depend on execution order.
//! - **Execution contexts**: each worker owns a bundle of {random generator,
//!   shared pool handle, objective registry, time budget}. Child workers get
//!   a forked copy with a fresh stream, never a shared reference.
//! - **Time budgets**: cooperative per-worker deadlines. Algorithms poll and
//!   stop voluntarily; the engine never kills a running trial.
//! - **Instance cache**: instances load lazily behind evictable handles and
//!   reload transparently after eviction, bounding memory for arbitrarily
//!   large instance sets.
//! - **Failure isolation**: a failing trial produces exactly one failure
//!   record and never disturbs its siblings; the batch always completes.
//! - **Events**: batch, experiment, instance and unit lifecycle events flow
//!   to registered listeners for reporting and export.
//!
//! # Architecture
//!
//! Data flows strictly downward: the [`orchestrator`] filters experiments
//! through the [`catalog`], computes solve orders in the [`cache`], and
//! hands each experiment to the [`executor`], which runs every unit with a
//! derived [`context`] and optional [`budget`] and reports through
//! [`events`]. The pluggable pieces, algorithms, instance sources, failure
//! handlers and event listeners, are supplied by the embedding application.

pub mod budget;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod executor;
pub mod orchestrator;
pub mod random;
