//! Work unit dispatch.
//!
//! The executor expands an experiment into work units, submits them to the
//! shared worker pool (or runs them inline), isolates per-unit failures and
//! publishes lifecycle events in a deterministic order.

mod failure;
mod runner;
mod unit;

pub use failure::{FailureHandler, FailureRecord, LoggingFailureHandler};
pub use runner::{Executor, ExperimentSummary, EXTRA_TIME_BEFORE_WARNING};
pub use unit::{WorkUnit, WorkUnitResult};
