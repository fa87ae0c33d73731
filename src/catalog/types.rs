//! The algorithm contract.

use crate::context::ExecutionContext;
use thiserror::Error;

/// Error returned by a failing algorithm run.
///
/// Deliberately opaque: the engine records the message in a failure record
/// and moves on, it never inspects the cause.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct AlgorithmError {
    message: String,
}

impl AlgorithmError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for AlgorithmError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for AlgorithmError {
    fn from(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// A pluggable optimization algorithm.
///
/// The engine invokes algorithms opaquely: one call per work unit, with the
/// problem instance and a freshly derived context. For reproducibility to
/// hold, a run must be a pure function of `(instance, context random
/// stream)`: draw all randomness from `ctx.rng()`, never from global or
/// thread-local sources.
///
/// An algorithm that wants to honor time limits polls
/// `ctx.budget().is_time_up()` and returns its best solution so far; one
/// that wants parallel sub-work submits closures through `ctx.submit`,
/// handing each child a forked context.
pub trait Algorithm<S, I>: Send + Sync {
    /// Short unique name, used in events, reports and file names.
    fn name(&self) -> &str;

    /// Runs the algorithm on one instance.
    fn run(&self, instance: &I, ctx: &mut ExecutionContext<S>) -> Result<S, AlgorithmError>;
}
