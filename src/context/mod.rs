//! Per-worker execution contexts.
//!
//! A context bundles the resources a worker needs: its own random generator,
//! an optional handle to the shared worker pool, the objective registry and
//! a cooperative time budget. Contexts are owned, never shared: spawning
//! child work means forking the context, which replaces the generator with a
//! fresh disjoint stream and resets the budget.

mod execution;
mod objective;
mod pool;

pub use execution::ExecutionContext;
pub use objective::{FMode, Objective, ObjectiveRegistry, DEFAULT_EPSILON};
pub use pool::{SubmitError, TaskHandle, TaskLost, WorkerPool, SHUTDOWN_BOUND};
