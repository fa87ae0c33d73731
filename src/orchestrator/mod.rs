//! Top-level batch driver.
//!
//! The orchestrator wires configuration, catalog, instance cache, executor
//! and event bus together and runs the whole batch: benchmark, per
//! experiment solve order and dispatch, graceful shutdown, final event.

mod benchmark;
mod driver;

pub use benchmark::benchmark_score;
pub use driver::{BatchSummary, Orchestrator, MAX_WORKLOAD};
