//! Reproducible random stream derivation.
//!
//! Every work unit draws from its own pseudo-random stream, derived from the
//! run's base seed and the unit's ordinal. Derivation is a pure function, so
//! results never depend on thread count or scheduling order.

mod factory;

pub use factory::{fork_rng, RandomStreamFactory};
