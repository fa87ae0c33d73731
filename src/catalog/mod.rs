//! Experiments and the experiment catalog.
//!
//! Experiments are registered explicitly at startup; the catalog filters
//! them by name pattern and validates them eagerly, so every configuration
//! problem aborts the run before any work unit exists.

mod experiment;
mod types;

pub use experiment::{Experiment, ExperimentCatalog, MAX_NAME_LENGTH};
pub use types::{Algorithm, AlgorithmError};
