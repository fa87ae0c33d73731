//! Fatal pre-run error taxonomy.
//!
//! A [`ConfigurationError`] always aborts startup before any work unit is
//! created. Recoverable per-trial failures use a different path entirely
//! (see [`crate::executor::FailureRecord`]) and never surface here.

use thiserror::Error;

/// Errors detected while validating the run configuration, the experiment
/// catalog or the instance set. All of them are raised before dispatch
/// begins; once the first work unit is submitted, none of these can occur.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// The instance source produced no instances for an experiment.
    #[error("could not load any instance for experiment: {experiment}")]
    EmptyInstanceSource { experiment: String },

    /// Two instances at different paths reported the same name.
    #[error("duplicated instance name, check that there are not multiple instances named: {name}")]
    DuplicateInstanceName { name: String },

    /// Two algorithms inside the same experiment share a name.
    #[error("duplicated algorithm name in experiment {experiment}: all algorithm names must be unique per experiment: {name}")]
    DuplicateAlgorithmName { experiment: String, name: String },

    /// Algorithm names are used in file names and reports, keep them short.
    #[error("algorithm names cannot be longer than {max} chars: {name}")]
    AlgorithmNameTooLong { name: String, max: usize },

    /// Two experiments share a name.
    #[error("duplicated experiment name: {name}")]
    DuplicateExperimentName { name: String },

    /// The experiment filter is not a valid regular expression.
    #[error("invalid experiment filter pattern {pattern:?}")]
    InvalidExperimentPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Refuse to enqueue an absurd number of work units.
    #[error("maximum workload exceeded, reduce instances, algorithms or repetitions: {instances} * {algorithms} * {repetitions} = {total} >= {limit}")]
    WorkloadLimit {
        instances: usize,
        algorithms: usize,
        repetitions: usize,
        total: usize,
        limit: usize,
    },

    /// The instance source failed while computing the solve order.
    #[error("instance source failed for experiment {experiment}: {message}")]
    InstanceSource { experiment: String, message: String },

    /// At least one objective must be registered.
    #[error("no objectives registered: at least one objective is required")]
    NoObjectives,

    /// Objective names identify result columns and must be unique.
    #[error("duplicated objective name: {name}")]
    DuplicateObjectiveName { name: String },

    /// Catch-all for invalid run configuration values.
    #[error("invalid configuration: {0}")]
    InvalidParameter(String),
}
