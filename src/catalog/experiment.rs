//! Experiment definitions and catalog construction.

use super::types::Algorithm;
use crate::error::ConfigurationError;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;

/// Algorithm names end up in file names and report columns, keep them short.
pub const MAX_NAME_LENGTH: usize = 30;

/// A named set of algorithms to evaluate.
pub struct Experiment<S, I> {
    name: String,
    algorithms: Vec<Arc<dyn Algorithm<S, I>>>,
}

impl<S, I> Experiment<S, I> {
    pub fn new(name: impl Into<String>, algorithms: Vec<Arc<dyn Algorithm<S, I>>>) -> Self {
        Self {
            name: name.into(),
            algorithms,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn algorithms(&self) -> &[Arc<dyn Algorithm<S, I>>] {
        &self.algorithms
    }
}

/// The validated, filtered set of experiments for a run.
///
/// Built once at startup from the explicitly registered experiments:
///
/// 1. Experiments whose name does not match the configured filter pattern
///    are silently dropped (the pattern must match the full name).
/// 2. Experiments without algorithms are skipped with a warning.
/// 3. Duplicate experiment names, duplicate algorithm names within one
///    experiment, and over-long algorithm names are configuration errors.
pub struct ExperimentCatalog<S, I> {
    experiments: Vec<Experiment<S, I>>,
}

impl<S, I> ExperimentCatalog<S, I> {
    pub fn build(
        candidates: Vec<Experiment<S, I>>,
        pattern: &str,
    ) -> Result<Self, ConfigurationError> {
        // Anchor the pattern so it must match the whole experiment name.
        let filter = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
            ConfigurationError::InvalidExperimentPattern {
                pattern: pattern.to_string(),
                source,
            }
        })?;

        let total = candidates.len();
        let mut names = HashSet::new();
        let mut experiments = Vec::new();
        for experiment in candidates {
            if !names.insert(experiment.name().to_string()) {
                return Err(ConfigurationError::DuplicateExperimentName {
                    name: experiment.name().to_string(),
                });
            }
            if !filter.is_match(experiment.name()) {
                tracing::debug!(
                    experiment = experiment.name(),
                    pattern,
                    "experiment does not match filter, ignoring"
                );
                continue;
            }
            if experiment.algorithms().is_empty() {
                tracing::warn!(
                    experiment = experiment.name(),
                    "experiment has no algorithms defined, ignoring"
                );
                continue;
            }
            validate_algorithm_names(&experiment)?;
            experiments.push(experiment);
        }

        if experiments.is_empty() {
            if total == 0 {
                tracing::error!("no experiment definitions were registered");
            } else {
                tracing::error!(
                    pattern,
                    "experiment definitions were found, but none survived the filter"
                );
            }
        }

        Ok(Self { experiments })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Experiment<S, I>> {
        self.experiments.iter()
    }

    pub fn len(&self) -> usize {
        self.experiments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }

    /// Names of all surviving experiments, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.experiments
            .iter()
            .map(|e| e.name().to_string())
            .collect()
    }
}

fn validate_algorithm_names<S, I>(experiment: &Experiment<S, I>) -> Result<(), ConfigurationError> {
    let mut seen = HashSet::new();
    for algorithm in experiment.algorithms() {
        let name = algorithm.name();
        if name.len() > MAX_NAME_LENGTH {
            return Err(ConfigurationError::AlgorithmNameTooLong {
                name: name.to_string(),
                max: MAX_NAME_LENGTH,
            });
        }
        if !seen.insert(name.to_string()) {
            return Err(ConfigurationError::DuplicateAlgorithmName {
                experiment: experiment.name().to_string(),
                name: name.to_string(),
            });
        }
    }
    Ok(())
}
