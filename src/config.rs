//! Run configuration.
//!
//! [`RunConfig`] holds every knob the engine consumes. It is parsed and
//! validated once at startup and never re-read mid-run.

use crate::error::ConfigurationError;
use regex::Regex;
use std::time::Duration;

/// Default base seed when none is configured.
pub const DEFAULT_SEED: u64 = 1234;

/// How work units are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Parallelism {
    /// Use half the available CPUs, at least one worker.
    Auto,

    /// Use exactly this many workers. Zero is invalid, use
    /// [`Parallelism::Sequential`] instead.
    Fixed(usize),

    /// No worker pool at all. Every unit runs inline on the coordinating
    /// thread, in dispatch order.
    Sequential,
}

impl Default for Parallelism {
    fn default() -> Self {
        Parallelism::Auto
    }
}

/// Configuration for a batch run.
///
/// # Defaults
///
/// ```
/// use heurlab::config::RunConfig;
///
/// let config = RunConfig::default();
/// assert_eq!(config.seed, 1234);
/// assert_eq!(config.repetitions, 1);
/// assert_eq!(config.experiment_pattern, ".*");
/// ```
///
/// # Builder Pattern
///
/// ```
/// use heurlab::config::{Parallelism, RunConfig};
/// use std::time::Duration;
///
/// let config = RunConfig::default()
///     .with_seed(42)
///     .with_repetitions(30)
///     .with_parallelism(Parallelism::Fixed(8))
///     .with_time_budget(Duration::from_secs(60));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunConfig {
    /// Base seed all random streams derive from. Two runs with the same
    /// seed and the same configuration produce identical random choices in
    /// every work unit, regardless of worker count.
    pub seed: u64,

    /// How many times each (algorithm, instance) pair is executed.
    pub repetitions: usize,

    /// Regular expression filtering which configured experiments run.
    /// Matched against the full experiment name.
    pub experiment_pattern: String,

    /// Worker pool sizing.
    pub parallelism: Parallelism,

    /// Optional per-unit time budget. Algorithms are expected to poll their
    /// context's budget and stop voluntarily once it expires; the engine
    /// never interrupts a running unit.
    pub time_budget: Option<Duration>,

    /// Run a small CPU benchmark before solving, to make results from
    /// different machines roughly comparable.
    pub benchmark: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            repetitions: 1,
            experiment_pattern: ".*".to_string(),
            parallelism: Parallelism::default(),
            time_budget: None,
            benchmark: false,
        }
    }
}

impl RunConfig {
    /// Sets the base seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the number of repetitions per (algorithm, instance) pair.
    pub fn with_repetitions(mut self, repetitions: usize) -> Self {
        self.repetitions = repetitions;
        self
    }

    /// Sets the experiment name filter.
    pub fn with_experiment_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.experiment_pattern = pattern.into();
        self
    }

    /// Sets the worker pool sizing.
    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Sets the per-unit time budget.
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }

    /// Enables or disables the startup CPU benchmark.
    pub fn with_benchmark(mut self, benchmark: bool) -> Self {
        self.benchmark = benchmark;
        self
    }

    /// Validates the configuration.
    ///
    /// Called eagerly at orchestrator construction so that a bad value can
    /// never abort a half-finished batch.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.repetitions == 0 {
            return Err(ConfigurationError::InvalidParameter(
                "repetitions must be at least 1".to_string(),
            ));
        }
        if self.parallelism == Parallelism::Fixed(0) {
            return Err(ConfigurationError::InvalidParameter(
                "worker count must be at least 1, use Parallelism::Sequential to disable the pool"
                    .to_string(),
            ));
        }
        if self.time_budget == Some(Duration::ZERO) {
            return Err(ConfigurationError::InvalidParameter(
                "time budget must be positive or unset".to_string(),
            ));
        }
        Regex::new(&self.experiment_pattern).map_err(|source| {
            ConfigurationError::InvalidExperimentPattern {
                pattern: self.experiment_pattern.clone(),
                source,
            }
        })?;
        Ok(())
    }
}
