//! Event variants.

use std::collections::BTreeMap;
use std::time::Duration;

/// A lifecycle event.
///
/// Events carry only primitive and identifier fields, never references into
/// mutable engine state, so a listener cannot corrupt the scheduler no
/// matter what it does.
///
/// Ordering: events concerning the same work unit arrive in causal order
/// ([`Event::UnitStarted`], then [`Event::ResultProduced`] on success, then
/// [`Event::UnitEnded`]). Across concurrently executing units the relative
/// order is unspecified.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Event {
    /// The batch is starting; lists the experiments that will run.
    BatchStarted { experiments: Vec<String> },

    /// Everything finished and the executor has drained.
    BatchEnded { duration: Duration },

    /// An experiment is starting; lists its instances in solve order.
    ExperimentStarted {
        experiment: String,
        instances: Vec<String>,
    },

    ExperimentEnded {
        experiment: String,
        duration: Duration,
    },

    /// Work for one instance is being collected.
    InstanceStarted {
        experiment: String,
        instance: String,
        algorithms: Vec<String>,
        repetitions: usize,
    },

    InstanceEnded {
        experiment: String,
        instance: String,
        duration: Duration,
        /// Best main-objective score over all algorithms, if any unit succeeded.
        best_score: Option<f64>,
    },

    /// All repetitions of one (algorithm, instance) pair are accounted for.
    AlgorithmEnded {
        experiment: String,
        instance: String,
        algorithm: String,
        /// Best main-objective score over the pair's repetitions.
        best_score: Option<f64>,
    },

    UnitStarted {
        experiment: String,
        algorithm: String,
        instance: String,
        repetition: usize,
        ordinal: u64,
    },

    /// A successful unit produced a result.
    ResultProduced {
        experiment: String,
        algorithm: String,
        instance: String,
        repetition: usize,
        scores: BTreeMap<String, f64>,
        execution_time: Duration,
    },

    /// A unit finished, successfully or not. Every dispatched unit publishes
    /// exactly one of these.
    UnitEnded {
        experiment: String,
        algorithm: String,
        instance: String,
        repetition: usize,
        ordinal: u64,
        success: bool,
        execution_time: Duration,
    },
}

impl Event {
    /// Short variant name, handy for logging and filtering.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::BatchStarted { .. } => "batch_started",
            Event::BatchEnded { .. } => "batch_ended",
            Event::ExperimentStarted { .. } => "experiment_started",
            Event::ExperimentEnded { .. } => "experiment_ended",
            Event::InstanceStarted { .. } => "instance_started",
            Event::InstanceEnded { .. } => "instance_ended",
            Event::AlgorithmEnded { .. } => "algorithm_ended",
            Event::UnitStarted { .. } => "unit_started",
            Event::ResultProduced { .. } => "result_produced",
            Event::UnitEnded { .. } => "unit_ended",
        }
    }
}
