//! The batch driver.

use super::benchmark::benchmark_score;
use crate::cache::{Instance, InstanceCache, InstanceSource};
use crate::catalog::{Experiment, ExperimentCatalog};
use crate::config::RunConfig;
use crate::context::{Objective, ObjectiveRegistry};
use crate::error::ConfigurationError;
use crate::events::{Event, EventBus, EventListener};
use crate::executor::{
    Executor, ExperimentSummary, FailureHandler, LoggingFailureHandler,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Refuse to enqueue more work units than this per experiment.
pub const MAX_WORKLOAD: usize = 1_000_000;

/// What happened over a whole batch.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BatchSummary {
    /// Units processed across all experiments, successful or not.
    pub units: usize,
    pub failures: usize,
    pub duration: Duration,
    pub experiments: Vec<ExperimentSummary>,
}

/// Drives a complete batch run.
///
/// Construction validates everything eagerly: configuration values, the
/// experiment catalog and the objective registry. Instance validation
/// happens per experiment when its solve order is computed, still before
/// any of its work units exist.
///
/// ```no_run
/// # use heurlab::catalog::{Algorithm, AlgorithmError, Experiment};
/// # use heurlab::cache::{Instance, InstanceLoadError, InstanceSource};
/// # use heurlab::config::RunConfig;
/// # use heurlab::context::{ExecutionContext, FMode, Objective};
/// # use heurlab::orchestrator::Orchestrator;
/// # use std::path::{Path, PathBuf};
/// # use std::sync::Arc;
/// # struct Tsp;
/// # impl Instance for Tsp { fn name(&self) -> &str { "tsp" } }
/// # struct Dir;
/// # impl InstanceSource<Tsp> for Dir {
/// #     fn list(&self, _: &str) -> Result<Vec<PathBuf>, InstanceLoadError> { Ok(vec![]) }
/// #     fn load(&self, _: &Path) -> Result<Tsp, InstanceLoadError> { unreachable!() }
/// # }
/// # struct Greedy;
/// # impl Algorithm<f64, Tsp> for Greedy {
/// #     fn name(&self) -> &str { "greedy" }
/// #     fn run(&self, _: &Tsp, _: &mut ExecutionContext<f64>) -> Result<f64, AlgorithmError> { Ok(0.0) }
/// # }
/// let experiments = vec![Experiment::new(
///     "preliminary",
///     vec![Arc::new(Greedy) as Arc<dyn Algorithm<f64, Tsp>>],
/// )];
/// let objectives = vec![Objective::of("cost", FMode::Minimize, |v: &f64| *v)];
/// let orchestrator = Orchestrator::new(
///     RunConfig::default().with_repetitions(10),
///     experiments,
///     Box::new(Dir),
///     objectives,
///     vec![],
/// )
/// .unwrap();
/// let summary = orchestrator.run().unwrap();
/// println!("processed {} units", summary.units);
/// ```
pub struct Orchestrator<S, I: Instance> {
    config: RunConfig,
    catalog: ExperimentCatalog<S, I>,
    cache: Arc<InstanceCache<I>>,
    objectives: Arc<ObjectiveRegistry<S>>,
    bus: Arc<EventBus>,
    failure_handler: Arc<dyn FailureHandler>,
}

impl<S: Send + 'static, I: Instance> Orchestrator<S, I> {
    /// Validates and wires up a batch. Fails fast on any configuration
    /// problem; nothing has started yet when this returns an error.
    pub fn new(
        config: RunConfig,
        experiments: Vec<Experiment<S, I>>,
        source: Box<dyn InstanceSource<I>>,
        objectives: Vec<Objective<S>>,
        listeners: Vec<Box<dyn EventListener>>,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let catalog = ExperimentCatalog::build(experiments, &config.experiment_pattern)?;
        let objectives = Arc::new(ObjectiveRegistry::new(objectives)?);
        let cache = Arc::new(InstanceCache::new(source));
        let bus = Arc::new(EventBus::new(listeners));
        Ok(Self {
            config,
            catalog,
            cache,
            objectives,
            bus,
            failure_handler: Arc::new(LoggingFailureHandler::new()),
        })
    }

    /// Replaces the default failure handler.
    pub fn with_failure_handler(mut self, handler: Arc<dyn FailureHandler>) -> Self {
        self.failure_handler = handler;
        self
    }

    /// The instance cache, shareable for inspection or pre-warming.
    pub fn cache(&self) -> Arc<InstanceCache<I>> {
        Arc::clone(&self.cache)
    }

    /// Runs the whole batch.
    ///
    /// A configuration error, like a bad instance set discovered while
    /// computing an experiment's solve order, aborts the remaining
    /// experiments but still drains the executor and publishes
    /// [`Event::BatchEnded`]. Per-unit failures never abort anything.
    pub fn run(self) -> Result<BatchSummary, ConfigurationError> {
        if self.config.benchmark {
            let score = benchmark_score(self.config.seed);
            tracing::info!(score, "cpu benchmark completed");
        } else {
            tracing::debug!("skipping cpu benchmark");
        }

        let executor = Executor::new(
            self.config.clone(),
            Arc::clone(&self.cache),
            Arc::clone(&self.objectives),
            Arc::clone(&self.bus),
            Arc::clone(&self.failure_handler),
        )?;

        tracing::info!(experiments = ?self.catalog.names(), "ready to start solving");
        self.bus.publish(Event::BatchStarted {
            experiments: self.catalog.names(),
        });
        let started = Instant::now();

        let outcome = self.run_experiments(&executor);

        executor.shutdown();
        let duration = started.elapsed();
        self.bus.publish(Event::BatchEnded { duration });
        self.bus.join();
        tracing::info!(seconds = duration.as_secs_f64(), "batch finished");

        let experiments = outcome?;
        Ok(BatchSummary {
            units: experiments.iter().map(|e| e.units).sum(),
            failures: experiments.iter().map(|e| e.failures).sum(),
            duration,
            experiments,
        })
    }

    fn run_experiments(
        &self,
        executor: &Executor<S, I>,
    ) -> Result<Vec<ExperimentSummary>, ConfigurationError> {
        let mut summaries = Vec::with_capacity(self.catalog.len());
        for experiment in self.catalog.iter() {
            let name = experiment.name().to_string();
            tracing::info!(experiment = %name, "running experiment");
            let started = Instant::now();

            let instances = self.cache.solve_order(&name)?;
            verify_workload_limit(
                instances.len(),
                experiment.algorithms().len(),
                self.config.repetitions,
            )?;

            self.bus.publish(Event::ExperimentStarted {
                experiment: name.clone(),
                instances: instances.clone(),
            });
            let summary = executor.run_experiment(experiment, &instances, self.config.repetitions);
            self.bus.publish(Event::ExperimentEnded {
                experiment: name.clone(),
                duration: started.elapsed(),
            });
            tracing::info!(experiment = %name, units = summary.units, failures = summary.failures, "finished experiment");
            summaries.push(summary);
        }
        Ok(summaries)
    }
}

fn verify_workload_limit(
    instances: usize,
    algorithms: usize,
    repetitions: usize,
) -> Result<(), ConfigurationError> {
    let total = instances
        .saturating_mul(algorithms)
        .saturating_mul(repetitions);
    if total >= MAX_WORKLOAD {
        return Err(ConfigurationError::WorkloadLimit {
            instances,
            algorithms,
            repetitions,
            total,
            limit: MAX_WORKLOAD,
        });
    }
    Ok(())
}
