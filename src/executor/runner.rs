//! Experiment execution.

use super::failure::{FailureHandler, FailureRecord};
use super::unit::{WorkUnit, WorkUnitResult};
use crate::cache::{Instance, InstanceCache};
use crate::catalog::{Algorithm, Experiment};
use crate::config::{Parallelism, RunConfig};
use crate::context::{
    ExecutionContext, FMode, ObjectiveRegistry, SubmitError, TaskHandle, WorkerPool,
};
use crate::error::ConfigurationError;
use crate::events::{Event, EventBus};
use crate::random::RandomStreamFactory;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Grace period after a unit's time budget expires before the engine
/// complains that the algorithm is ignoring its deadline.
pub const EXTRA_TIME_BEFORE_WARNING: Duration = Duration::from_secs(10);

/// Per-experiment dispatch counters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExperimentSummary {
    pub experiment: String,
    /// Units processed, successful or not.
    pub units: usize,
    pub failures: usize,
}

/// Processes work units.
///
/// For each (instance, algorithm, repetition) triple of an experiment, in a
/// fixed enumeration order, the executor derives an execution context from
/// the unit's ordinal, submits the trial to the worker pool and collects
/// the outcome. Failures are caught at this boundary, routed to the failure
/// handler exactly once, and never disturb sibling units. Events for all
/// units are published from the coordinating path in causal order.
pub struct Executor<S, I: Instance> {
    config: RunConfig,
    factory: RandomStreamFactory,
    objectives: Arc<ObjectiveRegistry<S>>,
    cache: Arc<InstanceCache<I>>,
    pool: Option<Arc<WorkerPool>>,
    bus: Arc<EventBus>,
    failure_handler: Arc<dyn FailureHandler>,
    /// Ordinals increase across the whole batch, spanning experiments.
    next_ordinal: AtomicU64,
}

enum UnitOutcome<S> {
    Success(WorkUnitResult<S>),
    Failure(FailureRecord, Duration),
}

struct SubmittedUnit<S> {
    unit: WorkUnit,
    handle: TaskHandle<UnitOutcome<S>>,
}

impl<S: Send + 'static, I: Instance> Executor<S, I> {
    /// Builds an executor, sizing the worker pool from the configuration.
    pub fn new(
        config: RunConfig,
        cache: Arc<InstanceCache<I>>,
        objectives: Arc<ObjectiveRegistry<S>>,
        bus: Arc<EventBus>,
        failure_handler: Arc<dyn FailureHandler>,
    ) -> Result<Self, ConfigurationError> {
        let pool = match config.parallelism {
            Parallelism::Sequential => {
                tracing::debug!("sequential mode, units run inline on the coordinating thread");
                None
            }
            Parallelism::Fixed(workers) => Some(WorkerPool::new(workers)?),
            Parallelism::Auto => Some(WorkerPool::new(default_workers())?),
        };
        if let Some(pool) = &pool {
            tracing::info!(workers = pool.workers(), "worker pool ready");
        }
        let factory = RandomStreamFactory::new(config.seed);
        Ok(Self {
            config,
            factory,
            objectives,
            cache,
            pool,
            bus,
            failure_handler,
            next_ordinal: AtomicU64::new(0),
        })
    }

    /// Runs every work unit of one experiment.
    ///
    /// `instance_names` must come from the cache's solve-order computation;
    /// the enumeration order (instance, then algorithm, then repetition) and
    /// the ordinals assigned here fully determine each unit's random stream.
    pub fn run_experiment(
        &self,
        experiment: &Experiment<S, I>,
        instance_names: &[String],
        repetitions: usize,
    ) -> ExperimentSummary {
        let experiment_name = experiment.name();

        // Expand and submit everything up front. Which worker runs a unit,
        // and when, can no longer influence anything observable.
        let mut per_instance: Vec<(String, Vec<(String, Vec<SubmittedUnit<S>>)>)> =
            Vec::with_capacity(instance_names.len());
        for instance in instance_names {
            let mut per_algorithm = Vec::with_capacity(experiment.algorithms().len());
            for algorithm in experiment.algorithms() {
                let mut submitted = Vec::with_capacity(repetitions);
                for repetition in 0..repetitions {
                    let ordinal = self.next_ordinal.fetch_add(1, Ordering::Relaxed);
                    let unit = WorkUnit {
                        experiment: experiment_name.to_string(),
                        algorithm: algorithm.name().to_string(),
                        instance: instance.clone(),
                        repetition,
                        ordinal,
                    };
                    let handle = self.submit_unit(unit.clone(), Arc::clone(algorithm));
                    submitted.push(SubmittedUnit { unit, handle });
                }
                per_algorithm.push((algorithm.name().to_string(), submitted));
            }
            per_instance.push((instance.clone(), per_algorithm));
        }

        // Collect results in the fixed enumeration order, replaying events
        // as if execution had been sequential.
        let main_mode = self.objectives.main().mode();
        let main_name = self.objectives.main().name().to_string();
        let mut units = 0usize;
        let mut failures = 0usize;

        for (instance_name, per_algorithm) in per_instance {
            let instance_started = Instant::now();
            self.bus.publish(Event::InstanceStarted {
                experiment: experiment_name.to_string(),
                instance: instance_name.clone(),
                algorithms: per_algorithm.iter().map(|(name, _)| name.clone()).collect(),
                repetitions,
            });
            tracing::debug!(instance = %instance_name, "collecting results for instance");

            let mut instance_best: Option<f64> = None;
            for (algorithm_name, submitted) in per_algorithm {
                let mut algorithm_best: Option<f64> = None;
                for SubmittedUnit { unit, handle } in submitted {
                    self.bus.publish(Event::UnitStarted {
                        experiment: unit.experiment.clone(),
                        algorithm: unit.algorithm.clone(),
                        instance: unit.instance.clone(),
                        repetition: unit.repetition,
                        ordinal: unit.ordinal,
                    });

                    let outcome = handle.join().unwrap_or_else(|_| {
                        UnitOutcome::Failure(
                            FailureRecord::new(
                                &unit,
                                "worker terminated without reporting a result",
                                "",
                            ),
                            Duration::ZERO,
                        )
                    });
                    units += 1;

                    match outcome {
                        UnitOutcome::Success(result) => {
                            let score = result.scores.get(&main_name).copied();
                            if improves(main_mode, score, algorithm_best) {
                                algorithm_best = score;
                            }
                            if improves(main_mode, score, instance_best) {
                                instance_best = score;
                            }
                            tracing::debug!(
                                ordinal = result.unit.ordinal,
                                seconds = result.execution_time.as_secs_f64(),
                                score = score.unwrap_or(f64::NAN),
                                "unit completed"
                            );
                            self.bus.publish(Event::ResultProduced {
                                experiment: result.unit.experiment.clone(),
                                algorithm: result.unit.algorithm.clone(),
                                instance: result.unit.instance.clone(),
                                repetition: result.unit.repetition,
                                scores: result.scores.clone(),
                                execution_time: result.execution_time,
                            });
                            self.bus.publish(Event::UnitEnded {
                                experiment: result.unit.experiment.clone(),
                                algorithm: result.unit.algorithm.clone(),
                                instance: result.unit.instance.clone(),
                                repetition: result.unit.repetition,
                                ordinal: result.unit.ordinal,
                                success: true,
                                execution_time: result.execution_time,
                            });
                        }
                        UnitOutcome::Failure(record, execution_time) => {
                            failures += 1;
                            self.failure_handler.handle(&record);
                            self.bus.publish(Event::UnitEnded {
                                experiment: unit.experiment.clone(),
                                algorithm: unit.algorithm.clone(),
                                instance: unit.instance.clone(),
                                repetition: unit.repetition,
                                ordinal: unit.ordinal,
                                success: false,
                                execution_time,
                            });
                        }
                    }
                }
                self.bus.publish(Event::AlgorithmEnded {
                    experiment: experiment_name.to_string(),
                    instance: instance_name.clone(),
                    algorithm: algorithm_name,
                    best_score: algorithm_best,
                });
            }
            self.bus.publish(Event::InstanceEnded {
                experiment: experiment_name.to_string(),
                instance: instance_name,
                duration: instance_started.elapsed(),
                best_score: instance_best,
            });
        }

        ExperimentSummary {
            experiment: experiment_name.to_string(),
            units,
            failures,
        }
    }

    /// Stops accepting work and waits for in-flight units to drain.
    ///
    /// Bounded by an effectively infinite timeout: results are never
    /// sacrificed to a deadline. Idempotent, and a no-op in sequential mode.
    pub fn shutdown(&self) {
        if let Some(pool) = &self.pool {
            tracing::debug!("requesting worker pool shutdown");
            pool.shutdown();
        }
    }

    fn submit_unit(
        &self,
        unit: WorkUnit,
        algorithm: Arc<dyn Algorithm<S, I>>,
    ) -> TaskHandle<UnitOutcome<S>> {
        let ctx = ExecutionContext::new(
            self.factory.derive(unit.ordinal),
            self.pool.clone(),
            Arc::clone(&self.objectives),
        );
        let cache = Arc::clone(&self.cache);
        let budget = self.config.time_budget;
        let fallback = unit.clone();
        let task = move || run_unit(unit, algorithm, cache, ctx, budget);

        match &self.pool {
            Some(pool) => match pool.submit(task) {
                Ok(handle) => handle,
                // Dispatch only happens before shutdown; reaching this arm
                // means someone shut the executor down mid-batch.
                Err(SubmitError::Draining) => {
                    tracing::error!(
                        ordinal = fallback.ordinal,
                        "unit submitted after shutdown began, recording as failure"
                    );
                    TaskHandle::ready(UnitOutcome::Failure(
                        FailureRecord::new(&fallback, "unit submitted after shutdown began", ""),
                        Duration::ZERO,
                    ))
                }
            },
            None => TaskHandle::ready(task()),
        }
    }
}

/// Executes one unit on whatever thread it was scheduled on.
fn run_unit<S, I: Instance>(
    unit: WorkUnit,
    algorithm: Arc<dyn Algorithm<S, I>>,
    cache: Arc<InstanceCache<I>>,
    mut ctx: ExecutionContext<S>,
    budget: Option<Duration>,
) -> UnitOutcome<S> {
    let started = Instant::now();

    let instance = match cache.get(&unit.instance) {
        Ok(instance) => instance,
        Err(e) => {
            return UnitOutcome::Failure(
                FailureRecord::new(&unit, format!("failed to load instance: {e}"), ""),
                started.elapsed(),
            );
        }
    };

    if let Some(duration) = budget {
        ctx.budget_mut().start(duration);
    }

    let outcome = catch_unwind(AssertUnwindSafe(|| algorithm.run(&instance, &mut ctx)));
    let execution_time = started.elapsed();
    warn_on_budget_overrun(&ctx, &unit);

    match outcome {
        Ok(Ok(solution)) => {
            let scores = ctx.objectives().evaluate_all(&solution);
            UnitOutcome::Success(WorkUnitResult {
                unit,
                solution,
                scores,
                execution_time,
            })
        }
        Ok(Err(error)) => UnitOutcome::Failure(
            FailureRecord::new(&unit, error.to_string(), format!("{error:?}")),
            execution_time,
        ),
        Err(payload) => {
            let summary = panic_summary(payload.as_ref());
            UnitOutcome::Failure(
                FailureRecord::new(&unit, summary.clone(), summary),
                execution_time,
            )
        }
    }
}

fn warn_on_budget_overrun<S>(ctx: &ExecutionContext<S>, unit: &WorkUnit) {
    if let Ok(remaining) = ctx.budget().remaining() {
        if remaining < -(EXTRA_TIME_BEFORE_WARNING.as_nanos() as i64) {
            tracing::warn!(
                instance = %unit.instance,
                algorithm = %unit.algorithm,
                "algorithm took too long to stop after its time budget expired"
            );
        }
    }
}

fn panic_summary(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("algorithm panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("algorithm panicked: {message}")
    } else {
        "algorithm panicked".to_string()
    }
}

fn improves(mode: FMode, candidate: Option<f64>, best: Option<f64>) -> bool {
    match (candidate, best) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(candidate), Some(best)) => mode.is_better(candidate, best),
    }
}

fn default_workers() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2);
    (cpus / 2).max(1)
}
