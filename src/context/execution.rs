//! The execution context proper.

use super::objective::ObjectiveRegistry;
use super::pool::{SubmitError, TaskHandle, WorkerPool};
use crate::budget::TimeBudget;
use crate::random::fork_rng;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::sync::Arc;

/// Everything a worker needs to run one unit of work.
///
/// Each context owns its random generator outright: no two live contexts
/// ever reference the same generator, which removes cross-task random-number
/// races by construction. The pool handle and the objective registry are
/// shared, immutable resources and pass through forks unchanged.
///
/// # Forking
///
/// A worker that spawns child work gives the child a forked context:
///
/// ```
/// use heurlab::context::{ExecutionContext, FMode, Objective, ObjectiveRegistry};
/// use heurlab::random::RandomStreamFactory;
/// use std::sync::Arc;
///
/// let objectives = Arc::new(
///     ObjectiveRegistry::new(vec![Objective::of("cost", FMode::Minimize, |v: &f64| *v)]).unwrap(),
/// );
/// let factory = RandomStreamFactory::new(42);
/// let mut parent = ExecutionContext::new(factory.derive(0), None, objectives);
/// let child = parent.fork();
/// // parent and child now draw from disjoint random streams
/// # let _ = child;
/// ```
pub struct ExecutionContext<S> {
    rng: Xoshiro256PlusPlus,
    pool: Option<Arc<WorkerPool>>,
    objectives: Arc<ObjectiveRegistry<S>>,
    budget: TimeBudget,
}

impl<S> ExecutionContext<S> {
    /// Creates a root context. One exists per work unit, built by the
    /// dispatcher with a stream derived from the unit's ordinal.
    pub fn new(
        rng: Xoshiro256PlusPlus,
        pool: Option<Arc<WorkerPool>>,
        objectives: Arc<ObjectiveRegistry<S>>,
    ) -> Self {
        Self {
            rng,
            pool,
            objectives,
            budget: TimeBudget::new(),
        }
    }

    /// Forks a context for a child worker.
    ///
    /// The child receives a copy with a freshly forked random stream and an
    /// unarmed budget; pool handle and objectives are shared as-is. The
    /// parent's stream jumps ahead, so parent and child never overlap.
    pub fn fork(&mut self) -> Self {
        Self {
            rng: fork_rng(&mut self.rng),
            pool: self.pool.clone(),
            objectives: Arc::clone(&self.objectives),
            budget: TimeBudget::new(),
        }
    }

    /// The context's random generator.
    pub fn rng(&mut self) -> &mut Xoshiro256PlusPlus {
        &mut self.rng
    }

    /// The run's objective registry.
    pub fn objectives(&self) -> &ObjectiveRegistry<S> {
        &self.objectives
    }

    /// This worker's time budget. Algorithms that honor deadlines poll
    /// `budget().is_time_up()` and stop voluntarily.
    pub fn budget(&self) -> &TimeBudget {
        &self.budget
    }

    pub fn budget_mut(&mut self) -> &mut TimeBudget {
        &mut self.budget
    }

    /// Whether a pool is configured and still accepting work.
    pub fn pool_available(&self) -> bool {
        self.pool.as_ref().is_some_and(|p| !p.is_draining())
    }

    /// Submits sub-work to the shared pool.
    ///
    /// With no pool configured the task runs synchronously on the calling
    /// thread and the returned handle is already complete; single-threaded
    /// runs degrade gracefully instead of failing. Once shutdown has begun
    /// the submission is rejected.
    pub fn submit<T, F>(&self, task: F) -> Result<TaskHandle<T>, SubmitError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        match &self.pool {
            Some(pool) => pool.submit(task),
            None => Ok(TaskHandle::ready(task())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::objective::{FMode, Objective};
    use crate::random::RandomStreamFactory;
    use rand::RngCore;

    fn registry() -> Arc<ObjectiveRegistry<f64>> {
        Arc::new(
            ObjectiveRegistry::new(vec![Objective::of("value", FMode::Minimize, |v: &f64| *v)])
                .unwrap(),
        )
    }

    fn context(pool: Option<Arc<WorkerPool>>) -> ExecutionContext<f64> {
        let factory = RandomStreamFactory::new(42);
        ExecutionContext::new(factory.derive(0), pool, registry())
    }

    fn draws(ctx: &mut ExecutionContext<f64>, n: usize) -> Vec<u64> {
        (0..n).map(|_| ctx.rng().next_u64()).collect()
    }

    #[test]
    fn test_fork_streams_are_disjoint() {
        let mut parent = context(None);
        let mut child = parent.fork();
        assert_ne!(draws(&mut parent, 32), draws(&mut child, 32));
    }

    #[test]
    fn test_fork_is_reproducible() {
        let mut a = context(None);
        let mut b = context(None);
        let mut fork_a = a.fork();
        let mut fork_b = b.fork();
        assert_eq!(draws(&mut fork_a, 32), draws(&mut fork_b, 32));
        assert_eq!(draws(&mut a, 32), draws(&mut b, 32));
    }

    #[test]
    fn test_fork_does_not_inherit_budget() {
        let mut parent = context(None);
        parent
            .budget_mut()
            .start(std::time::Duration::from_secs(60));
        let child = parent.fork();
        assert!(parent.budget().is_armed());
        assert!(!child.budget().is_armed());
    }

    #[test]
    fn test_fork_shares_objectives() {
        let mut parent = context(None);
        let child = parent.fork();
        assert_eq!(
            parent.objectives().main().name(),
            child.objectives().main().name()
        );
    }

    #[test]
    fn test_submit_without_pool_runs_inline() {
        let ctx = context(None);
        assert!(!ctx.pool_available());
        let handle = ctx.submit(|| 5 + 5).unwrap();
        assert_eq!(handle.join(), Ok(10));
    }

    #[test]
    fn test_submit_with_pool() {
        let pool = WorkerPool::new(2).unwrap();
        let ctx = context(Some(pool));
        assert!(ctx.pool_available());
        let handle = ctx.submit(|| "ran on pool").unwrap();
        assert_eq!(handle.join(), Ok("ran on pool"));
    }

    #[test]
    fn test_submit_rejected_while_draining() {
        let pool = WorkerPool::new(2).unwrap();
        let ctx = context(Some(Arc::clone(&pool)));
        pool.shutdown();
        assert!(!ctx.pool_available());
        assert!(matches!(ctx.submit(|| 1), Err(SubmitError::Draining)));
    }
}
