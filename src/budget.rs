//! Cooperative per-worker time budgets.
//!
//! Long-running algorithm components should frequently check whether their
//! budget is exhausted and return as soon as possible once it is. The engine
//! never interrupts a running worker; honoring the deadline is voluntary.

use std::time::{Duration, Instant};
use thiserror::Error;

/// Error raised when querying a budget that was never armed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TimeBudgetError {
    /// [`TimeBudget::remaining`] is only meaningful while armed.
    #[error("time budget is not armed, call start() first")]
    NotArmed,
}

/// Deadline tracker bound to a single worker.
///
/// A budget starts unarmed: [`TimeBudget::is_time_up`] returns `false` and
/// [`TimeBudget::remaining`] is an error. Arming it with [`TimeBudget::start`]
/// records the current instant and a duration; [`TimeBudget::clear`] disarms
/// it again. Budgets are never shared between workers, and child workers do
/// not inherit them: each child that wants a deadline arms its own.
///
/// # Example
///
/// ```
/// use heurlab::budget::TimeBudget;
/// use std::time::Duration;
///
/// let mut budget = TimeBudget::new();
/// assert!(!budget.is_time_up());
///
/// budget.start(Duration::from_secs(60));
/// assert!(!budget.is_time_up());
/// assert!(budget.remaining().unwrap() > 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TimeBudget {
    armed: Option<Armed>,
}

#[derive(Debug, Clone, Copy)]
struct Armed {
    start: Instant,
    duration: Duration,
}

impl TimeBudget {
    /// Creates an unarmed budget.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the budget: the deadline is `duration` from now.
    ///
    /// Re-arming an already armed budget simply restarts it.
    pub fn start(&mut self, duration: Duration) {
        self.armed = Some(Armed {
            start: Instant::now(),
            duration,
        });
    }

    /// Disarms the budget.
    pub fn clear(&mut self) {
        self.armed = None;
    }

    /// Whether the budget is currently armed.
    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Whether the deadline has passed. Non-blocking; `false` while unarmed.
    ///
    /// Once this returns `true` the caller is expected to stop as soon as it
    /// can produce a consistent result.
    pub fn is_time_up(&self) -> bool {
        match self.armed {
            None => false,
            Some(armed) => armed.start.elapsed() > armed.duration,
        }
    }

    /// Remaining time in nanoseconds.
    ///
    /// Negative once the deadline has passed, indicating how much extra time
    /// the worker has already consumed. Calling this while unarmed is an
    /// invalid-state error.
    pub fn remaining(&self) -> Result<i64, TimeBudgetError> {
        let armed = self.armed.ok_or(TimeBudgetError::NotArmed)?;
        let duration = armed.duration.as_nanos() as i64;
        let elapsed = armed.start.elapsed().as_nanos() as i64;
        Ok(duration - elapsed)
    }
}
