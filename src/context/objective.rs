//! Objectives and the objective registry.

use crate::error::ConfigurationError;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Tolerance used when comparing objective values.
pub const DEFAULT_EPSILON: f64 = 1e-9;

/// Optimization sense of an objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FMode {
    Minimize,
    Maximize,
}

impl FMode {
    /// Whether `candidate` strictly improves on `reference`, with a small
    /// tolerance so floating-point noise does not count as an improvement.
    pub fn is_better(self, candidate: f64, reference: f64) -> bool {
        match self {
            FMode::Minimize => candidate < reference - DEFAULT_EPSILON,
            FMode::Maximize => candidate > reference + DEFAULT_EPSILON,
        }
    }
}

/// A named scoring function over solutions.
///
/// The engine evaluates every registered objective on each successful trial
/// and attaches the scores to the produced result. The first registered
/// objective is the main one, used for best-so-far tracking.
pub struct Objective<S> {
    name: String,
    mode: FMode,
    eval: Arc<dyn Fn(&S) -> f64 + Send + Sync>,
}

impl<S> Objective<S> {
    /// Creates an objective from a name, a sense and a scoring function.
    pub fn of(
        name: impl Into<String>,
        mode: FMode,
        eval: impl Fn(&S) -> f64 + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            mode,
            eval: Arc::new(eval),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> FMode {
        self.mode
    }

    /// Scores a solution.
    pub fn evaluate(&self, solution: &S) -> f64 {
        (self.eval)(solution)
    }
}

impl<S> Clone for Objective<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            mode: self.mode,
            eval: Arc::clone(&self.eval),
        }
    }
}

impl<S> fmt::Debug for Objective<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Objective")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// The set of objectives for a run, resolved and validated at startup.
#[derive(Debug, Clone)]
pub struct ObjectiveRegistry<S> {
    objectives: Vec<Objective<S>>,
}

impl<S> ObjectiveRegistry<S> {
    /// Builds a registry. The first objective becomes the main objective.
    ///
    /// Fails if the list is empty or contains duplicate names.
    pub fn new(objectives: Vec<Objective<S>>) -> Result<Self, ConfigurationError> {
        if objectives.is_empty() {
            return Err(ConfigurationError::NoObjectives);
        }
        let mut seen = std::collections::HashSet::new();
        for objective in &objectives {
            if !seen.insert(objective.name().to_string()) {
                return Err(ConfigurationError::DuplicateObjectiveName {
                    name: objective.name().to_string(),
                });
            }
        }
        Ok(Self { objectives })
    }

    /// The main objective, used for best-so-far comparisons.
    pub fn main(&self) -> &Objective<S> {
        &self.objectives[0]
    }

    /// Looks up an objective by name.
    pub fn get(&self, name: &str) -> Option<&Objective<S>> {
        self.objectives.iter().find(|o| o.name() == name)
    }

    /// All objectives in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Objective<S>> {
        self.objectives.iter()
    }

    pub fn len(&self) -> usize {
        self.objectives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objectives.is_empty()
    }

    /// Evaluates every objective on a solution.
    pub fn evaluate_all(&self, solution: &S) -> BTreeMap<String, f64> {
        self.objectives
            .iter()
            .map(|o| (o.name().to_string(), o.evaluate(solution)))
            .collect()
    }
}
