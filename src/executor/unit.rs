//! Work units and their results.

use std::collections::BTreeMap;
use std::time::Duration;

/// One trial: an algorithm applied to an instance, one repetition.
///
/// Created by the executor while expanding an experiment, consumed exactly
/// once, never mutated. The ordinal is assigned at enumeration time and
/// uniquely determines the unit's random stream; it never depends on
/// execution order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorkUnit {
    pub experiment: String,
    pub algorithm: String,
    pub instance: String,
    pub repetition: usize,
    pub ordinal: u64,
}

/// The outcome of a successful work unit.
#[derive(Debug, Clone)]
pub struct WorkUnitResult<S> {
    pub unit: WorkUnit,
    pub solution: S,
    /// Every registered objective evaluated on the solution.
    pub scores: BTreeMap<String, f64>,
    pub execution_time: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_compare_by_value() {
        let a = WorkUnit {
            experiment: "e".to_string(),
            algorithm: "alg".to_string(),
            instance: "i".to_string(),
            repetition: 1,
            ordinal: 7,
        };
        let b = a.clone();
        assert_eq!(a, b);

        let c = WorkUnit { ordinal: 8, ..a.clone() };
        assert_ne!(a, c);
    }
}
