//! Failure records and handlers.

use super::unit::WorkUnit;
use std::fs;
use std::path::{Path, PathBuf};

/// Everything known about one failed work unit.
///
/// Produced exactly once per failure and forwarded to the run's
/// [`FailureHandler`]. The batch keeps going: a failed unit still counts as
/// processed and sibling units are unaffected.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FailureRecord {
    pub experiment: String,
    pub algorithm: String,
    pub instance: String,
    pub repetition: usize,
    pub ordinal: u64,
    /// One-line description of what went wrong.
    pub summary: String,
    /// Longer diagnostic text, if any.
    pub trace: String,
}

impl FailureRecord {
    pub fn new(unit: &WorkUnit, summary: impl Into<String>, trace: impl Into<String>) -> Self {
        Self {
            experiment: unit.experiment.clone(),
            algorithm: unit.algorithm.clone(),
            instance: unit.instance.clone(),
            repetition: unit.repetition,
            ordinal: unit.ordinal,
            summary: summary.into(),
            trace: trace.into(),
        }
    }
}

/// Consumes failure records.
///
/// Invoked exactly once per failing unit, from the coordinating path.
/// Implementations must not panic: there is nothing above them to recover,
/// and a panicking handler takes the whole batch down. Handle your own
/// errors internally, the way [`LoggingFailureHandler`] does.
pub trait FailureHandler: Send + Sync {
    fn handle(&self, record: &FailureRecord);
}

/// Default handler: logs the failure and optionally persists it to disk.
#[derive(Debug, Clone, Default)]
pub struct LoggingFailureHandler {
    error_dir: Option<PathBuf>,
}

impl LoggingFailureHandler {
    /// Log-only handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Additionally writes one file per failure under `dir`.
    pub fn with_error_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            error_dir: Some(dir.into()),
        }
    }
}

impl FailureHandler for LoggingFailureHandler {
    fn handle(&self, record: &FailureRecord) {
        tracing::error!(
            experiment = %record.experiment,
            algorithm = %record.algorithm,
            instance = %record.instance,
            repetition = record.repetition,
            "error while solving, skipping unit: {}",
            record.summary
        );
        if !record.trace.is_empty() {
            tracing::debug!("failure trace: {}", record.trace);
        }
        if let Some(dir) = &self.error_dir {
            if let Err(e) = persist(dir, record) {
                tracing::error!("failed to persist failure record: {e}");
            }
        }
    }
}

fn persist(dir: &Path, record: &FailureRecord) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    let file = dir.join(format!(
        "{}_{}_{}_rep{}.error.log",
        record.experiment, record.algorithm, record.instance, record.repetition
    ));
    let body = format!(
        "experiment: {}\nalgorithm: {}\ninstance: {}\nrepetition: {}\nordinal: {}\nsummary: {}\ntrace:\n{}\n",
        record.experiment,
        record.algorithm,
        record.instance,
        record.repetition,
        record.ordinal,
        record.summary,
        record.trace
    );
    fs::write(file, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> FailureRecord {
        FailureRecord {
            experiment: "exp".to_string(),
            algorithm: "sa".to_string(),
            instance: "toy-1".to_string(),
            repetition: 2,
            ordinal: 11,
            summary: "no feasible solution".to_string(),
            trace: "stack goes here".to_string(),
        }
    }

    #[test]
    fn test_record_from_unit() {
        let unit = WorkUnit {
            experiment: "exp".to_string(),
            algorithm: "sa".to_string(),
            instance: "toy-1".to_string(),
            repetition: 2,
            ordinal: 11,
        };
        let record = FailureRecord::new(&unit, "bad", "details");
        assert_eq!(record.experiment, "exp");
        assert_eq!(record.ordinal, 11);
        assert_eq!(record.summary, "bad");
        assert_eq!(record.trace, "details");
    }

    #[test]
    fn test_log_only_handler_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let handler = LoggingFailureHandler::new();
        handler.handle(&record());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_handler_persists_to_error_dir() {
        let dir = tempfile::tempdir().unwrap();
        let handler = LoggingFailureHandler::with_error_dir(dir.path());
        handler.handle(&record());

        let path = dir.path().join("exp_sa_toy-1_rep2.error.log");
        let body = fs::read_to_string(path).unwrap();
        assert!(body.contains("no feasible solution"));
        assert!(body.contains("stack goes here"));
        assert!(body.contains("ordinal: 11"));
    }

    #[test]
    fn test_handler_swallows_io_errors() {
        // Pointing at a file path (not a directory) makes persistence fail;
        // the handler must absorb that instead of panicking.
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocked");
        fs::write(&blocker, "occupied").unwrap();
        let handler = LoggingFailureHandler::with_error_dir(blocker.join("sub"));
        handler.handle(&record());
    }
}
