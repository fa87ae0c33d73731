//! Instance trait and pluggable instance sources.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// A fully-constructed problem instance.
///
/// The only thing the engine needs from an instance is a stable name that
/// uniquely identifies it within a run. Everything else is opaque domain
/// data consumed by algorithms.
pub trait Instance: Send + Sync + 'static {
    /// Unique, stable identifier for this instance.
    fn name(&self) -> &str;
}

/// Failure while listing or loading instances.
///
/// Load failures are local and synchronous: they surface to the immediate
/// caller of the cache and are never batched or deferred.
#[derive(Debug, Error)]
pub enum InstanceLoadError {
    /// I/O failure reading an instance file.
    #[error("failed to read instance at {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file was readable but its content is not a valid instance.
    #[error("failed to parse instance at {path:?}: {message}")]
    Parse { path: PathBuf, message: String },

    /// A name was requested that no solve-order computation ever produced.
    /// This is a programming error, not a runtime condition.
    #[error("unknown instance name: {name}")]
    UnknownInstance { name: String },
}

/// Supplies instances to the engine.
///
/// Implemented by the embedding application: typically lists files under a
/// per-experiment directory and parses them into domain instances. The
/// engine treats both operations as opaque.
pub trait InstanceSource<I: Instance>: Send + Sync {
    /// Paths of every instance configured for the given experiment.
    fn list(&self, experiment: &str) -> Result<Vec<PathBuf>, InstanceLoadError>;

    /// Loads the instance stored at `path`.
    fn load(&self, path: &Path) -> Result<I, InstanceLoadError>;
}
