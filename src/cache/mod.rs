//! Lazily-loaded, evictable instance cache.
//!
//! Problem instances can be large and a batch can reference thousands of
//! them, so the cache holds weak handles: an instance stays in memory only
//! while some worker holds a strong reference to it. A miss is healed
//! transparently by reloading from disk.

mod source;
mod store;

pub use source::{Instance, InstanceLoadError, InstanceSource};
pub use store::InstanceCache;
