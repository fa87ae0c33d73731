//! The cache itself.

use super::source::{Instance, InstanceLoadError, InstanceSource};
use crate::error::ConfigurationError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// Caches instances by path with evictable ownership.
///
/// Entries hold [`Weak`] handles: once the last worker drops its strong
/// reference, the instance is freed and the entry silently dies. The next
/// access reloads from the path and replaces the entry, which keeps memory
/// bounded no matter how many instances a batch touches.
///
/// All internal state sits behind a single mutex. Instance loads are rare
/// compared to algorithm run time, so one mutual-exclusion point per cache
/// is enough and concurrent `get` calls can never observe a half-updated
/// entry.
pub struct InstanceCache<I: Instance> {
    source: Box<dyn InstanceSource<I>>,
    state: Mutex<CacheState<I>>,
}

struct CacheState<I> {
    by_path: HashMap<PathBuf, Weak<I>>,
    /// Name to path index. Stable for the whole run once first observed.
    path_of: HashMap<String, PathBuf>,
    /// Memoized per-experiment solve order.
    solve_orders: HashMap<String, Vec<String>>,
}

impl<I: Instance> InstanceCache<I> {
    pub fn new(source: Box<dyn InstanceSource<I>>) -> Self {
        Self {
            source,
            state: Mutex::new(CacheState {
                by_path: HashMap::new(),
                path_of: HashMap::new(),
                solve_orders: HashMap::new(),
            }),
        }
    }

    /// Computes the order in which an experiment's instances are solved.
    ///
    /// Walks the configured source once, loading every instance to validate
    /// it, and returns the instance names sorted lexicographically. The
    /// order is deterministic and memoized, so repeated runs and different
    /// worker counts always dispatch identically.
    ///
    /// Fails fast, before any work unit exists, if the source is empty or
    /// two instances report the same name.
    pub fn solve_order(&self, experiment: &str) -> Result<Vec<String>, ConfigurationError> {
        let mut state = self.lock();
        if let Some(order) = state.solve_orders.get(experiment) {
            return Ok(order.clone());
        }

        let paths = self.source.list(experiment).map_err(|e| {
            ConfigurationError::InstanceSource {
                experiment: experiment.to_string(),
                message: e.to_string(),
            }
        })?;

        tracing::debug!(
            experiment,
            count = paths.len(),
            "loading all instances to validate and sort"
        );

        // Keep strong references alive until the whole batch validated.
        let mut loaded: Vec<(String, PathBuf, Arc<I>)> = Vec::with_capacity(paths.len());
        for path in paths {
            let instance = self.source.load(&path).map_err(|e| {
                ConfigurationError::InstanceSource {
                    experiment: experiment.to_string(),
                    message: e.to_string(),
                }
            })?;
            loaded.push((instance.name().to_string(), path, Arc::new(instance)));
        }

        if loaded.is_empty() {
            return Err(ConfigurationError::EmptyInstanceSource {
                experiment: experiment.to_string(),
            });
        }

        let mut names = std::collections::HashSet::new();
        for (name, _, _) in &loaded {
            if !names.insert(name.clone()) {
                return Err(ConfigurationError::DuplicateInstanceName { name: name.clone() });
            }
        }

        for (name, path, instance) in &loaded {
            state.by_path.insert(path.clone(), Arc::downgrade(instance));
            state.path_of.insert(name.clone(), path.clone());
        }

        let mut order: Vec<String> = loaded.into_iter().map(|(name, _, _)| name).collect();
        order.sort();
        tracing::info!(experiment, instances = order.len(), "instance validation completed");

        state
            .solve_orders
            .insert(experiment.to_string(), order.clone());
        Ok(order)
    }

    /// Returns the instance with the given name.
    ///
    /// Names only come from [`InstanceCache::solve_order`]; asking for one
    /// that was never produced is a programming error and yields
    /// [`InstanceLoadError::UnknownInstance`].
    pub fn get(&self, name: &str) -> Result<Arc<I>, InstanceLoadError> {
        let mut state = self.lock();
        let path = state
            .path_of
            .get(name)
            .cloned()
            .ok_or_else(|| InstanceLoadError::UnknownInstance {
                name: name.to_string(),
            })?;
        self.get_locked(&mut state, &path)
    }

    /// Returns the instance stored at `path`, loading it if the cached
    /// handle has been evicted. A reload is indistinguishable from a hit
    /// apart from latency and a cache-miss log line.
    pub fn get_by_path(&self, path: &Path) -> Result<Arc<I>, InstanceLoadError> {
        let mut state = self.lock();
        self.get_locked(&mut state, path)
    }

    /// Drops every cached handle; the next access reloads from disk.
    ///
    /// The name index and memoized solve orders survive: the name to path
    /// mapping is stable for the whole run once observed.
    pub fn purge(&self) {
        let mut state = self.lock();
        state.by_path.clear();
    }

    /// How many entries currently hold a live instance.
    pub fn live_entries(&self) -> usize {
        let state = self.lock();
        state
            .by_path
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    fn get_locked(
        &self,
        state: &mut CacheState<I>,
        path: &Path,
    ) -> Result<Arc<I>, InstanceLoadError> {
        if let Some(instance) = state.by_path.get(path).and_then(Weak::upgrade) {
            return Ok(instance);
        }
        tracing::debug!(path = %path.display(), "instance cache miss, reloading");
        let instance = Arc::new(self.source.load(path)?);
        state
            .by_path
            .insert(path.to_path_buf(), Arc::downgrade(&instance));
        state
            .path_of
            .insert(instance.name().to_string(), path.to_path_buf());
        Ok(instance)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState<I>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct TestInstance {
        name: String,
        payload: Vec<u32>,
    }

    impl Instance for TestInstance {
        fn name(&self) -> &str {
            &self.name
        }
    }

    /// In-memory source: path stem is the instance name.
    struct MapSource {
        paths: Vec<PathBuf>,
        loads: Arc<AtomicUsize>,
        /// Optional override producing duplicate names.
        fixed_name: Option<String>,
    }

    impl MapSource {
        fn new(names: &[&str]) -> Self {
            Self {
                paths: names
                    .iter()
                    .map(|n| PathBuf::from(format!("/instances/{n}.dat")))
                    .collect(),
                loads: Arc::new(AtomicUsize::new(0)),
                fixed_name: None,
            }
        }

        fn with_fixed_name(mut self, name: &str) -> Self {
            self.fixed_name = Some(name.to_string());
            self
        }
    }

    impl InstanceSource<TestInstance> for MapSource {
        fn list(&self, _experiment: &str) -> Result<Vec<PathBuf>, InstanceLoadError> {
            Ok(self.paths.clone())
        }

        fn load(&self, path: &Path) -> Result<TestInstance, InstanceLoadError> {
            self.loads.fetch_add(1, Ordering::Relaxed);
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| InstanceLoadError::Parse {
                    path: path.to_path_buf(),
                    message: "bad file name".to_string(),
                })?;
            let name = self.fixed_name.clone().unwrap_or_else(|| stem.to_string());
            Ok(TestInstance {
                name,
                payload: (0..8).map(|i| i * stem.len() as u32).collect(),
            })
        }
    }

    fn cache(names: &[&str]) -> (InstanceCache<TestInstance>, Arc<AtomicUsize>) {
        let source = MapSource::new(names);
        let loads = Arc::clone(&source.loads);
        (InstanceCache::new(Box::new(source)), loads)
    }

    fn load_count(loads: &Arc<AtomicUsize>) -> usize {
        loads.load(Ordering::Relaxed)
    }

    #[test]
    fn test_solve_order_is_sorted() {
        let (cache, _) = cache(&["b", "a", "c"]);
        let order = cache.solve_order("exp").unwrap();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_solve_order_is_memoized() {
        let (cache, loads) = cache(&["a", "b"]);
        let first = cache.solve_order("exp").unwrap();
        let loads_after_first = load_count(&loads);
        let second = cache.solve_order("exp").unwrap();
        assert_eq!(first, second);
        assert_eq!(load_count(&loads), loads_after_first, "second call must not reload");
    }

    #[test]
    fn test_empty_source_rejected() {
        let (cache, _) = cache(&[]);
        let err = cache.solve_order("exp").unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::EmptyInstanceSource { .. }
        ));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let source = Box::new(MapSource::new(&["one", "two"]).with_fixed_name("X"));
        let cache = InstanceCache::new(source);
        let err = cache.solve_order("exp").unwrap_err();
        match err {
            ConfigurationError::DuplicateInstanceName { name } => assert_eq!(name, "X"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_get_by_name_after_solve_order() {
        let (cache, _) = cache(&["alpha", "beta"]);
        cache.solve_order("exp").unwrap();
        let instance = cache.get("alpha").unwrap();
        assert_eq!(instance.name(), "alpha");
        assert!(!instance.payload.is_empty());
    }

    #[test]
    fn test_get_unknown_name_is_error() {
        let (cache, _) = cache(&["alpha"]);
        cache.solve_order("exp").unwrap();
        let err = cache.get("nope").unwrap_err();
        assert!(matches!(err, InstanceLoadError::UnknownInstance { .. }));
    }

    #[test]
    fn test_eviction_heals_transparently() {
        let (cache, loads) = cache(&["alpha"]);
        cache.solve_order("exp").unwrap();
        let loads_after_order = load_count(&loads);

        // Nothing holds a strong reference after solve_order returns, so the
        // entry is already dead and this access must reload.
        let first = cache.get("alpha").unwrap();
        assert_eq!(load_count(&loads), loads_after_order + 1);

        // While a strong reference lives, further gets are hits.
        let second = cache.get("alpha").unwrap();
        assert_eq!(load_count(&loads), loads_after_order + 1);
        assert!(Arc::ptr_eq(&first, &second));

        // Drop everything, the entry evaporates, the next get heals it.
        drop(first);
        drop(second);
        let reloaded = cache.get("alpha").unwrap();
        assert_eq!(load_count(&loads), loads_after_order + 2);
        assert_eq!(reloaded.name(), "alpha");
    }

    #[test]
    fn test_get_by_path_without_solve_order() {
        let (cache, _) = cache(&[]);
        let instance = cache
            .get_by_path(Path::new("/instances/direct.dat"))
            .unwrap();
        assert_eq!(instance.name(), "direct");
        // The name index learned the mapping from the reload.
        let again = cache.get("direct").unwrap();
        assert!(Arc::ptr_eq(&instance, &again));
    }

    #[test]
    fn test_purge_drops_entries_keeps_index() {
        let (cache, loads) = cache(&["alpha"]);
        cache.solve_order("exp").unwrap();
        let held = cache.get("alpha").unwrap();
        assert_eq!(cache.live_entries(), 1);

        cache.purge();
        assert_eq!(cache.live_entries(), 0);

        // The name still resolves, the instance is simply reloaded.
        let loads_before = load_count(&loads);
        let reloaded = cache.get("alpha").unwrap();
        assert_eq!(load_count(&loads), loads_before + 1);
        assert_eq!(reloaded.name(), held.name());
        assert!(!Arc::ptr_eq(&held, &reloaded));
    }

    #[test]
    fn test_load_failure_surfaces_to_caller() {
        struct FailingSource;
        impl InstanceSource<TestInstance> for FailingSource {
            fn list(&self, _: &str) -> Result<Vec<PathBuf>, InstanceLoadError> {
                Ok(vec![PathBuf::from("/gone.dat")])
            }
            fn load(&self, path: &Path) -> Result<TestInstance, InstanceLoadError> {
                Err(InstanceLoadError::Io {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
                })
            }
        }

        let cache = InstanceCache::new(Box::new(FailingSource));
        let err = cache.get_by_path(Path::new("/gone.dat")).unwrap_err();
        assert!(matches!(err, InstanceLoadError::Io { .. }));
    }

    #[test]
    fn test_concurrent_gets_see_consistent_entries() {
        let (cache, _) = cache(&["shared"]);
        cache.solve_order("exp").unwrap();
        let cache = Arc::new(cache);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.get("shared").unwrap().name().to_string())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), "shared");
        }
    }
}
