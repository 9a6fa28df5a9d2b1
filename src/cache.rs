//! Memoization of chunk loudness keyed by content hash.
//!
//! Concurrent lookups of the same key share one in-flight computation.
//! The cache can be persisted as JSON so unchanged chunks are not
//! re-measured across runs; any persistence failure only costs a
//! recomputation.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::error::Result;

/// Persisted entries beyond this are pruned to the keys used by the
/// current run.
pub const DEFAULT_MAX_ENTRIES: usize = 200_000;

#[derive(Debug)]
pub struct VolumeCache {
    entries: Mutex<HashMap<String, Arc<OnceCell<f64>>>>,
    /// Keys looked up by this instance.
    touched: Mutex<HashSet<String>>,
    path: Option<PathBuf>,
    computed: AtomicUsize,
    max_entries: usize,
}

impl Default for VolumeCache {
    fn default() -> Self {
        Self {
            entries: Mutex::default(),
            touched: Mutex::default(),
            path: None,
            computed: AtomicUsize::new(0),
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl VolumeCache {
    /// A cache that lives only for this process.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a cache backed by a JSON file. A missing or unreadable file
    /// starts an empty cache.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let stored = match load_entries(&path) {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Ignoring volume cache {}: {}", path.display(), e);
                HashMap::new()
            }
        };
        debug!("Loaded {} cached volumes from {}", stored.len(), path.display());

        let entries = stored
            .into_iter()
            .map(|(key, value)| (key, Arc::new(OnceCell::new_with(Some(value)))))
            .collect();

        Self {
            entries: Mutex::new(entries),
            path: Some(path),
            ..Self::default()
        }
    }

    /// Limit the number of persisted entries.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Default location of the persisted cache.
    pub fn default_path() -> Option<PathBuf> {
        dirs::cache_dir().map(|p| p.join("autocut").join("volumes.json"))
    }

    /// Return the cached value for `key`, computing it at most once.
    ///
    /// Callers racing on the same key wait for the first computation. A
    /// failed computation leaves the key empty, so the next caller retries.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, compute: F) -> Result<f64>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<f64>>,
    {
        self.touched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string());

        let cell = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let value = cell
            .get_or_try_init(|| async move {
                self.computed.fetch_add(1, Ordering::Relaxed);
                compute().await
            })
            .await?;

        Ok(*value)
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).and_then(|cell| cell.get().copied())
    }

    /// Number of values computed (not served from cache) by this instance.
    pub fn computed_count(&self) -> usize {
        self.computed.load(Ordering::Relaxed)
    }

    /// Number of keys holding a value.
    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.values().filter(|cell| cell.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the cache to its backing file, if it has one.
    ///
    /// When the cache holds more than `max_entries` values, only the keys
    /// used by this instance are written.
    pub fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut snapshot: HashMap<String, f64> = {
            let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries
                .iter()
                .filter_map(|(key, cell)| cell.get().map(|v| (key.clone(), *v)))
                .collect()
        };

        if snapshot.len() > self.max_entries {
            let touched = self.touched.lock().unwrap_or_else(PoisonError::into_inner);
            let before = snapshot.len();
            snapshot.retain(|key, _| touched.contains(key));
            debug!(
                "Pruned volume cache from {} to {} entries",
                before,
                snapshot.len()
            );
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec(&snapshot)?)?;
        std::fs::rename(&tmp, path)?;

        debug!("Saved {} cached volumes to {}", snapshot.len(), path.display());
        Ok(())
    }
}

fn load_entries(path: &Path) -> Result<HashMap<String, f64>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let contents = std::fs::read(path)?;
    Ok(serde_json::from_slice(&contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AutocutError;
    use std::time::Duration;

    #[tokio::test]
    async fn test_computes_once_per_key() {
        let cache = VolumeCache::in_memory();

        let first = cache.get_or_compute("a", || async { Ok(-20.0) }).await.unwrap();
        let second = cache.get_or_compute("a", || async { Ok(-99.0) }).await.unwrap();

        assert_eq!(first, -20.0);
        assert_eq!(second, -20.0);
        assert_eq!(cache.computed_count(), 1);
        assert_eq!(cache.get("a"), Some(-20.0));
        assert_eq!(cache.get("b"), None);
    }

    #[tokio::test]
    async fn test_coalesces_concurrent_lookups() {
        let cache = Arc::new(VolumeCache::in_memory());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute("shared", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(-33.0)
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), -33.0);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_computation_is_retried() {
        let cache = VolumeCache::in_memory();

        let result = cache
            .get_or_compute("k", || async { Err(AutocutError::ffmpeg("boom")) })
            .await;
        assert!(result.is_err());
        assert!(cache.is_empty());

        let value = cache.get_or_compute("k", || async { Ok(-10.0) }).await.unwrap();
        assert_eq!(value, -10.0);
    }

    #[tokio::test]
    async fn test_persist_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("volumes.json");

        let cache = VolumeCache::open(&path);
        cache.get_or_compute("x", || async { Ok(-42.5) }).await.unwrap();
        cache.persist().unwrap();

        let reopened = VolumeCache::open(&path);
        assert_eq!(reopened.get("x"), Some(-42.5));
        let value = reopened
            .get_or_compute("x", || async { Ok(0.0) })
            .await
            .unwrap();
        assert_eq!(value, -42.5);
        assert_eq!(reopened.computed_count(), 0);
    }

    #[tokio::test]
    async fn test_persisted_values_are_bit_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("volumes.json");
        let values = [-12.247198959355488, -30.30899869919436, 0.1 + 0.2, -1e-300];

        let cache = VolumeCache::open(&path);
        for (i, v) in values.iter().enumerate() {
            let v = *v;
            cache.get_or_compute(&i.to_string(), || async move { Ok(v) }).await.unwrap();
        }
        cache.persist().unwrap();

        let reopened = VolumeCache::open(&path);
        for (i, v) in values.iter().enumerate() {
            assert_eq!(reopened.get(&i.to_string()).map(f64::to_bits), Some(v.to_bits()));
        }
    }

    #[tokio::test]
    async fn test_persist_prunes_to_used_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("volumes.json");

        let cache = VolumeCache::open(&path);
        for key in ["a", "b", "c"] {
            cache.get_or_compute(key, || async { Ok(-1.0) }).await.unwrap();
        }
        cache.persist().unwrap();

        // Under the limit nothing is dropped.
        let reopened = VolumeCache::open(&path).with_max_entries(3);
        reopened.get_or_compute("b", || async { Ok(0.0) }).await.unwrap();
        reopened.persist().unwrap();
        assert_eq!(VolumeCache::open(&path).len(), 3);

        // Over the limit only the keys used this run survive.
        let reopened = VolumeCache::open(&path).with_max_entries(2);
        reopened.get_or_compute("b", || async { Ok(0.0) }).await.unwrap();
        reopened.get_or_compute("d", || async { Ok(-2.0) }).await.unwrap();
        reopened.persist().unwrap();

        let pruned = VolumeCache::open(&path);
        assert_eq!(pruned.len(), 2);
        assert_eq!(pruned.get("b"), Some(-1.0));
        assert_eq!(pruned.get("d"), Some(-2.0));
        assert_eq!(pruned.get("a"), None);
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("volumes.json");
        std::fs::write(&path, b"not json").unwrap();

        let cache = VolumeCache::open(&path);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_in_memory_persist_is_noop() {
        assert!(VolumeCache::in_memory().persist().is_ok());
    }
}
