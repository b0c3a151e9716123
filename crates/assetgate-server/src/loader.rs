//! Manifest loading through the asset store.
//!
//! By default every call fetches the manifest again. With a non-zero TTL the
//! last good manifest is reused until it expires, so a deploy becomes visible
//! within one TTL. Failed loads are never cached.

use assetgate_manifest::{parse_manifest_slice, Manifest, ManifestError};
use assetgate_store::{AssetRequest, AssetStore, StoreError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("manifest fetch failed: {0}")]
    Store(#[from] StoreError),
    #[error("manifest request returned HTTP {0}")]
    Status(u16),
    #[error("invalid manifest: {0}")]
    Parse(#[from] ManifestError),
}

struct Cached {
    fetched_at: Instant,
    manifest: Arc<Manifest>,
}

pub struct ManifestLoader {
    path: String,
    ttl: Duration,
    cached: Mutex<Option<Cached>>,
}

impl ManifestLoader {
    pub fn new(path: &str, ttl: Duration) -> Self {
        Self {
            path: path.to_owned(),
            ttl,
            cached: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn load(&self, store: &dyn AssetStore) -> Result<Arc<Manifest>, LoadError> {
        if let Some(manifest) = self.cached() {
            debug!("manifest cache hit for {}", self.path);
            return Ok(manifest);
        }

        let resp = store.fetch(&AssetRequest::get(&self.path))?;
        if !resp.is_ok() {
            return Err(LoadError::Status(resp.status));
        }
        let manifest = parse_manifest_slice(&resp.body)?;
        for key in manifest.skipped_keys() {
            warn!("manifest {}: skipping entry '{key}', not an object", self.path);
        }
        let manifest = Arc::new(manifest);

        if !self.ttl.is_zero() {
            *self.slot() = Some(Cached {
                fetched_at: Instant::now(),
                manifest: Arc::clone(&manifest),
            });
        }
        Ok(manifest)
    }

    /// Drop any cached manifest.
    pub fn invalidate(&self) {
        *self.slot() = None;
    }

    /// The cache slot. A worker that panicked while holding it left either
    /// the old or the new entry, both complete, so poisoning is ignored.
    fn slot(&self) -> MutexGuard<'_, Option<Cached>> {
        self.cached.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cached(&self) -> Option<Arc<Manifest>> {
        if self.ttl.is_zero() {
            return None;
        }
        let slot = self.slot();
        let cached = slot.as_ref()?;
        (cached.fetched_at.elapsed() < self.ttl).then(|| Arc::clone(&cached.manifest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetgate_store::{AssetResponse, MemoryStore};

    const PATH: &str = "/.vite/manifest.json";

    fn store_with_manifest(body: &str) -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_file(PATH, "application/json", body.as_bytes());
        store
    }

    #[test]
    fn loads_manifest() {
        let store = store_with_manifest(r#"{"src/js/main.js": {"file": "js/main.js"}}"#);
        let loader = ManifestLoader::new(PATH, Duration::ZERO);
        let manifest = loader.load(&store).unwrap();
        assert_eq!(manifest.len(), 1);
    }

    #[test]
    fn non_200_is_unavailable() {
        let store = MemoryStore::new();
        store.insert(PATH, AssetResponse::text(503, "down"));
        let loader = ManifestLoader::new(PATH, Duration::ZERO);
        assert!(matches!(loader.load(&store), Err(LoadError::Status(503))));

        let missing = MemoryStore::new();
        assert!(matches!(loader.load(&missing), Err(LoadError::Status(404))));
    }

    #[test]
    fn invalid_body_is_unavailable() {
        let store = store_with_manifest("<html>not json</html>");
        let loader = ManifestLoader::new(PATH, Duration::ZERO);
        assert!(matches!(loader.load(&store), Err(LoadError::Parse(_))));
    }

    #[test]
    fn transport_failure_is_unavailable() {
        let store = MemoryStore::new();
        store.fail(PATH);
        let loader = ManifestLoader::new(PATH, Duration::ZERO);
        assert!(matches!(loader.load(&store), Err(LoadError::Store(_))));
    }

    #[test]
    fn zero_ttl_fetches_every_time() {
        let store = store_with_manifest("{}");
        let loader = ManifestLoader::new(PATH, Duration::ZERO);
        loader.load(&store).unwrap();
        loader.load(&store).unwrap();
        assert_eq!(store.request_count(PATH), 2);
    }

    #[test]
    fn ttl_reuses_manifest_until_invalidated() {
        let store = store_with_manifest("{}");
        let loader = ManifestLoader::new(PATH, Duration::from_secs(300));
        loader.load(&store).unwrap();
        loader.load(&store).unwrap();
        assert_eq!(store.request_count(PATH), 1);

        loader.invalidate();
        loader.load(&store).unwrap();
        assert_eq!(store.request_count(PATH), 2);
    }

    #[test]
    fn expired_entry_is_refetched() {
        let store = store_with_manifest("{}");
        let loader = ManifestLoader::new(PATH, Duration::from_millis(20));
        loader.load(&store).unwrap();
        std::thread::sleep(Duration::from_millis(40));
        loader.load(&store).unwrap();
        assert_eq!(store.request_count(PATH), 2);
    }

    #[test]
    fn poisoned_cache_keeps_working() {
        let store = store_with_manifest("{}");
        let loader = Arc::new(ManifestLoader::new(PATH, Duration::from_secs(300)));
        loader.load(&store).unwrap();

        let poisoner = Arc::clone(&loader);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.cached.lock().unwrap();
            panic!("worker died holding the cache");
        })
        .join();
        assert!(loader.cached.is_poisoned());

        loader.load(&store).unwrap();
        assert_eq!(store.request_count(PATH), 1);
        loader.invalidate();
        loader.load(&store).unwrap();
        assert_eq!(store.request_count(PATH), 2);
    }

    #[test]
    fn failures_are_not_cached() {
        let store = MemoryStore::new();
        let loader = ManifestLoader::new(PATH, Duration::from_secs(300));
        assert!(loader.load(&store).is_err());
        store.insert_file(PATH, "application/json", b"{}");
        assert!(loader.load(&store).is_ok());
    }
}
