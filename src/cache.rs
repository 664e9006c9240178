//! Fetch-once caching over a pluggable key-value store
//!
//! [`FetchOnceCache::get_or_set`] serves fresh entries straight from the
//! [`CacheStore`] and otherwise runs the producer at most once per key, no
//! matter how many callers ask concurrently. The producer runs on its own
//! task so a caller that gets cancelled neither aborts the fetch nor leaves
//! its in-flight registration behind.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use fjall::Keyspace;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::task;
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::error::RouteAiError;

/// Minimal key-value capability the cache needs from a backend
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Remove every key starting with `prefix`, returning how many went.
    ///
    /// Best effort: backends that cannot enumerate keys keep this default
    /// and remove nothing.
    async fn delete_matching(&self, _prefix: &str) -> Result<usize> {
        Ok(0)
    }
}

/// Process-local store, mostly for tests and single-instance deployments
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryCacheStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, (String, Instant)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries();
        match entries.get(key) {
            Some((value, expires_at)) if Instant::now() < *expires_at => Ok(Some(value.clone())),
            Some(_) => {
                debug!(key, "Key found but expired");
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or(anyhow!("TTL overflow"))?;
        self.entries()
            .insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries().remove(key);
        Ok(())
    }

    async fn delete_matching(&self, prefix: &str) -> Result<usize> {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok(before - entries.len())
    }
}

#[derive(Serialize, Deserialize)]
struct StoredEntry {
    value: String,
    expires_at: u64, // Unix timestamp (seconds)
}

/// Persistent store on a fjall keyspace, entries encoded with postcard
pub struct FjallCacheStore {
    _db: fjall::Database,
    store: Keyspace,
}

fn get_from_store(store: Keyspace, key: Vec<u8>) -> Result<Option<Vec<u8>>> {
    Ok(store.get(key)?.map(|v| v.to_vec()))
}

fn unix_now() -> Result<u64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

impl FjallCacheStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = fjall::Database::builder(&path).open()?;
        let items = db.keyspace("cache", fjall::KeyspaceCreateOptions::default)?;
        Ok(Self {
            _db: db,
            store: items,
        })
    }
}

#[async_trait]
impl CacheStore for FjallCacheStore {
    #[tracing::instrument(name = "query_cache", level = "debug", skip(self))]
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let store = self.store.clone();
        let key_bytes = key.as_bytes().to_vec();

        let maybe_bytes: Option<Vec<u8>> =
            task::spawn_blocking(move || get_from_store(store, key_bytes)).await??;

        let Some(bytes) = maybe_bytes else {
            debug!("Key not found");
            return Ok(None);
        };

        let entry: StoredEntry = postcard::from_bytes(&bytes)?;
        if unix_now()? < entry.expires_at {
            debug!("Key found and still fresh");
            Ok(Some(entry.value))
        } else {
            debug!("Key found but expired");
            self.delete(key).await?;
            Ok(None)
        }
    }

    #[tracing::instrument(name = "put_cache", level = "debug", skip(self, value))]
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let store = self.store.clone();
        let key = key.as_bytes().to_vec();
        let expires_at = SystemTime::now()
            .checked_add(ttl)
            .ok_or(anyhow!("TTL overflow"))?
            .duration_since(UNIX_EPOCH)?
            .as_secs();
        let entry = StoredEntry {
            value: value.to_string(),
            expires_at,
        };
        let bytes = postcard::to_stdvec(&entry)?;

        task::spawn_blocking(move || store.insert(key, bytes)).await??;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let key = key.as_bytes().to_vec();
        let store = self.store.clone();
        task::spawn_blocking(move || store.remove(key)).await??;
        Ok(())
    }
}

/// Build the store selected in the configuration
pub fn store_from_config(config: &CacheConfig) -> Result<Arc<dyn CacheStore>> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryCacheStore::new())),
        "fjall" => {
            let path = config
                .location
                .as_ref()
                .map(PathBuf::from)
                .or_else(|| dirs::cache_dir().map(|dir| dir.join("routeai")))
                .ok_or(anyhow!("Unable to determine cache directory"))?;
            Ok(Arc::new(FjallCacheStore::open(path)?))
        }
        other => Err(RouteAiError::config(format!("Unknown cache backend '{other}'")).into()),
    }
}

/// Counters exposed for operators; `degraded` counts swallowed producer failures
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    degraded: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub coalesced: u64,
    pub degraded: u64,
}

impl CacheStats {
    fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            degraded: self.degraded.load(Ordering::Relaxed),
        }
    }
}

/// Result of one producer run, fanned out to every waiter
#[derive(Clone)]
enum Outcome {
    Value(String),
    Failed(RouteAiError),
    Degraded,
}

type InFlight = Shared<BoxFuture<'static, Outcome>>;
type InFlightMap = Arc<Mutex<HashMap<String, InFlight>>>;

/// Removes the in-flight registration when the producer task ends, however it ends
struct InFlightGuard {
    map: InFlightMap,
    key: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.map
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

/// Memoization layer with at most one concurrent producer per key
#[derive(Clone)]
pub struct FetchOnceCache {
    store: Arc<dyn CacheStore>,
    in_flight: InFlightMap,
    stats: Arc<CacheStats>,
}

impl FetchOnceCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            stats: Arc::new(CacheStats::default()),
        }
    }

    /// Return the cached value for `key`, or compute it with `producer`.
    ///
    /// A producer failing with [`RouteAiError`] yields `Err`; any other
    /// failure yields `Ok(None)` and is logged and counted as degraded.
    #[tracing::instrument(name = "fetch_once", level = "debug", skip(self, producer))]
    pub async fn get_or_set<T, F, Fut>(
        &self,
        key: &str,
        producer: F,
        ttl: Duration,
    ) -> crate::Result<Option<T>>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        if let Some(value) = self.read_fresh::<T>(key).await {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Some(value));
        }
        self.stats.misses.fetch_add(1, Ordering::Relaxed);

        match self.join_or_start(key, producer, ttl).await {
            Outcome::Value(raw) => match serde_json::from_str(&raw) {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    self.stats.degraded.fetch_add(1, Ordering::Relaxed);
                    warn!(key, error = %e, "Fetched value could not be decoded");
                    Ok(None)
                }
            },
            Outcome::Failed(err) => Err(err),
            Outcome::Degraded => Ok(None),
        }
    }

    /// Remove a single entry
    pub async fn invalidate(&self, key: &str) -> crate::Result<()> {
        self.store
            .delete(key)
            .await
            .map_err(|e| RouteAiError::cache(format!("Failed to invalidate '{key}': {e}")))
    }

    /// Remove entries by pattern; a trailing `*` matches any suffix.
    ///
    /// Returns the number of removed entries as reported by the store, which
    /// is 0 on backends without key enumeration.
    pub async fn invalidate_pattern(&self, pattern: &str) -> crate::Result<usize> {
        match pattern.strip_suffix('*') {
            Some(prefix) => self.store.delete_matching(prefix).await.map_err(|e| {
                RouteAiError::cache(format!("Failed to invalidate '{pattern}': {e}"))
            }),
            None => self.invalidate(pattern).await.map(|()| 1),
        }
    }

    #[must_use]
    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    /// Number of keys with a producer currently running
    #[must_use]
    pub fn in_flight_len(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    async fn read_fresh<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Cached value could not be decoded, refreshing");
                None
            }
        }
    }

    fn join_or_start<T, F, Fut>(&self, key: &str, producer: F, ttl: Duration) -> InFlight
    where
        T: Serialize + Send + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = in_flight.get(key) {
            self.stats.coalesced.fetch_add(1, Ordering::Relaxed);
            debug!(key, "Joining in-flight fetch");
            return existing.clone();
        }

        // The guard needs this lock to deregister, so the task cannot finish
        // its cleanup before the entry below is inserted.
        let guard = InFlightGuard {
            map: Arc::clone(&self.in_flight),
            key: key.to_string(),
        };
        let store = Arc::clone(&self.store);
        let stats = Arc::clone(&self.stats);
        let owned_key = key.to_string();
        let fut = producer();

        let handle = tokio::spawn(async move {
            let _guard = guard;
            run_producer(store, stats, owned_key, fut, ttl).await
        });

        let shared = async move {
            handle.await.unwrap_or_else(|e| {
                warn!(error = %e, "Producer task did not complete");
                Outcome::Degraded
            })
        }
        .boxed()
        .shared();

        in_flight.insert(key.to_string(), shared.clone());
        shared
    }
}

async fn run_producer<T, Fut>(
    store: Arc<dyn CacheStore>,
    stats: Arc<CacheStats>,
    key: String,
    fut: Fut,
    ttl: Duration,
) -> Outcome
where
    T: Serialize,
    Fut: Future<Output = Result<T>>,
{
    let value = match fut.await {
        Ok(value) => value,
        Err(err) => {
            return match err.downcast::<RouteAiError>() {
                Ok(known) => Outcome::Failed(known),
                Err(other) => {
                    stats.degraded.fetch_add(1, Ordering::Relaxed);
                    warn!(key = %key, error = %other, "Producer failed, serving no value");
                    Outcome::Degraded
                }
            };
        }
    };

    let raw = match serde_json::to_string(&value) {
        Ok(raw) => raw,
        Err(e) => {
            stats.degraded.fetch_add(1, Ordering::Relaxed);
            warn!(key = %key, error = %e, "Fetched value could not be encoded");
            return Outcome::Degraded;
        }
    };

    if let Err(e) = store.set(&key, &raw, ttl).await {
        warn!(key = %key, error = %e, "Failed to store fetched value");
    }
    Outcome::Value(raw)
}
