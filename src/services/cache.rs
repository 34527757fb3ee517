// src/services/cache.rs
//! Shared key/value cache for research results.
//!
//! Values are stored as JSON with a per-entry TTL. `CacheService` never
//! surfaces backend failures: reads degrade to a miss and writes report
//! `false`, with the failure logged.

use crate::config::Settings;
use crate::error::CacheError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[async_trait]
pub trait CacheBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    async fn clear(&self) -> Result<(), CacheError>;

    /// Live entry count, when the backend can report it cheaply.
    async fn len(&self) -> Option<usize>;
}

/// One cached value. `expires_at` is `None` when the TTL is too large to
/// represent as an `Instant`; such entries live until deleted.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    created_at: Instant,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(value: String, ttl: Duration) -> Self {
        let created_at = Instant::now();
        Self {
            value,
            created_at,
            expires_at: created_at.checked_add(ttl),
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |exp| now < exp)
    }
}

/// In-process backend. Expired entries are dropped lazily on read.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    // Every critical section leaves the map consistent, so a poisoned lock is safe to reuse
    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Age of a live entry.
    pub fn age(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.entries()
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| now.saturating_duration_since(entry.created_at))
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self.entries();
        let now = Instant::now();

        let expired = match entries.get(key) {
            Some(entry) if entry.is_live(now) => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let entry = CacheEntry::new(value, ttl);
        self.entries().insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries().remove(key).is_some())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.entries().clear();
        Ok(())
    }

    async fn len(&self) -> Option<usize> {
        let now = Instant::now();
        Some(self.entries().values().filter(|entry| entry.is_live(now)).count())
    }
}

#[cfg(feature = "redis-cache")]
pub use redis_backend::RedisBackend;

#[cfg(feature = "redis-cache")]
mod redis_backend {
    use super::{CacheBackend, CacheError};
    use async_trait::async_trait;
    use redis::aio::MultiplexedConnection;
    use std::time::Duration;

    /// Redis backend. `SET ... PX` makes each write a single atomic command.
    #[derive(Clone)]
    pub struct RedisBackend {
        connection: MultiplexedConnection,
    }

    impl RedisBackend {
        pub async fn connect(url: &str) -> Result<Self, CacheError> {
            let client = redis::Client::open(url).map_err(backend_err)?;
            let connection = client
                .get_multiplexed_async_connection()
                .await
                .map_err(backend_err)?;
            Ok(Self { connection })
        }
    }

    fn backend_err(e: redis::RedisError) -> CacheError {
        CacheError::Backend(e.to_string())
    }

    #[async_trait]
    impl CacheBackend for RedisBackend {
        fn name(&self) -> &'static str {
            "redis"
        }

        async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
            let mut conn = self.connection.clone();
            redis::cmd("GET")
                .arg(key)
                .query_async(&mut conn)
                .await
                .map_err(backend_err)
        }

        async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
            let mut conn = self.connection.clone();
            let millis = ttl.as_millis().clamp(1, i64::MAX as u128) as u64;
            redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("PX")
                .arg(millis)
                .query_async::<_, ()>(&mut conn)
                .await
                .map_err(backend_err)
        }

        async fn delete(&self, key: &str) -> Result<bool, CacheError> {
            let mut conn = self.connection.clone();
            let removed: i64 = redis::cmd("DEL")
                .arg(key)
                .query_async(&mut conn)
                .await
                .map_err(backend_err)?;
            Ok(removed > 0)
        }

        async fn clear(&self) -> Result<(), CacheError> {
            let mut conn = self.connection.clone();
            redis::cmd("FLUSHDB")
                .query_async::<_, ()>(&mut conn)
                .await
                .map_err(backend_err)
        }

        async fn len(&self) -> Option<usize> {
            let mut conn = self.connection.clone();
            redis::cmd("DBSIZE")
                .query_async::<_, usize>(&mut conn)
                .await
                .ok()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub backend: &'static str,
    pub entries: Option<usize>,
    pub hits: u64,
    pub misses: u64,
}

/// Cache facade shared across concurrent runs.
#[derive(Clone)]
pub struct CacheService {
    backend: Arc<dyn CacheBackend>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl CacheService {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Redis when `redis_url` is set and the `redis-cache` feature is enabled,
    /// memory otherwise. A failed Redis connection falls back to memory.
    pub async fn from_settings(settings: &Settings) -> Self {
        match settings.redis_url.as_deref() {
            #[cfg(feature = "redis-cache")]
            Some(url) => match RedisBackend::connect(url).await {
                Ok(backend) => {
                    info!("🗄️ Using Redis cache backend");
                    Self::new(Arc::new(backend))
                }
                Err(e) => {
                    warn!("⚠️ Redis unavailable ({}), using in-memory cache", e);
                    Self::in_memory()
                }
            },
            #[cfg(not(feature = "redis-cache"))]
            Some(_) => {
                warn!("⚠️ REDIS_URL is set but the redis-cache feature is disabled, using in-memory cache");
                Self::in_memory()
            }
            None => {
                info!("🗄️ Using in-memory cache backend");
                Self::in_memory()
            }
        }
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        let raw = match self.backend.get(key).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Cache get failed for '{}': {}", key, e);
                None
            }
        };

        let value = raw.and_then(|s| match serde_json::from_str::<Value>(&s) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Discarding undecodable cache entry '{}': {}", key, e);
                None
            }
        });

        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("Cache hit: {}", key);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!("Cache miss: {}", key);
        }
        value
    }

    /// Typed read. An entry that no longer matches `T` is treated as a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key).await?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Cache entry '{}' has an unexpected shape: {}", key, e);
                None
            }
        }
    }

    pub async fn set(&self, key: &str, value: Value, ttl: Duration) -> bool {
        let encoded = match serde_json::to_string(&value) {
            Ok(s) => s,
            Err(e) => {
                warn!("Cache encode failed for '{}': {}", key, e);
                return false;
            }
        };
        match self.backend.set(key, encoded, ttl).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Cache set failed for '{}': {}", key, e);
                false
            }
        }
    }

    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        match serde_json::to_value(value) {
            Ok(v) => self.set(key, v, ttl).await,
            Err(e) => {
                warn!("Cache encode failed for '{}': {}", key, e);
                false
            }
        }
    }

    pub async fn delete(&self, key: &str) -> bool {
        match self.backend.delete(key).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!("Cache delete failed for '{}': {}", key, e);
                false
            }
        }
    }

    pub async fn clear(&self) -> bool {
        match self.backend.clear().await {
            Ok(()) => true,
            Err(e) => {
                warn!("Cache clear failed: {}", e);
                false
            }
        }
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            backend: self.backend.name(),
            entries: self.backend.len().await,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_round_trip_and_delete() {
        let cache = CacheService::in_memory();
        let value = json!({"game_info": {"name": "Hades II"}, "research_type": "game"});

        assert!(cache.set("game_research:Hades II:en", value.clone(), Duration::from_secs(60)).await);
        assert_eq!(cache.get("game_research:Hades II:en").await, Some(value));
        assert!(cache.delete("game_research:Hades II:en").await);
        assert!(!cache.delete("game_research:Hades II:en").await);
        assert_eq!(cache.get("game_research:Hades II:en").await, None);
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache = CacheService::in_memory();
        assert!(cache.set("k", json!(1), Duration::from_millis(50)).await);
        assert_eq!(cache.get("k").await, Some(json!(1)));

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn test_stats_and_clear() {
        let cache = CacheService::in_memory();
        cache.set("a", json!("x"), Duration::from_secs(60)).await;
        cache.set("b", json!("y"), Duration::from_secs(60)).await;
        cache.get("a").await;
        cache.get("missing").await;

        let stats = cache.stats().await;
        assert_eq!(stats.backend, "memory");
        assert_eq!(stats.entries, Some(2));
        assert_eq!((stats.hits, stats.misses), (1, 1));

        assert!(cache.clear().await);
        assert_eq!(cache.stats().await.entries, Some(0));
    }

    struct BrokenBackend;

    #[async_trait]
    impl CacheBackend for BrokenBackend {
        fn name(&self) -> &'static str {
            "broken"
        }
        async fn get(&self, _: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Backend("connection refused".into()))
        }
        async fn set(&self, _: &str, _: String, _: Duration) -> Result<(), CacheError> {
            Err(CacheError::Backend("connection refused".into()))
        }
        async fn delete(&self, _: &str) -> Result<bool, CacheError> {
            Err(CacheError::Backend("connection refused".into()))
        }
        async fn clear(&self) -> Result<(), CacheError> {
            Err(CacheError::Backend("connection reset".into()))
        }
        async fn len(&self) -> Option<usize> {
            None
        }
    }

    #[tokio::test]
    async fn test_unrepresentable_ttl_never_expires() {
        let cache = CacheService::in_memory();
        assert!(cache.set("forever", json!("kept"), Duration::MAX).await);
        assert_eq!(cache.get("forever").await, Some(json!("kept")));

        // The cache stays usable for everyone else
        assert!(cache.set("other", json!(2), Duration::from_secs(60)).await);
        assert_eq!(cache.get("other").await, Some(json!(2)));
        assert_eq!(cache.stats().await.entries, Some(2));
    }

    #[tokio::test]
    async fn test_poisoned_lock_is_recovered() {
        let backend = MemoryBackend::new();
        let shared = backend.clone();
        let _ = std::thread::spawn(move || {
            let _guard = shared.entries.lock().unwrap();
            panic!("writer died holding the lock");
        })
        .join();
        assert!(backend.entries.is_poisoned());

        let cache = CacheService::new(Arc::new(backend));
        assert!(cache.set("k", json!(1), Duration::from_secs(60)).await);
        assert_eq!(cache.get("k").await, Some(json!(1)));
        assert!(cache.delete("k").await);
    }

    #[tokio::test]
    async fn test_entries_record_creation_time() {
        let backend = MemoryBackend::new();
        backend.set("k", "1".to_string(), Duration::from_secs(60)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let age = backend.age("k").unwrap();
        assert!(age >= Duration::from_millis(20));
        assert!(age < Duration::from_secs(60));
        assert_eq!(backend.age("missing"), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_access_to_one_key() {
        const WRITERS: usize = 8;
        const ROUNDS: usize = 50;

        let cache = CacheService::in_memory();
        let payload = |writer: usize| json!({"writer": writer, "payload": "x".repeat(512)});

        let mut handles = Vec::new();
        for writer in 0..WRITERS {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                let mut observed = Vec::new();
                for _ in 0..ROUNDS {
                    assert!(cache.set("shared", payload(writer), Duration::from_secs(60)).await);
                    observed.push(cache.get("shared").await);
                }
                observed
            }));
        }

        let mut reads = 0u64;
        for handle in handles {
            for value in handle.await.unwrap() {
                reads += 1;
                // Our own write precedes every read, so the key is always present
                let value = value.expect("key was written before the read");
                let writer = value["writer"].as_u64().unwrap() as usize;
                assert!(writer < WRITERS);
                assert_eq!(value, payload(writer));
            }
        }

        let stats = cache.stats().await;
        assert_eq!(reads, (WRITERS * ROUNDS) as u64);
        assert_eq!(stats.hits + stats.misses, reads);
        assert_eq!(stats.hits, reads);
        assert_eq!(stats.entries, Some(1));
    }

    #[tokio::test]
    async fn test_backend_failures_degrade() {
        let cache = CacheService::new(Arc::new(BrokenBackend));
        assert_eq!(cache.get("k").await, None);
        assert!(!cache.set("k", json!(1), Duration::from_secs(1)).await);
        assert!(!cache.delete("k").await);
        assert!(!cache.clear().await);
        assert_eq!(cache.stats().await.entries, None);
    }
}
