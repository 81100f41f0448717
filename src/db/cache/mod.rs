use async_trait::async_trait;
use std::fmt::Display;
use std::sync::Arc;

use crate::error::AppResult;

pub mod memory;
pub mod redis;

mod macros;

pub use self::memory::MemoryCache;
pub use self::redis::{create_redis_client, RedisCache};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// The unbounded catalog listing
    MediaList,
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::MediaList => write!(f, "media_list"),
        }
    }
}

impl CacheKey {
    /// Counter bumped on every invalidation. Stored without a TTL.
    pub fn generation_key(&self) -> String {
        format!("{}:generation", self)
    }

    /// Where the value computed under `generation` lives
    pub fn versioned(&self, generation: u64) -> String {
        format!("{}:v{}", self, generation)
    }
}

/// Key-value store with TTL eviction
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    async fn set_ex(&self, key: &str, value: String, ttl_secs: u64) -> AppResult<()>;

    /// Atomically increments a persistent counter, returning the new value
    async fn incr(&self, key: &str) -> AppResult<u64>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Cache handle used by the query services
///
/// Values are stored under a generation-versioned key. Invalidation bumps the
/// generation instead of deleting, so a reader that loaded from the store
/// before a write can only populate the superseded generation.
///
/// Every backend failure is logged and swallowed: a failed read is a miss,
/// a failed write or invalidation is dropped. Callers never see cache errors.
#[derive(Clone)]
pub struct Cache {
    backend: Option<Arc<dyn CacheBackend>>,
    ttl_secs: u64,
}

impl Cache {
    pub fn new(backend: Arc<dyn CacheBackend>, ttl_secs: u64) -> Self {
        Self {
            backend: Some(backend),
            ttl_secs,
        }
    }

    /// A cache that never stores anything
    pub fn disabled() -> Self {
        Self {
            backend: None,
            ttl_secs: 0,
        }
    }

    /// Current generation of `key`, or `None` when the cache is disabled or
    /// unreachable. Must be read before loading from the store.
    pub async fn generation(&self, key: &CacheKey) -> Option<u64> {
        let backend = self.backend.as_ref()?;
        let generation_key = key.generation_key();

        match backend.get(&generation_key).await {
            Ok(None) => Some(0),
            Ok(Some(raw)) => match raw.parse() {
                Ok(generation) => Some(generation),
                Err(_) => {
                    tracing::warn!(
                        key = %generation_key,
                        value = %raw,
                        "Unparseable cache generation"
                    );
                    None
                }
            },
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    key = %generation_key,
                    backend = backend.name(),
                    "Cache read failed, falling back to store"
                );
                None
            }
        }
    }

    /// Retrieves and deserializes a value, or `None` on miss or failure
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
        generation: u64,
    ) -> Option<T> {
        let backend = self.backend.as_ref()?;
        let key = key.versioned(generation);

        let cached = match backend.get(&key).await {
            Ok(cached) => cached,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    key = %key,
                    backend = backend.name(),
                    "Cache read failed, falling back to store"
                );
                return None;
            }
        };

        let json = cached?;
        match serde_json::from_str(&json) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Discarding undecodable cache entry");
                None
            }
        }
    }

    /// Serializes and stores a value computed under `generation`
    pub async fn set_in_cache<T: serde::Serialize>(
        &self,
        key: &CacheKey,
        generation: u64,
        value: &T,
    ) {
        let Some(backend) = self.backend.as_ref() else {
            return;
        };

        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        let key = key.versioned(generation);
        if let Err(e) = backend.set_ex(&key, json, self.ttl_secs).await {
            tracing::warn!(
                error = %e,
                key = %key,
                backend = backend.name(),
                "Cache write failed"
            );
        } else {
            tracing::debug!(key = %key, ttl = self.ttl_secs, "Cached value");
        }
    }

    /// Moves `key` to a fresh generation so the next read goes to the store
    pub async fn invalidate(&self, key: &CacheKey) {
        let Some(backend) = self.backend.as_ref() else {
            return;
        };

        let generation_key = key.generation_key();
        match backend.incr(&generation_key).await {
            Ok(generation) => {
                tracing::debug!(key = %key, generation, "Invalidated cache entry");
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    key = %generation_key,
                    backend = backend.name(),
                    "Cache invalidation failed"
                );
            }
        }
    }
}
