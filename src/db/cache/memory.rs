use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::time::{Duration, Instant};

use crate::db::cache::CacheBackend;
use crate::error::{AppError, AppResult};

/// In-process cache with TTL expiry
///
/// Expiry uses tokio's clock, so tests can move time with `tokio::time::advance`.
/// Counters written by `incr` never expire.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Option<Instant>)>>,
}

fn is_live(expires_at: Option<Instant>, now: Instant) -> bool {
    expires_at.map_or(true, |at| at > now)
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .values()
            .filter(|(_, expires_at)| is_live(*expires_at, now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut entries = self.entries.lock();
        let live = match entries.get(key) {
            Some((value, expires_at)) if is_live(*expires_at, Instant::now()) => {
                Some(value.clone())
            }
            Some(_) => None,
            None => return Ok(None),
        };
        if live.is_none() {
            entries.remove(key);
        }
        Ok(live)
    }

    async fn set_ex(&self, key: &str, value: String, ttl_secs: u64) -> AppResult<()> {
        let expires_at = Instant::now() + Duration::from_secs(ttl_secs);
        self.entries
            .lock()
            .insert(key.to_string(), (value, Some(expires_at)));
        Ok(())
    }

    async fn incr(&self, key: &str) -> AppResult<u64> {
        let mut entries = self.entries.lock();
        let current = match entries.get(key) {
            Some((raw, None)) => raw.parse::<u64>().map_err(|_| {
                AppError::Internal(format!("value at '{}' is not a counter", key))
            })?,
            Some((_, Some(expires_at))) if is_live(Some(*expires_at), Instant::now()) => {
                return Err(AppError::Internal(format!(
                    "value at '{}' expires and is not a counter",
                    key
                )));
            }
            _ => 0,
        };
        let next = current + 1;
        entries.insert(key.to_string(), (next.to_string(), None));
        Ok(next)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
