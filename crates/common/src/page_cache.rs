//! Short-lived full-page cache.
//!
//! Rendered responses of hot pages (the home feed) are kept for a few
//! seconds so bursts of anonymous traffic do not each hit the database.
//! Two backends are available:
//!
//! - [`MemoryPageCache`]: bounded per-process map with expiry, the default.
//! - [`RedisPageCache`]: shared between instances, used when Redis is configured.
//!
//! Entries are never invalidated on writes; a new post shows up on the
//! cached page once its entry expires or the cache is cleared.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fred::clients::Client as RedisClient;
use fred::interfaces::KeysInterface;
use fred::types::Expiration;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::{AppError, AppResult};

/// A cached response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedPage {
    /// HTTP status code.
    pub status: u16,
    /// `Content-Type` header value.
    pub content_type: String,
    /// Response body.
    pub body: String,
}

/// Storage behind a [`PageCache`].
#[async_trait::async_trait]
pub trait PageCacheBackend: Send + Sync {
    /// Look up a live entry.
    async fn get(&self, key: &str) -> AppResult<Option<CachedPage>>;

    /// Store an entry for `ttl`.
    async fn set(&self, key: &str, page: &CachedPage, ttl: Duration) -> AppResult<()>;

    /// Drop every entry.
    async fn clear(&self) -> AppResult<()>;
}

/// Default entry limit of [`MemoryPageCache`].
pub const DEFAULT_MAX_ENTRIES: usize = 300;

/// In-process cache backend.
///
/// Every write drops expired entries. When the map is still full, the third
/// of entries closest to expiry is evicted before inserting a new key.
#[derive(Clone)]
pub struct MemoryPageCache {
    entries: Arc<RwLock<HashMap<String, (CachedPage, Instant)>>>,
    max_entries: usize,
}

impl Default for MemoryPageCache {
    fn default() -> Self {
        Self::with_max_entries(DEFAULT_MAX_ENTRIES)
    }
}

impl MemoryPageCache {
    /// Create an empty cache holding at most [`DEFAULT_MAX_ENTRIES`] pages.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty cache holding at most `max_entries` pages.
    #[must_use]
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            max_entries: max_entries.max(1),
        }
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

fn cull(entries: &mut HashMap<String, (CachedPage, Instant)>, max_entries: usize) {
    let now = Instant::now();
    entries.retain(|_, (_, expires_at)| *expires_at > now);
    if entries.len() < max_entries {
        return;
    }

    let mut by_expiry: Vec<(Instant, String)> = entries
        .iter()
        .map(|(key, (_, expires_at))| (*expires_at, key.clone()))
        .collect();
    by_expiry.sort_unstable();

    let evict = (entries.len() / 3).max(entries.len() + 1 - max_entries);
    for (_, key) in by_expiry.into_iter().take(evict) {
        entries.remove(&key);
    }
    debug!(evicted = evict, "Culled page cache");
}

#[async_trait::async_trait]
impl PageCacheBackend for MemoryPageCache {
    async fn get(&self, key: &str) -> AppResult<Option<CachedPage>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|(_, expires_at)| *expires_at > Instant::now())
            .map(|(page, _)| page.clone()))
    }

    async fn set(&self, key: &str, page: &CachedPage, ttl: Duration) -> AppResult<()> {
        let mut entries = self.entries.write().await;
        if !entries.contains_key(key) {
            cull(&mut entries, self.max_entries);
        }
        entries.insert(key.to_string(), (page.clone(), Instant::now() + ttl));
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        self.entries.write().await.clear();
        Ok(())
    }
}

/// Redis cache backend.
///
/// Keys carry a generation number; clearing bumps the generation so old
/// entries become unreachable and expire on their own.
#[derive(Clone)]
pub struct RedisPageCache {
    redis: Arc<RedisClient>,
    prefix: String,
}

impl RedisPageCache {
    /// Create a Redis-backed cache. `prefix` namespaces every key.
    #[must_use]
    pub fn new(redis: Arc<RedisClient>, prefix: &str) -> Self {
        Self {
            redis,
            prefix: format!("{prefix}:page_cache"),
        }
    }

    fn generation_key(&self) -> String {
        format!("{}:generation", self.prefix)
    }

    async fn generation(&self) -> AppResult<i64> {
        let generation: Option<i64> = self
            .redis
            .get(self.generation_key())
            .await
            .map_err(|e| AppError::Redis(e.to_string()))?;
        Ok(generation.unwrap_or(0))
    }

    async fn entry_key(&self, key: &str) -> AppResult<String> {
        Ok(format!("{}:{}:{key}", self.prefix, self.generation().await?))
    }
}

#[async_trait::async_trait]
impl PageCacheBackend for RedisPageCache {
    async fn get(&self, key: &str) -> AppResult<Option<CachedPage>> {
        let entry_key = self.entry_key(key).await?;
        let raw: Option<String> = self
            .redis
            .get(entry_key)
            .await
            .map_err(|e| AppError::Redis(e.to_string()))?;

        raw.map(|json| {
            serde_json::from_str(&json).map_err(|e| AppError::Internal(e.to_string()))
        })
        .transpose()
    }

    async fn set(&self, key: &str, page: &CachedPage, ttl: Duration) -> AppResult<()> {
        let entry_key = self.entry_key(key).await?;
        let json = serde_json::to_string(page).map_err(|e| AppError::Internal(e.to_string()))?;

        self.redis
            .set::<(), _, _>(
                entry_key,
                json,
                Some(Expiration::EX(ttl.as_secs().max(1) as i64)),
                None,
                false,
            )
            .await
            .map_err(|e| AppError::Redis(e.to_string()))
    }

    async fn clear(&self) -> AppResult<()> {
        let generation: i64 = self
            .redis
            .incr(self.generation_key())
            .await
            .map_err(|e| AppError::Redis(e.to_string()))?;
        info!(generation, "Cleared page cache");
        Ok(())
    }
}

/// Page cache for one group of pages.
#[derive(Clone)]
pub struct PageCache {
    backend: Arc<dyn PageCacheBackend>,
    key_prefix: String,
    ttl: Duration,
}

impl PageCache {
    /// Create a cache whose keys start with `key_prefix`.
    #[must_use]
    pub fn new(backend: Arc<dyn PageCacheBackend>, key_prefix: &str, ttl: Duration) -> Self {
        Self {
            backend,
            key_prefix: key_prefix.to_string(),
            ttl,
        }
    }

    /// In-memory cache, mostly for tests and single-instance deployments.
    #[must_use]
    pub fn in_memory(key_prefix: &str, ttl: Duration) -> Self {
        Self::new(Arc::new(MemoryPageCache::new()), key_prefix, ttl)
    }

    /// Entry lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cache key for a request target (path plus query string).
    #[must_use]
    pub fn key_for(&self, path_and_query: &str) -> String {
        format!("{}:{path_and_query}", self.key_prefix)
    }

    /// Look up the page for a request target.
    pub async fn get(&self, path_and_query: &str) -> AppResult<Option<CachedPage>> {
        let key = self.key_for(path_and_query);
        let page = self.backend.get(&key).await?;
        debug!(key = %key, hit = page.is_some(), "Page cache lookup");
        Ok(page)
    }

    /// Store the page for a request target.
    pub async fn set(&self, path_and_query: &str, page: &CachedPage) -> AppResult<()> {
        self.backend
            .set(&self.key_for(path_and_query), page, self.ttl)
            .await
    }

    /// Drop every cached page.
    pub async fn clear(&self) -> AppResult<()> {
        self.backend.clear().await
    }
}
