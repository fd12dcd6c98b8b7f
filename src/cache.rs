use std::{collections::HashMap, fmt, sync::Mutex};

use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};

/// Key-value cache holding serialized values under opaque string keys.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;
    async fn set(&self, key: &str, value: String, ttl_seconds: u64) -> AppResult<()>;
    async fn del(&self, key: &str) -> AppResult<()>;
    /// Deletes every key matching a glob-style pattern (`*`, `?`, `\` escapes).
    async fn del_by_pattern(&self, pattern: &str) -> AppResult<()>;
}

#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache").field("connection", &"ConnectionManager").finish()
    }
}

impl RedisCache {
    pub async fn connect(redis_url: &str) -> AppResult<Self> {
        info!(url = %redis_url, "connecting to redis");
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        info!("connected to redis");
        Ok(Self { conn })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    async fn set(&self, key: &str, value: String, ttl_seconds: u64) -> AppResult<()> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_seconds).await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> AppResult<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn del_by_pattern(&self, pattern: &str) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = conn.keys(pattern).await?;
        if !keys.is_empty() {
            debug!(pattern = %pattern, count = keys.len(), "deleting keys matching pattern");
            conn.del::<_, ()>(keys).await?;
        }
        Ok(())
    }
}

struct Entry {
    value: String,
    expires_at: i64,
}

/// In-process cache used when no redis server is configured.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCache").finish_non_exhaustive()
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, HashMap<String, Entry>>> {
        self.entries.lock().map_err(|_| AppError::from(anyhow::anyhow!("memory cache poisoned")))
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut entries = self.lock()?;
        let now = now_sec();
        let live = entries.get(key).map(|e| (e.expires_at > now).then(|| e.value.clone()));
        match live {
            Some(Some(value)) => Ok(Some(value)),
            Some(None) => {
                entries.remove(key);
                Ok(None)
            },
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl_seconds: u64) -> AppResult<()> {
        let ttl = i64::try_from(ttl_seconds).unwrap_or(i64::MAX);
        let expires_at = now_sec().saturating_add(ttl);
        self.lock()?.insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn del(&self, key: &str) -> AppResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    async fn del_by_pattern(&self, pattern: &str) -> AppResult<()> {
        self.lock()?.retain(|key, _| !glob_match(pattern, key));
        Ok(())
    }
}

/// Cache key scheme for one entity type.
///
/// `movie` yields `movie:<id>` per entity, `movies:all` for the collection and
/// `movie:*` as the invalidation pattern. The pattern never matches the
/// collection key because the collection prefix carries the plural `s`.
#[derive(Debug, Clone, Copy)]
pub struct CacheKeys {
    kind: &'static str,
}

pub const MOVIE_KEYS: CacheKeys = CacheKeys { kind: "movie" };
pub const DIRECTOR_KEYS: CacheKeys = CacheKeys { kind: "director" };

impl CacheKeys {
    pub fn entity(&self, id: &str) -> String {
        format!("{}:{id}", self.kind)
    }

    pub fn collection(&self) -> String {
        format!("{}s:all", self.kind)
    }

    pub fn pattern(&self) -> String {
        format!("{}:*", self.kind)
    }
}

/// Redis-style glob matching supporting `*`, `?` and backslash escapes.
pub fn glob_match(pattern: &str, key: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let key: Vec<char> = key.chars().collect();

    let (mut p, mut k) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while k < key.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, k));
                p += 1;
                continue;
            },
            Some('?') => {
                p += 1;
                k += 1;
                continue;
            },
            Some('\\') if pattern.get(p + 1) == Some(&key[k]) => {
                p += 2;
                k += 1;
                continue;
            },
            Some(c) if *c != '\\' && *c == key[k] => {
                p += 1;
                k += 1;
                continue;
            },
            _ => {},
        }

        match backtrack {
            Some((star_p, star_k)) => {
                p = star_p + 1;
                k = star_k + 1;
                backtrack = Some((star_p, star_k + 1));
            },
            None => return false,
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}

fn now_sec() -> i64 {
    jiff::Timestamp::now().as_second()
}
