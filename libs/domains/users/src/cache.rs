//! Read-through cache for user lookups
//!
//! Entries are JSON strings with a short TTL. Every failure is logged and
//! treated as a miss; the database stays the source of truth.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use uuid::Uuid;

/// Default entry lifetime in seconds.
pub const DEFAULT_TTL_SECS: u64 = 60;

pub const COUNT_KEY: &str = "users_count";

pub fn user_key(id: Uuid) -> String {
    format!("user_{}", id)
}

pub fn list_key(page: u64, page_size: u64) -> String {
    format!("users_list_page_{}_size_{}", page, page_size)
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;

    async fn set(&self, key: &str, value: String);

    async fn invalidate(&self, key: &str);
}

/// Cache that never stores anything, used when Redis is not configured
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopUserCache;

#[async_trait]
impl UserCache for NoopUserCache {
    async fn get(&self, _key: &str) -> Option<String> {
        None
    }

    async fn set(&self, _key: &str, _value: String) {}

    async fn invalidate(&self, _key: &str) {}
}

/// Redis-backed cache using `SETEX`
#[derive(Clone)]
pub struct RedisUserCache {
    conn: ConnectionManager,
    ttl_secs: u64,
}

impl RedisUserCache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            ttl_secs: DEFAULT_TTL_SECS,
        }
    }

    pub fn with_ttl(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }
}

#[async_trait]
impl UserCache for RedisUserCache {
    async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.conn.clone();
        match conn.get::<_, Option<String>>(key).await {
            Ok(value) => {
                tracing::debug!(key, hit = value.is_some(), "Cache lookup");
                value
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache read failed, falling back to database");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: String) {
        let mut conn = self.conn.clone();
        if let Err(e) = conn.set_ex::<_, _, ()>(key, value, self.ttl_secs).await {
            tracing::warn!(key, error = %e, "Cache write failed");
        }
    }

    async fn invalidate(&self, key: &str) {
        let mut conn = self.conn.clone();
        if let Err(e) = conn.del::<_, ()>(key).await {
            tracing::warn!(key, error = %e, "Cache invalidation failed");
        }
    }
}
