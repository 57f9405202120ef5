//! Redis-backed expiring store.
//!
//! [`RedisStore`] maps each [`ExpiringStore`] operation onto the equivalent
//! Redis command, so expiry is enforced by the server rather than by a local
//! sweep:
//!
//! | Operation | Command |
//! |-----------|---------|
//! | `get` | `GET` |
//! | `set` | `SET` |
//! | `set_with_ttl` | `SET .. PX` |
//! | `delete` | `DEL` |
//! | `increment` | `INCR` (atomic on the server) |
//! | `expire` | `PEXPIRE` |
//! | `ttl` | `PTTL` |
//! | `keys_with_prefix` | `KEYS prefix*` |
//!
//! `KEYS` blocks the server while it scans; it is only reached from
//! administrative introspection.
//!
//! Connection failures surface as [`StorageError::Connection`] and client-side
//! timeouts as [`StorageError::Timeout`], both transient.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use redis::{AsyncCommands, ErrorKind, RedisError, aio::ConnectionManager};
use serde::Deserialize;

use crate::{
    backend::ExpiringStore,
    error::{StorageError, StorageResult},
    types::{KeyTtl, StoreStats},
    validation::{validate_key, validate_ttl},
};

/// Default Redis URL.
pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";

/// Configuration for [`RedisStore`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedisStoreConfig {
    #[serde(default = "default_url")]
    url: String,
}

fn default_url() -> String {
    DEFAULT_REDIS_URL.to_owned()
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self { url: default_url() }
    }
}

#[bon::bon]
impl RedisStoreConfig {
    /// Creates a new configuration.
    #[builder]
    pub fn new(#[builder(into, default = default_url())] url: String) -> Self {
        Self { url }
    }

    /// Returns the connection URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// An [`ExpiringStore`] backed by a Redis server.
///
/// Cloning is cheap; clones share one multiplexed connection that reconnects
/// on its own after a drop.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Connects to the server described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Connection`] if the URL is invalid or the
    /// server cannot be reached.
    pub async fn connect(config: &RedisStoreConfig) -> StorageResult<Self> {
        let client = redis::Client::open(config.url())
            .map_err(|e| StorageError::connection_with_source("invalid redis url", e))?;
        let conn = ConnectionManager::new(client).await.map_err(map_redis_error)?;
        tracing::info!("connected to redis");
        Ok(Self { conn })
    }
}

fn map_redis_error(err: RedisError) -> StorageError {
    if err.is_timeout() {
        StorageError::timeout()
    } else if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
        StorageError::connection_with_source("redis unreachable", err)
    } else {
        StorageError::internal_with_source("redis command failed", err)
    }
}

/// Escapes glob metacharacters so `prefix` matches literally in `KEYS`.
fn prefix_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for ch in prefix.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('*');
    pattern
}

fn as_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl ExpiringStore for RedisStore {
    #[tracing::instrument(skip_all)]
    async fn get(&self, key: &str) -> StorageResult<Option<Bytes>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await.map_err(map_redis_error)?;
        Ok(value.map(Bytes::from))
    }

    #[tracing::instrument(skip_all)]
    async fn set(&self, key: &str, value: Bytes) -> StorageResult<()> {
        validate_key(key)?;
        let mut conn = self.conn.clone();
        let _: () = conn.set(key, value.as_ref()).await.map_err(map_redis_error)?;
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(ttl_secs = ttl.as_secs()))]
    async fn set_with_ttl(&self, key: &str, value: Bytes, ttl: Duration) -> StorageResult<()> {
        validate_key(key)?;
        validate_ttl(ttl)?;
        let mut conn = self.conn.clone();
        let _: () = conn.pset_ex(key, value.as_ref(), as_millis(ttl)).await.map_err(map_redis_error)?;
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    async fn delete(&self, key: &str) -> StorageResult<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.del(key).await.map_err(map_redis_error)?;
        Ok(removed > 0)
    }

    #[tracing::instrument(skip_all)]
    async fn increment(&self, key: &str) -> StorageResult<i64> {
        validate_key(key)?;
        let mut conn = self.conn.clone();
        conn.incr(key, 1_i64).await.map_err(|e: RedisError| {
            if e.kind() == ErrorKind::ResponseError {
                StorageError::serialization_with_source("value is not an integer", e)
            } else {
                map_redis_error(e)
            }
        })
    }

    #[tracing::instrument(skip_all, fields(ttl_secs = ttl.as_secs()))]
    async fn expire(&self, key: &str, ttl: Duration) -> StorageResult<bool> {
        validate_ttl(ttl)?;
        let millis = i64::try_from(as_millis(ttl)).unwrap_or(i64::MAX);
        let mut conn = self.conn.clone();
        let applied: bool = conn.pexpire(key, millis).await.map_err(map_redis_error)?;
        Ok(applied)
    }

    #[tracing::instrument(skip_all)]
    async fn ttl(&self, key: &str) -> StorageResult<KeyTtl> {
        let mut conn = self.conn.clone();
        let millis: i64 = conn.pttl(key).await.map_err(map_redis_error)?;
        Ok(match millis {
            -1 => KeyTtl::Persistent,
            ms if ms < 0 => KeyTtl::Missing,
            ms => KeyTtl::Expires(Duration::from_millis(ms.unsigned_abs())),
        })
    }

    #[tracing::instrument(skip(self))]
    async fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let mut keys: Vec<String> = conn.keys(prefix_pattern(prefix)).await.map_err(map_redis_error)?;
        keys.sort();
        Ok(keys)
    }

    #[tracing::instrument(skip_all)]
    async fn stats(&self) -> StorageResult<StoreStats> {
        let keys = self.keys_with_prefix("").await?;
        if keys.is_empty() {
            return Ok(StoreStats::default());
        }

        let mut pipe = redis::pipe();
        for key in &keys {
            pipe.cmd("PTTL").arg(key);
        }
        let mut conn = self.conn.clone();
        let ttls: Vec<i64> = pipe.query_async(&mut conn).await.map_err(map_redis_error)?;

        let mut stats = StoreStats::default();
        for ttl in ttls {
            match ttl {
                -1 => stats.without_expiry += 1,
                ms if ms >= 0 => stats.with_expiry += 1,
                // Expired between KEYS and PTTL.
                _ => continue,
            }
            stats.total += 1;
        }
        Ok(stats)
    }

    #[tracing::instrument(skip_all)]
    async fn health_check(&self) -> StorageResult<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await.map_err(map_redis_error)?;
        Ok(())
    }
}
