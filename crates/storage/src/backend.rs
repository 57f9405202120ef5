//! Expiring store trait definition.
//!
//! This module defines [`ExpiringStore`], the key-value capability that the
//! credential registry is built on. Implementations include the in-process
//! [`MemoryStore`](crate::MemoryStore), the remote `RedisStore` (feature
//! `redis`) and wrappers such as [`TimeoutStore`](crate::TimeoutStore).
//!
//! # Expiry Semantics
//!
//! - A key written with [`set_with_ttl`](ExpiringStore::set_with_ttl) is live until `now + ttl`.
//! - A read of an expired key is indistinguishable from a read of a key that was never written.
//! - [`set`](ExpiringStore::set) clears any TTL the key carried.
//! - [`increment`](ExpiringStore::increment) preserves the TTL of a live key.
//!
//! Domain meaning (which prefixes exist, which TTLs they carry) lives in the
//! registry layer, not here.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    error::StorageResult,
    types::{KeyTtl, StoreStats},
};

/// Self-expiring key-value store.
///
/// Implementations must be safe for concurrent use from any number of tasks.
/// The only operation that reads and writes in one step is
/// [`increment`](ExpiringStore::increment), which must be atomic per key.
///
/// | Method | Description |
/// |--------|-------------|
/// | [`get`](ExpiringStore::get) | Read a live value |
/// | [`set`](ExpiringStore::set) | Upsert without expiry |
/// | [`set_with_ttl`](ExpiringStore::set_with_ttl) | Upsert with expiry |
/// | [`delete`](ExpiringStore::delete) | Idempotent removal |
/// | [`increment`](ExpiringStore::increment) | Atomic counter bump |
/// | [`expire`](ExpiringStore::expire) | Re-arm the expiry of a live key |
/// | [`ttl`](ExpiringStore::ttl) | Remaining lifetime |
/// | [`keys_with_prefix`](ExpiringStore::keys_with_prefix) | Introspection scan |
/// | [`stats`](ExpiringStore::stats) | Live entry counts |
/// | [`health_check`](ExpiringStore::health_check) | Reachability probe |
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use credgate_storage::{ExpiringStore, MemoryStore};
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let store = MemoryStore::new();
///
/// store.set("greeting", Bytes::from("hello")).await.unwrap();
/// assert_eq!(store.get("greeting").await.unwrap(), Some(Bytes::from("hello")));
/// # });
/// ```
#[async_trait]
pub trait ExpiringStore: Send + Sync {
    /// Retrieves a live value.
    ///
    /// Returns `Ok(None)` if the key was never written, was deleted, or has
    /// expired. Reading an expired key purges it.
    #[must_use = "store operations may fail and errors must be handled"]
    async fn get(&self, key: &str) -> StorageResult<Option<Bytes>>;

    /// Stores a value with no expiry, overwriting any existing value and TTL.
    #[must_use = "store operations may fail and errors must be handled"]
    async fn set(&self, key: &str, value: Bytes) -> StorageResult<()>;

    /// Stores a value that expires after `ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidArgument`](crate::StorageError::InvalidArgument) if `ttl`
    /// is zero.
    #[must_use = "store operations may fail and errors must be handled"]
    async fn set_with_ttl(&self, key: &str, value: Bytes, ttl: Duration) -> StorageResult<()>;

    /// Removes a key.
    ///
    /// Returns `true` if a live entry was removed. Deleting a missing or
    /// expired key is a no-op returning `false`.
    #[must_use = "store operations may fail and errors must be handled"]
    async fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Atomically increments the integer stored at `key` and returns the new value.
    ///
    /// A missing or expired key counts as `0`. The TTL of a live key is kept.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`](crate::StorageError::Serialization) if the
    /// current value is not a decimal integer.
    #[must_use = "store operations may fail and errors must be handled"]
    async fn increment(&self, key: &str) -> StorageResult<i64>;

    /// Sets the expiry of a live key to `now + ttl` without touching its value.
    ///
    /// Returns `false` (and changes nothing) if the key is missing or expired.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidArgument`](crate::StorageError::InvalidArgument) if `ttl`
    /// is zero.
    #[must_use = "store operations may fail and errors must be handled"]
    async fn expire(&self, key: &str, ttl: Duration) -> StorageResult<bool>;

    /// Reports the remaining lifetime of a key.
    #[must_use = "store operations may fail and errors must be handled"]
    async fn ttl(&self, key: &str) -> StorageResult<KeyTtl>;

    /// Lists every live key starting with `prefix`.
    ///
    /// Intended for administrative introspection only; implementations may
    /// scan the whole keyspace.
    #[must_use = "store operations may fail and errors must be handled"]
    async fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Counts live entries.
    #[must_use = "store operations may fail and errors must be handled"]
    async fn stats(&self) -> StorageResult<StoreStats>;

    /// Verifies the store is reachable.
    #[must_use = "health check results indicate store availability and must be inspected"]
    async fn health_check(&self) -> StorageResult<()>;
}

#[async_trait]
impl<S: ExpiringStore + ?Sized> ExpiringStore for Arc<S> {
    async fn get(&self, key: &str) -> StorageResult<Option<Bytes>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: Bytes) -> StorageResult<()> {
        (**self).set(key, value).await
    }

    async fn set_with_ttl(&self, key: &str, value: Bytes, ttl: Duration) -> StorageResult<()> {
        (**self).set_with_ttl(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        (**self).delete(key).await
    }

    async fn increment(&self, key: &str) -> StorageResult<i64> {
        (**self).increment(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StorageResult<bool> {
        (**self).expire(key, ttl).await
    }

    async fn ttl(&self, key: &str) -> StorageResult<KeyTtl> {
        (**self).ttl(key).await
    }

    async fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        (**self).keys_with_prefix(prefix).await
    }

    async fn stats(&self) -> StorageResult<StoreStats> {
        (**self).stats().await
    }

    async fn health_check(&self) -> StorageResult<()> {
        (**self).health_check().await
    }
}
