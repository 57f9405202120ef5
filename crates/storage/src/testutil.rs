//! Shared test utilities for code built on [`ExpiringStore`].
//!
//! Feature-gated behind `testutil` so none of this leaks into production
//! builds. Enable it in `[dev-dependencies]`:
//!
//! ```toml
//! [dev-dependencies]
//! credgate-storage = { path = "../storage", features = ["testutil"] }
//! ```
//!
//! The fault-injecting stores model the failure modes a remote store has and
//! an in-process one does not:
//!
//! | Store | Behavior |
//! |-------|----------|
//! | [`UnavailableStore`] | Every call fails with a connection error |
//! | [`StalledStore`] | Every call hangs forever (pair with [`TimeoutStore`](crate::TimeoutStore)) |
//! | [`FlakyStore`] | Delegates to a real store but fails chosen calls |

use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    backend::ExpiringStore,
    error::{StorageError, StorageResult},
    memory::MemoryStore,
    types::{KeyTtl, StoreStats},
};

/// Create a deterministic test key from a prefix and index.
///
/// Produces keys like `"prefix:000042"`, zero-padded so lexicographic order
/// matches numeric order.
#[must_use]
pub fn make_key(prefix: &str, idx: usize) -> String {
    format!("{prefix}:{idx:06}")
}

/// Create a [`MemoryStore`] pre-populated with `count` persistent keys.
///
/// # Panics
///
/// Panics if any `set` fails (should not happen with `MemoryStore`).
pub async fn populated_store(prefix: &str, count: usize) -> MemoryStore {
    let store = MemoryStore::new();
    for i in 0..count {
        store.set(&make_key(prefix, i), Bytes::from("true")).await.expect("populate set failed");
    }
    store
}

/// Assert that a [`StorageResult`] is an error of the given variant.
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use credgate_storage::{StorageError, StorageResult, assert_storage_error};
///
/// let result: StorageResult<()> = Err(StorageError::Timeout);
/// assert_storage_error!(result, Timeout);
/// ```
#[macro_export]
macro_rules! assert_storage_error {
    ($result:expr, $variant:ident) => {
        assert!(
            matches!($result, Err($crate::error::StorageError::$variant { .. })),
            "expected StorageError::{}, got: {:?}",
            stringify!($variant),
            $result,
        );
    };
}

/// A store whose every call fails with [`StorageError::Connection`].
///
/// Models a remote store that is down or partitioned away.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableStore;

fn unreachable_error() -> StorageError {
    StorageError::connection("store unreachable")
}

#[async_trait]
impl ExpiringStore for UnavailableStore {
    async fn get(&self, _key: &str) -> StorageResult<Option<Bytes>> {
        Err(unreachable_error())
    }

    async fn set(&self, _key: &str, _value: Bytes) -> StorageResult<()> {
        Err(unreachable_error())
    }

    async fn set_with_ttl(&self, _key: &str, _value: Bytes, _ttl: Duration) -> StorageResult<()> {
        Err(unreachable_error())
    }

    async fn delete(&self, _key: &str) -> StorageResult<bool> {
        Err(unreachable_error())
    }

    async fn increment(&self, _key: &str) -> StorageResult<i64> {
        Err(unreachable_error())
    }

    async fn expire(&self, _key: &str, _ttl: Duration) -> StorageResult<bool> {
        Err(unreachable_error())
    }

    async fn ttl(&self, _key: &str) -> StorageResult<KeyTtl> {
        Err(unreachable_error())
    }

    async fn keys_with_prefix(&self, _prefix: &str) -> StorageResult<Vec<String>> {
        Err(unreachable_error())
    }

    async fn stats(&self) -> StorageResult<StoreStats> {
        Err(unreachable_error())
    }

    async fn health_check(&self) -> StorageResult<()> {
        Err(unreachable_error())
    }
}

/// A store whose every call never completes.
///
/// Only useful behind a deadline such as [`TimeoutStore`](crate::TimeoutStore).
#[derive(Debug, Clone, Copy, Default)]
pub struct StalledStore;

#[async_trait]
impl ExpiringStore for StalledStore {
    async fn get(&self, _key: &str) -> StorageResult<Option<Bytes>> {
        std::future::pending().await
    }

    async fn set(&self, _key: &str, _value: Bytes) -> StorageResult<()> {
        std::future::pending().await
    }

    async fn set_with_ttl(&self, _key: &str, _value: Bytes, _ttl: Duration) -> StorageResult<()> {
        std::future::pending().await
    }

    async fn delete(&self, _key: &str) -> StorageResult<bool> {
        std::future::pending().await
    }

    async fn increment(&self, _key: &str) -> StorageResult<i64> {
        std::future::pending().await
    }

    async fn expire(&self, _key: &str, _ttl: Duration) -> StorageResult<bool> {
        std::future::pending().await
    }

    async fn ttl(&self, _key: &str) -> StorageResult<KeyTtl> {
        std::future::pending().await
    }

    async fn keys_with_prefix(&self, _prefix: &str) -> StorageResult<Vec<String>> {
        std::future::pending().await
    }

    async fn stats(&self) -> StorageResult<StoreStats> {
        std::future::pending().await
    }

    async fn health_check(&self) -> StorageResult<()> {
        std::future::pending().await
    }
}

/// A [`MemoryStore`] wrapper that fails selected calls.
///
/// Every call (of any kind) increments a shared counter, starting at zero.
/// If the counter value is in `fail_calls`, that call returns
/// [`StorageError::Connection`] without reaching the inner store.
#[derive(Debug, Clone)]
pub struct FlakyStore {
    inner: MemoryStore,
    calls: Arc<AtomicUsize>,
    fail_calls: Arc<HashSet<usize>>,
}

impl FlakyStore {
    /// Wraps `inner`, failing the calls whose zero-based index is in `fail_calls`.
    pub fn new(inner: MemoryStore, fail_calls: impl IntoIterator<Item = usize>) -> Self {
        Self {
            inner,
            calls: Arc::new(AtomicUsize::new(0)),
            fail_calls: Arc::new(fail_calls.into_iter().collect()),
        }
    }

    /// Returns the inner store, for inspecting state behind the faults.
    #[must_use]
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    /// Returns how many calls have been made so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> StorageResult<()> {
        let idx = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_calls.contains(&idx) {
            return Err(StorageError::connection(format!("injected failure on call {idx}")));
        }
        Ok(())
    }
}

#[async_trait]
impl ExpiringStore for FlakyStore {
    async fn get(&self, key: &str) -> StorageResult<Option<Bytes>> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Bytes) -> StorageResult<()> {
        self.check()?;
        self.inner.set(key, value).await
    }

    async fn set_with_ttl(&self, key: &str, value: Bytes, ttl: Duration) -> StorageResult<()> {
        self.check()?;
        self.inner.set_with_ttl(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        self.check()?;
        self.inner.delete(key).await
    }

    async fn increment(&self, key: &str) -> StorageResult<i64> {
        self.check()?;
        self.inner.increment(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StorageResult<bool> {
        self.check()?;
        self.inner.expire(key, ttl).await
    }

    async fn ttl(&self, key: &str) -> StorageResult<KeyTtl> {
        self.check()?;
        self.inner.ttl(key).await
    }

    async fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        self.check()?;
        self.inner.keys_with_prefix(prefix).await
    }

    async fn stats(&self) -> StorageResult<StoreStats> {
        self.check()?;
        self.inner.stats().await
    }

    async fn health_check(&self) -> StorageResult<()> {
        self.check()?;
        self.inner.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_key_pads_index() {
        assert_eq!(make_key("blocked_user", 42), "blocked_user:000042");
    }

    #[tokio::test]
    async fn populated_store_has_count_keys() {
        let store = populated_store("p", 5).await;
        assert_eq!(store.keys_with_prefix("p:").await.expect("scan").len(), 5);
    }

    #[tokio::test]
    async fn unavailable_store_fails_everything() {
        let store = UnavailableStore;
        assert_storage_error!(store.get("k").await, Connection);
        assert_storage_error!(store.increment("k").await, Connection);
        assert_storage_error!(store.health_check().await, Connection);
    }

    #[tokio::test]
    async fn flaky_store_fails_selected_calls() {
        let store = FlakyStore::new(MemoryStore::new(), [1]);
        assert!(store.set("a", Bytes::from("1")).await.is_ok());
        assert_storage_error!(store.set("b", Bytes::from("1")).await, Connection);
        assert!(store.set("c", Bytes::from("1")).await.is_ok());

        assert_eq!(store.call_count(), 3);
        assert_eq!(store.inner().keys_with_prefix("").await.expect("scan"), vec!["a", "c"]);
    }
}
