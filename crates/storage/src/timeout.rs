//! Per-call deadlines for store operations.
//!
//! [`TimeoutStore`] wraps any [`ExpiringStore`] and bounds every call with
//! [`tokio::time::timeout`]. A call that does not finish in time is abandoned
//! and reported as [`StorageError::Timeout`], so a stalled remote store can
//! never hang the request pipeline.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use credgate_storage::{ExpiringStore, MemoryStore, TimeoutStore};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let store = TimeoutStore::new(MemoryStore::new(), Duration::from_millis(250));
//! let _ = store.get("blocked_user:42").await;
//! # });
//! ```

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    backend::ExpiringStore,
    error::{StorageError, StorageResult},
    types::{KeyTtl, StoreStats},
};

/// An [`ExpiringStore`] wrapper that applies a deadline to every call.
#[derive(Debug, Clone)]
pub struct TimeoutStore<S> {
    inner: S,
    deadline: Duration,
}

impl<S: ExpiringStore> TimeoutStore<S> {
    /// Wraps `inner`, bounding each call by `deadline`.
    pub fn new(inner: S, deadline: Duration) -> Self {
        Self { inner, deadline }
    }

    /// Returns a reference to the inner store.
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Returns the per-call deadline.
    #[must_use]
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    async fn bounded<T: Send>(
        &self,
        op: &'static str,
        call: impl Future<Output = StorageResult<T>> + Send,
    ) -> StorageResult<T> {
        match tokio::time::timeout(self.deadline, call).await {
            Ok(result) => result,
            Err(_elapsed) => {
                tracing::debug!(
                    op,
                    deadline_ms = deadline_millis(self.deadline),
                    "store call timed out"
                );
                Err(StorageError::timeout())
            },
        }
    }
}

fn deadline_millis(deadline: Duration) -> u64 {
    u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl<S: ExpiringStore> ExpiringStore for TimeoutStore<S> {
    async fn get(&self, key: &str) -> StorageResult<Option<Bytes>> {
        self.bounded("get", self.inner.get(key)).await
    }

    async fn set(&self, key: &str, value: Bytes) -> StorageResult<()> {
        self.bounded("set", self.inner.set(key, value)).await
    }

    async fn set_with_ttl(&self, key: &str, value: Bytes, ttl: Duration) -> StorageResult<()> {
        self.bounded("set_with_ttl", self.inner.set_with_ttl(key, value, ttl)).await
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        self.bounded("delete", self.inner.delete(key)).await
    }

    async fn increment(&self, key: &str) -> StorageResult<i64> {
        self.bounded("increment", self.inner.increment(key)).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StorageResult<bool> {
        self.bounded("expire", self.inner.expire(key, ttl)).await
    }

    async fn ttl(&self, key: &str) -> StorageResult<KeyTtl> {
        self.bounded("ttl", self.inner.ttl(key)).await
    }

    async fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        self.bounded("keys_with_prefix", self.inner.keys_with_prefix(prefix)).await
    }

    async fn stats(&self) -> StorageResult<StoreStats> {
        self.bounded("stats", self.inner.stats()).await
    }

    async fn health_check(&self) -> StorageResult<()> {
        self.bounded("health_check", self.inner.health_check()).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::{
        MemoryStore,
        testutil::{StalledStore, UnavailableStore},
    };

    #[tokio::test]
    async fn passes_through_fast_calls() {
        let store = TimeoutStore::new(MemoryStore::new(), Duration::from_millis(250));

        store.set("key", Bytes::from("value")).await.unwrap();
        assert_eq!(store.get("key").await.unwrap(), Some(Bytes::from("value")));
        assert_eq!(store.increment("n").await.unwrap(), 1);
        assert_eq!(store.deadline(), Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_call_becomes_timeout() {
        let store = TimeoutStore::new(StalledStore, Duration::from_millis(250));

        let result = store.get("blocked_user:1").await;
        assert!(matches!(result, Err(StorageError::Timeout)));

        let result = store.increment("login_attempts:a@b.c").await;
        assert!(matches!(result, Err(StorageError::Timeout)));
    }

    #[tokio::test]
    async fn inner_errors_are_not_rewritten() {
        let store = TimeoutStore::new(UnavailableStore, Duration::from_millis(250));
        assert!(matches!(store.get("k").await, Err(StorageError::Connection { .. })));
    }

    #[test]
    fn deadline_millis_saturates() {
        assert_eq!(deadline_millis(Duration::from_millis(250)), 250);
        assert_eq!(deadline_millis(Duration::from_secs(u64::MAX)), u64::MAX);
        assert_eq!(deadline_millis(Duration::MAX), u64::MAX);
    }

    #[tokio::test]
    async fn caller_errors_pass_through() {
        let store = TimeoutStore::new(MemoryStore::new(), Duration::from_millis(250));
        let result = store.set_with_ttl("k", Bytes::from("v"), Duration::ZERO).await;
        assert!(matches!(result, Err(StorageError::InvalidArgument { .. })));
    }
}
