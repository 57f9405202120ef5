//! In-memory expiring store implementation.
//!
//! This module provides [`MemoryStore`], an in-process implementation of
//! [`ExpiringStore`].
//!
//! # Features
//!
//! - **Thread-safe**: Uses [`parking_lot::RwLock`] for concurrent access
//! - **Ordered storage**: Keys live in a [`BTreeMap`], so prefix scans are range scans
//! - **Lazy expiry**: A read that finds an expired entry purges it
//! - **Proactive expiry**: One background task sweeps all expired entries every
//!   [`sweep_interval`](MemoryStoreConfig::sweep_interval), instead of one timer per key
//!
//! Expiry is measured with [`tokio::time::Instant`], so tests running on a
//! paused runtime can advance the clock with [`tokio::time::advance`].
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use bytes::Bytes;
//! use credgate_storage::{ExpiringStore, MemoryStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = MemoryStore::new();
//!
//!     store.set_with_ttl("session", Bytes::from("1"), Duration::from_secs(30)).await.unwrap();
//!     assert!(store.get("session").await.unwrap().is_some());
//! }
//! ```
//!
//! # Limitations
//!
//! - Data is not persisted; all data is lost when the process exits
//! - No replication; every process has its own view

use std::{
    collections::BTreeMap,
    ops::Bound,
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use serde::Deserialize;
use tokio::{
    select,
    sync::watch,
    time::{Instant, Interval, MissedTickBehavior, interval_at},
};

use crate::{
    backend::ExpiringStore,
    error::{ConfigError, StorageError, StorageResult},
    types::{KeyTtl, StoreStats},
    validation::{validate_key, validate_ttl},
};

/// Default interval between background sweeps (60 seconds).
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration for [`MemoryStore`].
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use credgate_storage::MemoryStoreConfig;
///
/// let config = MemoryStoreConfig::builder().sweep_interval(Duration::from_secs(5)).build()?;
/// assert_eq!(config.sweep_interval(), Duration::from_secs(5));
/// # Ok::<(), credgate_storage::ConfigError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawMemoryStoreConfig")]
pub struct MemoryStoreConfig {
    sweep_interval: Duration,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMemoryStoreConfig {
    #[serde(with = "humantime_serde", default = "default_sweep_interval")]
    sweep_interval: Duration,
}

fn default_sweep_interval() -> Duration {
    DEFAULT_SWEEP_INTERVAL
}

impl TryFrom<RawMemoryStoreConfig> for MemoryStoreConfig {
    type Error = ConfigError;

    fn try_from(raw: RawMemoryStoreConfig) -> Result<Self, Self::Error> {
        Self::builder().sweep_interval(raw.sweep_interval).build()
    }
}

#[bon::bon]
impl MemoryStoreConfig {
    /// Creates a new configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MustBePositive`] if `sweep_interval` is zero.
    #[builder]
    pub fn new(
        #[builder(default = DEFAULT_SWEEP_INTERVAL)] sweep_interval: Duration,
    ) -> Result<Self, ConfigError> {
        if sweep_interval.is_zero() {
            return Err(ConfigError::MustBePositive {
                field: "sweep_interval",
                value: "0s".into(),
            });
        }
        Ok(Self { sweep_interval })
    }

    /// Returns the interval between background sweeps.
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self { sweep_interval: DEFAULT_SWEEP_INTERVAL }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: Bytes,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

type Entries = RwLock<BTreeMap<String, Entry>>;

/// Holds the shutdown signal sender. When dropped, the watch channel
/// closes and the sweep task exits.
struct ShutdownGuard {
    shutdown_tx: watch::Sender<()>,
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        // Best-effort: the receiver may already be gone.
        let _ = self.shutdown_tx.send(());
    }
}

/// In-memory expiring store.
///
/// # Cloning
///
/// `MemoryStore` is cheaply cloneable via [`Arc`]. All clones share the
/// same entries and the same sweep task.
///
/// # Shutdown
///
/// The sweep task holds the entries but not the shutdown guard, so it stops
/// when the last clone is dropped. [`shutdown`](Self::shutdown) stops it
/// explicitly; the store stays usable, relying on lazy expiry alone.
#[derive(Clone)]
pub struct MemoryStore {
    entries: Arc<Entries>,
    shutdown_guard: Arc<ShutdownGuard>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").field("entries", &self.entries.read().len()).finish()
    }
}

impl MemoryStore {
    /// Creates a store with the default 60 second sweep interval.
    ///
    /// Must be called from within a Tokio runtime: the sweep task is spawned here.
    pub fn new() -> Self {
        Self::with_config(MemoryStoreConfig::default())
    }

    /// Creates a store with the given configuration.
    ///
    /// Must be called from within a Tokio runtime: the sweep task is spawned here.
    pub fn with_config(config: MemoryStoreConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let entries: Arc<Entries> = Arc::new(RwLock::new(BTreeMap::new()));

        // The first tick is anchored to construction time, not to the first
        // poll of the task.
        let period = config.sweep_interval();
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::spawn(run_sweeper(Arc::clone(&entries), ticker, shutdown_rx));

        Self { entries, shutdown_guard: Arc::new(ShutdownGuard { shutdown_tx }) }
    }

    /// Signals the background sweep task to stop.
    ///
    /// Optional: the task also stops when every clone is dropped. Idempotent.
    pub fn shutdown(&self) {
        let _ = self.shutdown_guard.shutdown_tx.send(());
    }

    /// Removes every expired entry now and returns how many were purged.
    ///
    /// This is the pass the background task runs on each tick.
    pub fn sweep_expired(&self) -> usize {
        sweep(&self.entries)
    }

    /// Returns the number of physically stored entries, expired or not.
    #[cfg(test)]
    fn physical_len(&self) -> usize {
        self.entries.read().len()
    }

    /// Removes `key` if it is still expired at `now`.
    ///
    /// Re-checks under the write lock: a concurrent writer may have replaced
    /// the entry between the read and this call.
    fn purge_if_expired(&self, key: &str, now: Instant) {
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_sweeper(entries: Arc<Entries>, mut ticker: Interval, mut shutdown_rx: watch::Receiver<()>) {
    loop {
        select! {
            _ = ticker.tick() => {}
            _ = shutdown_rx.changed() => {
                tracing::debug!("memory store sweeper shutting down");
                return;
            }
        }

        let purged = sweep(&entries);
        if purged > 0 {
            tracing::info!(purged, "swept expired keys");
        }
    }
}

fn sweep(entries: &Entries) -> usize {
    let now = Instant::now();

    // Phase 1: find expired keys under the read lock.
    let expired: Vec<String> = {
        let guard = entries.read();
        guard.iter().filter(|(_, entry)| entry.is_expired(now)).map(|(k, _)| k.clone()).collect()
    };

    if expired.is_empty() {
        return 0;
    }

    // Phase 2: remove them, re-checking each one.
    let mut guard = entries.write();
    let mut purged = 0;
    for key in expired {
        if guard.get(&key).is_some_and(|entry| entry.is_expired(now)) {
            guard.remove(&key);
            purged += 1;
        }
    }
    purged
}

fn parse_counter(value: &Bytes) -> StorageResult<i64> {
    let text = std::str::from_utf8(value).map_err(|e| {
        StorageError::serialization_with_source("counter value is not UTF-8", e)
    })?;
    text.trim().parse::<i64>().map_err(|e| {
        StorageError::serialization_with_source("counter value is not an integer", e)
    })
}

#[async_trait]
impl ExpiringStore for MemoryStore {
    #[tracing::instrument(skip_all)]
    async fn get(&self, key: &str) -> StorageResult<Option<Bytes>> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {},
            }
        }

        self.purge_if_expired(key, now);
        Ok(None)
    }

    #[tracing::instrument(skip_all)]
    async fn set(&self, key: &str, value: Bytes) -> StorageResult<()> {
        validate_key(key)?;
        self.entries.write().insert(key.to_owned(), Entry { value, expires_at: None });
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(ttl_secs = ttl.as_secs()))]
    async fn set_with_ttl(&self, key: &str, value: Bytes, ttl: Duration) -> StorageResult<()> {
        validate_key(key)?;
        validate_ttl(ttl)?;

        let expires_at = Instant::now() + ttl;
        self.entries.write().insert(key.to_owned(), Entry { value, expires_at: Some(expires_at) });
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    async fn delete(&self, key: &str) -> StorageResult<bool> {
        let now = Instant::now();
        let removed = self.entries.write().remove(key);
        Ok(removed.is_some_and(|entry| !entry.is_expired(now)))
    }

    #[tracing::instrument(skip_all)]
    async fn increment(&self, key: &str) -> StorageResult<i64> {
        validate_key(key)?;

        let now = Instant::now();
        let mut entries = self.entries.write();

        let (current, expires_at) = match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                (parse_counter(&entry.value)?, entry.expires_at)
            },
            _ => (0, None),
        };

        let next = current
            .checked_add(1)
            .ok_or_else(|| StorageError::invalid_argument("counter overflowed"))?;

        entries.insert(key.to_owned(), Entry { value: Bytes::from(next.to_string()), expires_at });
        Ok(next)
    }

    #[tracing::instrument(skip_all, fields(ttl_secs = ttl.as_secs()))]
    async fn expire(&self, key: &str, ttl: Duration) -> StorageResult<bool> {
        validate_ttl(ttl)?;

        let now = Instant::now();
        let mut entries = self.entries.write();
        match entries.get_mut(key) {
            Some(entry) if !entry.is_expired(now) => {
                entry.expires_at = Some(now + ttl);
                Ok(true)
            },
            Some(_) => {
                entries.remove(key);
                Ok(false)
            },
            None => Ok(false),
        }
    }

    #[tracing::instrument(skip_all)]
    async fn ttl(&self, key: &str) -> StorageResult<KeyTtl> {
        let now = Instant::now();
        let entries = self.entries.read();
        let ttl = match entries.get(key) {
            None => KeyTtl::Missing,
            Some(entry) if entry.is_expired(now) => KeyTtl::Missing,
            Some(Entry { expires_at: None, .. }) => KeyTtl::Persistent,
            Some(Entry { expires_at: Some(at), .. }) => KeyTtl::Expires(at.duration_since(now)),
        };
        Ok(ttl)
    }

    #[tracing::instrument(skip(self))]
    async fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let now = Instant::now();
        let entries = self.entries.read();

        let keys = entries
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        Ok(keys)
    }

    #[tracing::instrument(skip_all)]
    async fn stats(&self) -> StorageResult<StoreStats> {
        let now = Instant::now();
        let entries = self.entries.read();

        let mut stats = StoreStats::default();
        for entry in entries.values().filter(|entry| !entry.is_expired(now)) {
            stats.total += 1;
            if entry.expires_at.is_some() {
                stats.with_expiry += 1;
            } else {
                stats.without_expiry += 1;
            }
        }
        Ok(stats)
    }

    #[tracing::instrument(skip_all)]
    async fn health_check(&self) -> StorageResult<()> {
        // Acquiring the read lock proves the store is not wedged.
        let _unused = self.entries.read();
        Ok(())
    }
}
