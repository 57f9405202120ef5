//! Self-expiring key-value storage for credgate.
//!
//! This crate provides the [`ExpiringStore`] trait and its implementations.
//! The credential registry in `credgate-authn` keeps every piece of
//! revocation state (blocked users, forced logouts, blacklisted tokens,
//! login-attempt counters) in an `ExpiringStore` and relies on the store to
//! forget entries once their TTL elapses.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      credgate-authn                         │
//! │   CredentialRegistry │ AccessEvaluator │ LoginThrottle      │
//! ├─────────────────────────────────────────────────────────────┤
//! │                       TimeoutStore                          │
//! │                 (per-call deadline wrapper)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   ExpiringStore trait                       │
//! │   (get, set, set_with_ttl, delete, increment, expire, ...)  │
//! ├──────────────────────────────┬──────────────────────────────┤
//! │         MemoryStore          │          RedisStore          │
//! │  (in-process, lazy + sweep)  │    (feature = "redis")       │
//! └──────────────────────────────┴──────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use std::time::Duration;
//!
//! use bytes::Bytes;
//! use credgate_storage::{ExpiringStore, KeyTtl, MemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MemoryStore::new();
//!
//!     store.set_with_ttl("blacklist:abc", Bytes::from("true"), Duration::from_secs(60)).await?;
//!     assert!(store.get("blacklist:abc").await?.is_some());
//!     assert!(matches!(store.ttl("blacklist:abc").await?, KeyTtl::Expires(_)));
//!
//!     assert_eq!(store.increment("login_attempts:a@b.c").await?, 1);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Available Stores
//!
//! | Store | Use Case | Shared across processes |
//! |-------|----------|-------------------------|
//! | [`MemoryStore`] | Single instance, tests | No |
//! | `RedisStore` | Production clusters | Yes |
//!
//! # Feature Flags
//!
//! - **`redis`**: Enables `RedisStore`, backed by a Redis connection manager.
//! - **`testutil`**: Enables the `testutil` and `conformance` modules (fault-injecting stores,
//!   key helpers, assertion macros, the shared contract suite). Enable this in
//!   `[dev-dependencies]` for integration tests.

#![deny(unsafe_code)]

pub mod backend;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used, clippy::panic)]
pub mod conformance;
pub mod error;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis_store;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;
pub mod timeout;
pub mod types;
pub mod validation;

pub use backend::ExpiringStore;
pub use error::{BoxError, ConfigError, StorageError, StorageResult};
pub use memory::{DEFAULT_SWEEP_INTERVAL, MemoryStore, MemoryStoreConfig};
#[cfg(feature = "redis")]
pub use redis_store::{DEFAULT_REDIS_URL, RedisStore, RedisStoreConfig};
pub use timeout::TimeoutStore;
pub use types::{KeyTtl, StoreStats};
pub use validation::{MAX_KEY_SIZE, validate_key, validate_ttl};
