//! Conformance checks for [`ExpiringStore`] implementations.
//!
//! Each function exercises one clause of the trait contract against a fresh
//! store. Every implementation, in-process or remote, runs the same suite so
//! the credential registry can rely on identical behavior from all of them.
//!
//! # Usage
//!
//! ```no_run
//! use credgate_storage::{MemoryStore, conformance};
//!
//! #[tokio::test]
//! async fn get_missing_is_none() {
//!     conformance::get_missing_is_none(&MemoryStore::new()).await;
//! }
//! ```
//!
//! Expiry checks sleep on the tokio clock, so in-process stores can run them
//! under `#[tokio::test(start_paused = true)]` without waiting.
//!
//! | Category | Contract aspect |
//! |----------|-----------------|
//! | Basic | get/set/delete semantics |
//! | Expiry | `set_with_ttl`, `expire` and `ttl` behavior |
//! | Counter | `increment` semantics |
//! | Scan | `keys_with_prefix` and `stats` |
//! | Concurrent | Atomicity under parallel access |

use std::{sync::Arc, time::Duration};

use bytes::Bytes;

use crate::{assert_storage_error, backend::ExpiringStore, types::KeyTtl};

const SHORT_TTL: Duration = Duration::from_millis(100);
const PAST_SHORT_TTL: Duration = Duration::from_millis(250);

// Basic

/// `get` on a key that was never written returns `Ok(None)`.
pub async fn get_missing_is_none<S: ExpiringStore>(store: &S) {
    let value = store.get("never:written").await.expect("get should not error on missing key");
    assert_eq!(value, None);
}

/// `set` then `get` returns the stored bytes.
pub async fn set_then_get<S: ExpiringStore>(store: &S) {
    store.set("basic:a", Bytes::from("true")).await.expect("set");
    assert_eq!(store.get("basic:a").await.expect("get"), Some(Bytes::from("true")));
}

/// A second `set` replaces the value.
pub async fn set_overwrites<S: ExpiringStore>(store: &S) {
    store.set("basic:b", Bytes::from("first")).await.expect("set");
    store.set("basic:b", Bytes::from("second")).await.expect("overwrite");
    assert_eq!(store.get("basic:b").await.expect("get"), Some(Bytes::from("second")));
}

/// `delete` reports whether a live key was removed and is idempotent.
pub async fn delete_is_idempotent<S: ExpiringStore>(store: &S) {
    store.set("basic:c", Bytes::from("x")).await.expect("set");
    assert!(store.delete("basic:c").await.expect("delete"));
    assert!(!store.delete("basic:c").await.expect("second delete"));
    assert!(!store.delete("basic:ghost").await.expect("delete missing"));
    assert_eq!(store.get("basic:c").await.expect("get"), None);
}

/// An empty key is rejected.
pub async fn empty_key_rejected<S: ExpiringStore>(store: &S) {
    assert_storage_error!(store.set("", Bytes::from("x")).await, InvalidArgument);
}

// Expiry

/// A key written with a TTL is readable before the deadline and gone after.
pub async fn ttl_key_expires<S: ExpiringStore>(store: &S) {
    store.set_with_ttl("exp:a", Bytes::from("v"), SHORT_TTL).await.expect("set_with_ttl");
    assert!(store.get("exp:a").await.expect("get before").is_some());

    tokio::time::sleep(PAST_SHORT_TTL).await;
    assert_eq!(store.get("exp:a").await.expect("get after"), None);
}

/// A zero TTL is rejected rather than silently storing an expired key.
pub async fn zero_ttl_rejected<S: ExpiringStore>(store: &S) {
    assert_storage_error!(
        store.set_with_ttl("exp:zero", Bytes::from("v"), Duration::ZERO).await,
        InvalidArgument
    );
    assert_eq!(store.get("exp:zero").await.expect("get"), None);
}

/// A plain `set` over a TTL key makes it persistent.
pub async fn set_clears_ttl<S: ExpiringStore>(store: &S) {
    store.set_with_ttl("exp:b", Bytes::from("temp"), SHORT_TTL).await.expect("set_with_ttl");
    store.set("exp:b", Bytes::from("kept")).await.expect("set");

    tokio::time::sleep(PAST_SHORT_TTL).await;
    assert_eq!(store.get("exp:b").await.expect("get"), Some(Bytes::from("kept")));
    assert_eq!(store.ttl("exp:b").await.expect("ttl"), KeyTtl::Persistent);
}

/// `expire` re-arms a live key and refuses a missing one.
pub async fn expire_applies_to_live_keys_only<S: ExpiringStore>(store: &S) {
    store.set("exp:c", Bytes::from("v")).await.expect("set");
    assert!(store.expire("exp:c", SHORT_TTL).await.expect("expire live"));
    assert!(!store.expire("exp:missing", SHORT_TTL).await.expect("expire missing"));

    tokio::time::sleep(PAST_SHORT_TTL).await;
    assert_eq!(store.get("exp:c").await.expect("get"), None);
    assert!(!store.expire("exp:c", SHORT_TTL).await.expect("expire expired"));
}

/// `ttl` distinguishes missing, persistent and expiring keys.
pub async fn ttl_reports_remaining_lifetime<S: ExpiringStore>(store: &S) {
    assert_eq!(store.ttl("exp:none").await.expect("ttl missing"), KeyTtl::Missing);

    store.set("exp:p", Bytes::from("v")).await.expect("set");
    assert_eq!(store.ttl("exp:p").await.expect("ttl persistent"), KeyTtl::Persistent);

    store.set_with_ttl("exp:t", Bytes::from("v"), Duration::from_secs(60)).await.expect("set");
    match store.ttl("exp:t").await.expect("ttl expiring") {
        KeyTtl::Expires(remaining) => {
            assert!(remaining <= Duration::from_secs(60), "remaining {remaining:?} exceeds ttl");
            assert!(remaining > Duration::from_secs(50), "remaining {remaining:?} too small");
        },
        other => panic!("expected Expires, got {other:?}"),
    }
}

// Counter

/// `increment` on an absent key starts from zero.
pub async fn increment_starts_at_one<S: ExpiringStore>(store: &S) {
    assert_eq!(store.increment("cnt:a").await.expect("incr"), 1);
    assert_eq!(store.increment("cnt:a").await.expect("incr"), 2);
    assert_eq!(store.get("cnt:a").await.expect("get"), Some(Bytes::from("2")));
}

/// `increment` keeps the expiry of a live counter.
pub async fn increment_keeps_ttl<S: ExpiringStore>(store: &S) {
    store.increment("cnt:b").await.expect("incr");
    assert!(store.expire("cnt:b", SHORT_TTL).await.expect("expire"));
    assert_eq!(store.increment("cnt:b").await.expect("incr"), 2);
    assert!(matches!(store.ttl("cnt:b").await.expect("ttl"), KeyTtl::Expires(_)));

    tokio::time::sleep(PAST_SHORT_TTL).await;
    assert_eq!(store.increment("cnt:b").await.expect("incr after expiry"), 1);
}

/// `increment` on a non-numeric value fails without clobbering it.
pub async fn increment_rejects_non_integer<S: ExpiringStore>(store: &S) {
    store.set("cnt:c", Bytes::from("true")).await.expect("set");
    assert_storage_error!(store.increment("cnt:c").await, Serialization);
    assert_eq!(store.get("cnt:c").await.expect("get"), Some(Bytes::from("true")));
}

// Scan

/// `keys_with_prefix` returns only live matching keys, sorted.
pub async fn prefix_scan_is_filtered<S: ExpiringStore>(store: &S) {
    store.set("scan:b", Bytes::from("1")).await.expect("set");
    store.set("scan:a", Bytes::from("1")).await.expect("set");
    store.set("scanner", Bytes::from("1")).await.expect("set");
    store.set_with_ttl("scan:c", Bytes::from("1"), SHORT_TTL).await.expect("set");

    tokio::time::sleep(PAST_SHORT_TTL).await;
    let keys = store.keys_with_prefix("scan:").await.expect("scan");
    assert_eq!(keys, vec!["scan:a".to_owned(), "scan:b".to_owned()]);
}

/// `stats` counts live entries split by expiry.
pub async fn stats_counts_live_entries<S: ExpiringStore>(store: &S) {
    store.set("stat:a", Bytes::from("1")).await.expect("set");
    store.set_with_ttl("stat:b", Bytes::from("1"), Duration::from_secs(60)).await.expect("set");

    let stats = store.stats().await.expect("stats");
    assert_eq!(stats.total, 2);
    assert_eq!(stats.with_expiry, 1);
    assert_eq!(stats.without_expiry, 1);
}

/// A healthy store answers the probe.
pub async fn health_check_succeeds<S: ExpiringStore>(store: &S) {
    store.health_check().await.expect("health check");
}

// Concurrent

/// Parallel increments of one key lose no updates.
pub async fn concurrent_increments_are_atomic<S: ExpiringStore + 'static>(store: Arc<S>) {
    const TASKS: usize = 16;
    const PER_TASK: usize = 25;

    let mut handles = Vec::with_capacity(TASKS);
    for _ in 0..TASKS {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            for _ in 0..PER_TASK {
                store.increment("conc:counter").await.expect("concurrent incr");
            }
        }));
    }
    for handle in handles {
        handle.await.expect("task panicked");
    }

    let total = store.get("conc:counter").await.expect("get").expect("counter present");
    assert_eq!(total, Bytes::from((TASKS * PER_TASK).to_string()));
}

/// Parallel writers to distinct keys all land.
pub async fn concurrent_sets_to_distinct_keys<S: ExpiringStore + 'static>(store: Arc<S>) {
    let mut handles = Vec::new();
    for i in 0..32 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.set(&format!("conc:key:{i:02}"), Bytes::from("true")).await.expect("set");
        }));
    }
    for handle in handles {
        handle.await.expect("task panicked");
    }

    assert_eq!(store.keys_with_prefix("conc:key:").await.expect("scan").len(), 32);
}

/// Runs every check, each against a fresh store from `factory`.
pub async fn run_all<S, F>(factory: F)
where
    S: ExpiringStore + 'static,
    F: Fn() -> S,
{
    run_all_with(|| std::future::ready(factory())).await;
}

/// Like [`run_all`], for stores that need an async setup step such as
/// connecting and clearing a remote database.
pub async fn run_all_with<S, F, Fut>(factory: F)
where
    S: ExpiringStore + 'static,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    get_missing_is_none(&factory().await).await;
    set_then_get(&factory().await).await;
    set_overwrites(&factory().await).await;
    delete_is_idempotent(&factory().await).await;
    empty_key_rejected(&factory().await).await;
    ttl_key_expires(&factory().await).await;
    zero_ttl_rejected(&factory().await).await;
    set_clears_ttl(&factory().await).await;
    expire_applies_to_live_keys_only(&factory().await).await;
    ttl_reports_remaining_lifetime(&factory().await).await;
    increment_starts_at_one(&factory().await).await;
    increment_keeps_ttl(&factory().await).await;
    increment_rejects_non_integer(&factory().await).await;
    prefix_scan_is_filtered(&factory().await).await;
    stats_counts_live_entries(&factory().await).await;
    health_check_succeeds(&factory().await).await;
    concurrent_increments_are_atomic(Arc::new(factory().await)).await;
    concurrent_sets_to_distinct_keys(Arc::new(factory().await)).await;
}
