//! Expiry boundary tests for `MemoryStore`.
//!
//! All tests run on the paused tokio clock, so deadlines are exact: a key
//! written with `ttl` at `t0` is live strictly before `t0 + ttl` and gone
//! from `t0 + ttl` on.

#![allow(clippy::expect_used, clippy::panic)]

use std::time::Duration;

use bytes::Bytes;
use credgate_storage::{ExpiringStore, KeyTtl, MemoryStore};

const TTL: Duration = Duration::from_secs(10);

#[tokio::test(start_paused = true)]
async fn live_one_millisecond_before_deadline() {
    let store = MemoryStore::new();
    store.set_with_ttl("k", Bytes::from("true"), TTL).await.expect("set");

    tokio::time::advance(TTL - Duration::from_millis(1)).await;
    assert!(store.get("k").await.expect("get").is_some());
}

#[tokio::test(start_paused = true)]
async fn gone_exactly_at_deadline() {
    let store = MemoryStore::new();
    store.set_with_ttl("k", Bytes::from("true"), TTL).await.expect("set");

    tokio::time::advance(TTL).await;
    assert_eq!(store.get("k").await.expect("get"), None);
    assert_eq!(store.ttl("k").await.expect("ttl"), KeyTtl::Missing);
}

#[tokio::test(start_paused = true)]
async fn one_millisecond_ttl() {
    let store = MemoryStore::new();
    store.set_with_ttl("k", Bytes::from("true"), Duration::from_millis(1)).await.expect("set");
    assert!(store.get("k").await.expect("get").is_some());

    tokio::time::advance(Duration::from_millis(1)).await;
    assert_eq!(store.get("k").await.expect("get"), None);
}

#[tokio::test(start_paused = true)]
async fn very_long_ttl_does_not_overflow() {
    let store = MemoryStore::new();
    let year = Duration::from_secs(365 * 24 * 60 * 60);
    store.set_with_ttl("k", Bytes::from("true"), year).await.expect("set");

    tokio::time::advance(Duration::from_secs(24 * 60 * 60)).await;
    assert!(store.get("k").await.expect("get").is_some());
}

#[tokio::test(start_paused = true)]
async fn rewriting_with_ttl_replaces_deadline() {
    let store = MemoryStore::new();
    store.set_with_ttl("k", Bytes::from("a"), Duration::from_secs(5)).await.expect("set");
    store.set_with_ttl("k", Bytes::from("b"), Duration::from_secs(20)).await.expect("reset");

    tokio::time::advance(Duration::from_secs(10)).await;
    assert_eq!(store.get("k").await.expect("get"), Some(Bytes::from("b")));
}

#[tokio::test(start_paused = true)]
async fn rewriting_with_shorter_ttl_shortens_life() {
    let store = MemoryStore::new();
    store.set_with_ttl("k", Bytes::from("a"), Duration::from_secs(60)).await.expect("set");
    store.set_with_ttl("k", Bytes::from("b"), Duration::from_secs(1)).await.expect("reset");

    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(store.get("k").await.expect("get"), None);
}

#[tokio::test(start_paused = true)]
async fn expire_extends_sliding_window() {
    let store = MemoryStore::new();
    store.increment("counter").await.expect("incr");
    store.expire("counter", TTL).await.expect("expire");

    // Re-arming every 6s keeps the counter alive well past the first deadline.
    for _ in 0..5 {
        tokio::time::advance(Duration::from_secs(6)).await;
        store.increment("counter").await.expect("incr");
        assert!(store.expire("counter", TTL).await.expect("expire"));
    }
    assert_eq!(store.get("counter").await.expect("get"), Some(Bytes::from("6")));

    tokio::time::advance(TTL).await;
    assert_eq!(store.get("counter").await.expect("get"), None);
}

#[tokio::test(start_paused = true)]
async fn delete_of_expired_key_reports_false() {
    let store = MemoryStore::new();
    store.set_with_ttl("k", Bytes::from("true"), TTL).await.expect("set");

    tokio::time::advance(TTL).await;
    assert!(!store.delete("k").await.expect("delete"));
}

#[tokio::test(start_paused = true)]
async fn expired_keys_leave_stats() {
    let store = MemoryStore::new();
    store.set_with_ttl("a", Bytes::from("1"), TTL).await.expect("set");
    store.set("b", Bytes::from("1")).await.expect("set");

    tokio::time::advance(TTL).await;
    let stats = store.stats().await.expect("stats");
    assert_eq!(stats.total, 1);
    assert_eq!(stats.with_expiry, 0);
    assert_eq!(stats.without_expiry, 1);
}
