//! Contract checks for `RedisStore` against a real Redis server.
//!
//! Skipped unless `RUN_REDIS_INTEGRATION_TESTS` is set. Every store handed to
//! a check starts from an empty database, so point `REDIS_URL` at a database
//! nothing else uses.
//!
//! # Running the tests
//!
//! ```bash
//! docker run --rm -p 6379:6379 redis:7
//!
//! RUN_REDIS_INTEGRATION_TESTS=1 \
//! REDIS_URL=redis://localhost:6379/15 \
//! cargo test -p credgate-storage --features redis --test redis_conformance
//! ```

#![cfg(feature = "redis")]
#![allow(clippy::expect_used, clippy::panic)]

use std::{env, time::Duration};

use bytes::Bytes;
use credgate_storage::{
    DEFAULT_REDIS_URL, ExpiringStore, KeyTtl, RedisStore, RedisStoreConfig, conformance,
};
use tokio::sync::{Mutex, MutexGuard};

/// Tests share one database; each holds this while it runs.
static SERIAL: Mutex<()> = Mutex::const_new(());

fn should_run() -> bool {
    env::var("RUN_REDIS_INTEGRATION_TESTS").is_ok()
}

fn redis_url() -> String {
    env::var("REDIS_URL").unwrap_or_else(|_| DEFAULT_REDIS_URL.to_owned())
}

async fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().await
}

/// Connects a store to an emptied database.
async fn fresh_store() -> RedisStore {
    let url = redis_url();

    let client = redis::Client::open(url.as_str()).expect("valid redis url");
    let mut conn = client.get_multiplexed_async_connection().await.expect("redis reachable");
    let _: () = redis::cmd("FLUSHDB").query_async(&mut conn).await.expect("flushdb");

    let config = RedisStoreConfig::builder().url(url).build();
    RedisStore::connect(&config).await.expect("connect")
}

#[tokio::test]
async fn redis_store_conforms() {
    if !should_run() {
        eprintln!("Skipping Redis test (RUN_REDIS_INTEGRATION_TESTS not set)");
        return;
    }
    let _guard = serial().await;

    conformance::run_all_with(fresh_store).await;
}

#[tokio::test]
async fn prefix_scan_treats_glob_characters_literally() {
    if !should_run() {
        eprintln!("Skipping Redis test (RUN_REDIS_INTEGRATION_TESTS not set)");
        return;
    }
    let _guard = serial().await;
    let store = fresh_store().await;

    for key in ["odd*:a", "odd?:b", "odd[x]:c", "oddity:d"] {
        store.set(key, Bytes::from("1")).await.expect("set");
    }

    assert_eq!(store.keys_with_prefix("odd*").await.expect("scan"), vec!["odd*:a"]);
    assert_eq!(store.keys_with_prefix("odd?").await.expect("scan"), vec!["odd?:b"]);
    assert_eq!(store.keys_with_prefix("odd[x]").await.expect("scan"), vec!["odd[x]:c"]);
    assert_eq!(store.keys_with_prefix("odd").await.expect("scan").len(), 4);
}

#[tokio::test]
async fn sub_second_ttl_is_kept_in_milliseconds() {
    if !should_run() {
        eprintln!("Skipping Redis test (RUN_REDIS_INTEGRATION_TESTS not set)");
        return;
    }
    let _guard = serial().await;
    let store = fresh_store().await;

    store
        .set_with_ttl("ms:a", Bytes::from("v"), Duration::from_millis(1500))
        .await
        .expect("set_with_ttl");
    match store.ttl("ms:a").await.expect("ttl") {
        KeyTtl::Expires(remaining) => {
            assert!(remaining > Duration::from_secs(1), "rounded down: {remaining:?}");
            assert!(remaining <= Duration::from_millis(1500), "rounded up: {remaining:?}");
        },
        other => panic!("expected Expires, got {other:?}"),
    }

    store.set("ms:b", Bytes::from("v")).await.expect("set");
    assert!(store.expire("ms:b", Duration::from_millis(300)).await.expect("expire"));
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(store.get("ms:b").await.expect("get"), None);
    assert_eq!(store.ttl("ms:b").await.expect("ttl"), KeyTtl::Missing);
}

#[tokio::test]
async fn stats_split_persistent_and_expiring_keys() {
    if !should_run() {
        eprintln!("Skipping Redis test (RUN_REDIS_INTEGRATION_TESTS not set)");
        return;
    }
    let _guard = serial().await;
    let store = fresh_store().await;

    store.set("blocked_user:u1", Bytes::from("true")).await.expect("set");
    store
        .set_with_ttl("force_logout:u1", Bytes::from("true"), Duration::from_secs(60))
        .await
        .expect("set_with_ttl");
    store.increment("login_attempts:a@b.c").await.expect("incr");

    let stats = store.stats().await.expect("stats");
    assert_eq!(stats.total, 3);
    assert_eq!(stats.with_expiry, 1);
    assert_eq!(stats.without_expiry, 2);
}
