#![allow(clippy::expect_used, clippy::panic)]
//! Fail-point injection for the multi-key block operation.
//!
//! These tests require the `failpoints` feature:
//! ```bash
//! cargo test -p credgate-authn --features failpoints --test failpoint_tests
//! ```

#![cfg(feature = "failpoints")]

use credgate_authn::{DenyReason, testutil::Harness, testutil::session_claims};

#[tokio::test]
async fn block_interrupted_after_marker_still_denies() {
    let scenario = fail::FailScenario::setup();
    fail::cfg("block-before-force-logout", "return").expect("failed to configure fail point");

    let h = Harness::new();
    let outcome = h.registry.block_user("u1").await;
    assert!(outcome.is_degraded(), "block should report the interrupted second write");

    assert!(h.registry.is_user_blocked("u1").await.value());
    assert!(!h.registry.is_forced_logout("u1").await.value());

    let verdict = h.evaluator.evaluate("tok", session_claims("u1", 3600)).await;
    assert_eq!(verdict.deny_reason(), Some(DenyReason::AccountBlocked));

    scenario.teardown();
}

#[tokio::test]
async fn block_without_failpoint_writes_both_markers() {
    let scenario = fail::FailScenario::setup();

    let h = Harness::new();
    assert!(!h.registry.block_user("u1").await.is_degraded());
    assert!(h.registry.is_forced_logout("u1").await.value());

    scenario.teardown();
}
