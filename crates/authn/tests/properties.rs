//! Behavioral properties of the registry, evaluator and throttle, checked
//! end to end over a `MemoryStore`.

#![allow(clippy::expect_used, clippy::panic, clippy::unwrap_used)]

use std::time::Duration;

use credgate_authn::{
    DenyReason, RoleClaims, ThrottleDecision,
    testutil::{Harness, session_claims},
    token_fingerprint,
};
use credgate_storage::ExpiringStore;
use proptest::prelude::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread().enable_all().build().expect("runtime")
}

proptest! {
    /// Block sets both signals; unblock clears both.
    #[test]
    fn block_unblock_round_trip(user_id in "[a-zA-Z0-9_-]{1,32}") {
        runtime().block_on(async {
            let h = Harness::new();

            let _ = h.registry.block_user(&user_id).await;
            prop_assert!(h.registry.is_user_blocked(&user_id).await.value());
            prop_assert!(h.registry.is_forced_logout(&user_id).await.value());

            let _ = h.registry.unblock_user(&user_id).await;
            prop_assert!(!h.registry.is_user_blocked(&user_id).await.value());
            prop_assert!(!h.registry.is_forced_logout(&user_id).await.value());
            Ok(())
        })?;
    }

    /// Blacklisting a token whose expiry has passed writes nothing.
    #[test]
    fn expired_blacklist_is_noop(token in "[A-Za-z0-9._-]{8,64}", age in 0i64..1_000_000) {
        runtime().block_on(async {
            let h = Harness::new();
            let before = h.store.stats().await.expect("stats").total;

            let exp = chrono::Utc::now().timestamp() - age;
            prop_assert!(!h.registry.blacklist_token(&token, exp).await.value());
            prop_assert!(!h.registry.is_token_blacklisted(&token).await.value());
            prop_assert_eq!(h.store.stats().await.expect("stats").total, before);
            Ok(())
        })?;
    }

    /// Counters only go up inside their window.
    #[test]
    fn attempts_are_monotonic(n in 1u32..30) {
        runtime().block_on(async {
            let h = Harness::new();
            let mut last = 0;
            for _ in 0..n {
                let next = h.throttle.record_failure("a@b.c").await;
                prop_assert!(next > last);
                last = next;
            }
            prop_assert_eq!(h.registry.get_login_attempts("a@b.c").await.value(), n);
            Ok(())
        })?;
    }
}

#[tokio::test(start_paused = true)]
async fn blacklist_lasts_until_token_expiry() {
    let h = Harness::new();
    let claims = session_claims("u1", 5);

    assert!(h.registry.logout("tok", &claims).await.value());
    assert!(h.registry.is_token_blacklisted("tok").await.value());
    assert_eq!(
        h.evaluator.evaluate("tok", claims.clone()).await.deny_reason(),
        Some(DenyReason::TokenInvalidated)
    );

    tokio::time::advance(Duration::from_secs(6)).await;
    assert!(!h.registry.is_token_blacklisted("tok").await.value());
    assert!(h.store.keys_with_prefix("blacklist:").await.expect("scan").is_empty());
}

#[tokio::test]
async fn logout_revokes_token_carrying_full_role() {
    let h = Harness::new();
    let mut claims = session_claims("u1", 3600);
    claims.role = Some(RoleClaims {
        name: "admin".into(),
        display_name: "Administrator".into(),
        permissions: (0..60).map(|i| format!("resource_{i:02}:read_write")).collect(),
    });
    let payload = serde_json::to_string(&claims).expect("encode claims");
    let token = format!("eyJhbGciOiJIUzI1NiJ9.{payload}.c2lnbmF0dXJl");
    assert!(token.len() > 1024, "token is only {} bytes", token.len());

    let outcome = h.registry.logout(&token, &claims).await;
    assert!(!outcome.is_degraded(), "logout degraded: {:?}", outcome.cause());
    assert!(outcome.value());

    assert!(h.registry.is_token_blacklisted(&token).await.value());
    assert_eq!(
        h.evaluator.evaluate(&token, claims.clone()).await.deny_reason(),
        Some(DenyReason::TokenInvalidated)
    );
    assert_eq!(h.registry.blacklisted_tokens().await.value(), vec![token_fingerprint(&token)]);
}

#[tokio::test]
async fn five_failures_throttle_until_reset() {
    let h = Harness::new();
    for _ in 0..5 {
        h.registry.increment_login_attempts("a@b.c").await.value();
    }
    assert_eq!(h.throttle.check("a@b.c").await, ThrottleDecision::Throttled { attempts: 5 });

    let _ = h.registry.reset_login_attempts("a@b.c").await;
    assert!(h.throttle.check("a@b.c").await.is_allowed());
}

#[tokio::test(start_paused = true)]
async fn throttle_lifts_when_window_lapses() {
    let h = Harness::new();
    for _ in 0..5 {
        h.throttle.record_failure("a@b.c").await;
    }
    assert!(!h.throttle.check("a@b.c").await.is_allowed());

    tokio::time::advance(h.registry.config().login_attempt_window()).await;
    assert!(h.throttle.check("a@b.c").await.is_allowed());
}

#[tokio::test]
async fn unblock_is_idempotent() {
    let h = Harness::new();
    let first = h.registry.unblock_user("u1").await;
    let second = h.registry.unblock_user("u1").await;
    assert!(!first.is_degraded());
    assert!(!second.is_degraded());
}

#[tokio::test]
async fn blocked_user_denied_for_any_token() {
    let h = Harness::new();
    let _ = h.registry.block_user("u1").await;

    for token in ["fresh-token", "another-token"] {
        let verdict = h.evaluator.evaluate(token, session_claims("u1", 3600)).await;
        assert_eq!(verdict.deny_reason(), Some(DenyReason::AccountBlocked));
        assert_eq!(verdict.public_message(), Some(credgate_authn::GENERIC_DENIAL_MESSAGE));
    }

    let _ = h.registry.unblock_user("u1").await;
    assert!(h.evaluator.evaluate("fresh-token", session_claims("u1", 3600)).await.is_allowed());
}

#[tokio::test]
async fn block_takes_effect_on_next_evaluation() {
    let h = Harness::new();
    let claims = session_claims("u1", 3600);

    assert!(h.evaluator.evaluate("tok", claims.clone()).await.is_allowed());
    let _ = h.registry.block_user("u1").await;
    assert!(!h.evaluator.evaluate("tok", claims).await.is_allowed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_failures_all_counted() {
    let h = Harness::new();
    let mut handles = Vec::new();
    for _ in 0..20 {
        let throttle = h.throttle.clone();
        handles.push(tokio::spawn(async move { throttle.record_failure("a@b.c").await }));
    }
    for handle in handles {
        handle.await.expect("task panicked");
    }
    assert_eq!(h.registry.get_login_attempts("a@b.c").await.value(), 20);
}
