//! # credgate authentication state
//!
//! Session invalidation and credential state for the request-authentication
//! path.
//!
//! This crate provides:
//! - **Credential registry**: block/unblock users, force logouts, token blacklist, failed-login
//!   counters, all as self-expiring keys in an [`ExpiringStore`](credgate_storage::ExpiringStore)
//! - **Access verdicts**: one allow/deny decision per authenticated request
//! - **Login throttle**: sliding-window failed-attempt limit and the pre-session account gate
//!
//! ## Failure Policy
//!
//! The store is ephemeral and may be remote. Every store call is bounded by a
//! short timeout, and a store that cannot answer never denies a request: its
//! checks are treated as "signal absent". Registry calls surface this as
//! [`Outcome::Degraded`] so callers can see it happened.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use credgate_authn::{
//!     AccessEvaluator, CredentialRegistry, DenyReason, RegistryConfig, SessionClaims,
//! };
//! use credgate_storage::MemoryStore;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let registry = CredentialRegistry::new(Arc::new(MemoryStore::new()), RegistryConfig::default());
//! let evaluator = AccessEvaluator::new(registry.clone());
//!
//! let claims = SessionClaims {
//!     user_id: "u1".into(),
//!     email: "u1@example.com".into(),
//!     name: None,
//!     role_id: None,
//!     role: None,
//!     iat: 0,
//!     exp: i64::MAX,
//! };
//!
//! let _ = registry.block_user("u1").await;
//! let verdict = evaluator.evaluate("eyJ...", claims).await;
//! assert_eq!(verdict.deny_reason(), Some(DenyReason::AccountBlocked));
//! # });
//! ```
//!
//! ## Feature Flags
//!
//! - **`redis`**: Enables `RedisStore` in `credgate-storage`.
//! - **`failpoints`**: Enables fail-point injection for fault testing.
//! - **`testutil`**: Enables the `testutil` module.

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Decoded session token payloads.
pub mod claims;
/// Registry configuration.
pub mod config;
/// Login-path error types.
pub mod error;
/// Store key layout.
pub mod keys;
/// Success-or-degraded results.
pub mod outcome;
/// Credential state registry.
pub mod registry;
/// Shared test utilities.
#[cfg(any(test, feature = "testutil"))]
pub mod testutil;
/// Failed-login throttling.
pub mod throttle;
/// Per-request access verdicts.
pub mod verdict;

pub use claims::{Principal, RoleClaims, SessionClaims};
pub use config::{
    DEFAULT_FORCE_LOGOUT_TTL, DEFAULT_LOGIN_ATTEMPT_WINDOW, DEFAULT_MAX_LOGIN_ATTEMPTS,
    DEFAULT_STORE_TIMEOUT, RegistryConfig,
};
pub use error::{AuthError, GENERIC_LOGIN_MESSAGE, Result, THROTTLED_LOGIN_MESSAGE};
pub use keys::{KeyKind, token_fingerprint};
pub use outcome::Outcome;
pub use registry::{CredentialRegistry, RegistryStats};
pub use throttle::{AccountStatus, LoginThrottle, ThrottleDecision};
pub use verdict::{AccessEvaluator, DenyReason, GENERIC_DENIAL_MESSAGE, Verdict};
