//! Shared test utilities for code built on the credential registry.
//!
//! Feature-gated behind `testutil`. Enable it in `[dev-dependencies]`:
//!
//! ```toml
//! [dev-dependencies]
//! credgate-authn = { path = "../authn", features = ["testutil"] }
//! ```

use std::sync::Arc;

use credgate_storage::{ExpiringStore, MemoryStore};

use crate::{
    claims::SessionClaims, config::RegistryConfig, registry::CredentialRegistry,
    throttle::LoginThrottle, verdict::AccessEvaluator,
};

/// Builds claims for `user_id` issued now and expiring in `ttl_secs`.
#[must_use]
pub fn session_claims(user_id: &str, ttl_secs: i64) -> SessionClaims {
    let now = chrono::Utc::now().timestamp();
    SessionClaims {
        user_id: user_id.to_owned(),
        email: format!("{user_id}@example.com"),
        name: None,
        role_id: None,
        role: None,
        iat: now,
        exp: now + ttl_secs,
    }
}

/// A registry with default config over `store`.
pub fn registry_over<S: ExpiringStore + 'static>(store: S) -> CredentialRegistry {
    CredentialRegistry::new(Arc::new(store), RegistryConfig::default())
}

/// The three login/request components over one fresh [`MemoryStore`].
///
/// The store handle is returned so tests can inspect raw keys.
pub struct Harness {
    /// Direct handle to the backing store.
    pub store: MemoryStore,
    /// Registry over `store`.
    pub registry: CredentialRegistry,
    /// Evaluator over `registry`.
    pub evaluator: AccessEvaluator,
    /// Throttle over `registry`.
    pub throttle: LoginThrottle,
}

impl Harness {
    /// Builds a harness with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Builds a harness with `config`.
    #[must_use]
    pub fn with_config(config: RegistryConfig) -> Self {
        let store = MemoryStore::new();
        let registry = CredentialRegistry::new(Arc::new(store.clone()), config);
        Self {
            evaluator: AccessEvaluator::new(registry.clone()),
            throttle: LoginThrottle::new(registry.clone()),
            registry,
            store,
        }
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
