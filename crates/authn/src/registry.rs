//! Credential state registry.
//!
//! [`CredentialRegistry`] turns named credential operations (block a user,
//! blacklist a token, count a failed login) into short sequences of
//! [`ExpiringStore`] calls under the key layout in [`keys`](crate::keys).
//!
//! # Failure Policy
//!
//! Every store call is bounded by [`RegistryConfig::store_timeout`]. No
//! operation returns an error: a store failure yields
//! [`Outcome::Degraded`] with the fail-open default (`false` for existence
//! checks, `0` for counters, empty lists for introspection).
//!
//! # Multi-key Operations
//!
//! Blocking writes two keys and is not atomic across them. The blocked-user
//! marker is written first, so a failure on the second write still leaves
//! the user denied. Unblocking removes both keys; the evaluator treats them
//! with OR semantics, so their removal order does not matter.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use bytes::Bytes;
use credgate_storage::{ExpiringStore, StorageError, StorageResult, StoreStats, TimeoutStore};
use fail::fail_point;
use serde::Serialize;

use crate::{
    claims::Principal,
    config::RegistryConfig,
    keys::{self, KeyKind, MARKER_VALUE},
    outcome::Outcome,
};

/// Aggregate counts for operational visibility.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    /// Live entries in the whole store.
    pub store: StoreStats,
    /// Blocked-user markers.
    pub blocked_users: usize,
    /// Force-logout markers.
    pub forced_logouts: usize,
    /// Blacklisted tokens.
    pub blacklisted_tokens: usize,
    /// Failed-login counters.
    pub login_counters: usize,
    /// Keys outside the registry's prefixes.
    pub other_keys: usize,
}

/// Named credential-state operations over an [`ExpiringStore`].
///
/// Cheap to clone; clones share the same store.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use credgate_authn::{CredentialRegistry, RegistryConfig};
/// use credgate_storage::MemoryStore;
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let registry = CredentialRegistry::new(Arc::new(MemoryStore::new()), RegistryConfig::default());
///
/// let _ = registry.block_user("u1").await;
/// assert!(registry.is_user_blocked("u1").await.value());
/// assert!(registry.is_forced_logout("u1").await.value());
/// # });
/// ```
#[derive(Clone)]
pub struct CredentialRegistry {
    store: TimeoutStore<Arc<dyn ExpiringStore>>,
    config: RegistryConfig,
}

impl std::fmt::Debug for CredentialRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRegistry").field("config", &self.config).finish_non_exhaustive()
    }
}

fn marker() -> Bytes {
    Bytes::from_static(MARKER_VALUE.as_bytes())
}

fn clamp_count(n: i64) -> u32 {
    u32::try_from(n.max(0)).unwrap_or(u32::MAX)
}

impl CredentialRegistry {
    /// Creates a registry over `store`, bounding each call by the configured
    /// store timeout.
    pub fn new(store: Arc<dyn ExpiringStore>, config: RegistryConfig) -> Self {
        Self { store: TimeoutStore::new(store, config.store_timeout()), config }
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // Blocking

    /// Blocks a user and terminates all of their sessions.
    ///
    /// Writes the blocked-user marker (no expiry), then a force-logout marker.
    /// If the marker write fails nothing else is attempted. If only the
    /// force-logout write fails the user is still blocked and the outcome is
    /// degraded.
    #[tracing::instrument(skip(self))]
    pub async fn block_user(&self, user_id: &str) -> Outcome<()> {
        if let Err(cause) = self.store.set(&keys::blocked_user(user_id), marker()).await {
            return Outcome::degraded("block_user", (), cause);
        }

        fail_point!("block-before-force-logout", |_| {
            Outcome::degraded(
                "block_user",
                (),
                StorageError::internal("injected failure before force logout"),
            )
        });

        let result = self.write_force_logout(user_id).await;
        let audit_result = if result.is_ok() { "success" } else { "partial" };
        tracing::info!(
            audit.action = "block_user",
            audit.resource = %format_args!("user:{user_id}"),
            audit.result = audit_result,
            "audit_event"
        );
        Outcome::from_store("block_user", result, ())
    }

    /// Unblocks a user, removing both the blocked marker and any force-logout
    /// marker. Unblocking a user who is not blocked is a no-op.
    #[tracing::instrument(skip(self))]
    pub async fn unblock_user(&self, user_id: &str) -> Outcome<()> {
        let blocked = self.store.delete(&keys::blocked_user(user_id)).await;
        let forced = self.store.delete(&keys::force_logout(user_id)).await;

        let result = blocked.and(forced).map(|_| ());
        if result.is_ok() {
            tracing::info!(
                audit.action = "unblock_user",
                audit.resource = %format_args!("user:{user_id}"),
                audit.result = "success",
                "audit_event"
            );
        }
        Outcome::from_store("unblock_user", result, ())
    }

    /// Returns whether the user carries a blocked marker.
    #[tracing::instrument(skip(self))]
    pub async fn is_user_blocked(&self, user_id: &str) -> Outcome<bool> {
        self.exists("is_user_blocked", &keys::blocked_user(user_id)).await
    }

    // Force logout

    /// Terminates every session of a user for the configured force-logout TTL,
    /// without blocking them.
    #[tracing::instrument(skip(self))]
    pub async fn force_logout(&self, user_id: &str) -> Outcome<()> {
        let result = self.write_force_logout(user_id).await;
        if result.is_ok() {
            tracing::info!(
                audit.action = "force_logout",
                audit.resource = %format_args!("user:{user_id}"),
                audit.result = "success",
                "audit_event"
            );
        }
        Outcome::from_store("force_logout", result, ())
    }

    /// Returns whether the user has a live force-logout marker.
    #[tracing::instrument(skip(self))]
    pub async fn is_forced_logout(&self, user_id: &str) -> Outcome<bool> {
        self.exists("is_forced_logout", &keys::force_logout(user_id)).await
    }

    /// Removes a force-logout marker.
    #[tracing::instrument(skip(self))]
    pub async fn clear_force_logout(&self, user_id: &str) -> Outcome<()> {
        let result = self.store.delete(&keys::force_logout(user_id)).await.map(|_| ());
        Outcome::from_store("clear_force_logout", result, ())
    }

    async fn write_force_logout(&self, user_id: &str) -> StorageResult<()> {
        self.store
            .set_with_ttl(&keys::force_logout(user_id), marker(), self.config.force_logout_ttl())
            .await
    }

    // Token blacklist

    /// Revokes `token` until its own expiry at `expires_at` (Unix seconds).
    ///
    /// Returns `true` if an entry was written. A token already at or past its
    /// expiry is left alone and `false` is returned.
    #[tracing::instrument(skip_all, fields(expires_at = expires_at))]
    pub async fn blacklist_token(&self, token: &str, expires_at: i64) -> Outcome<bool> {
        let remaining = expires_at.saturating_sub(chrono::Utc::now().timestamp());
        if remaining <= 0 {
            tracing::debug!("token already expired, not blacklisting");
            return Outcome::Fresh(false);
        }

        let ttl = Duration::from_secs(remaining.unsigned_abs());
        let result = self.store.set_with_ttl(&keys::blacklist(token), marker(), ttl).await;
        Outcome::from_store("blacklist_token", result.map(|()| true), false)
    }

    /// Blacklists the token a session was issued, until its expiry claim.
    #[tracing::instrument(skip_all, fields(user_id = claims.subject()))]
    pub async fn logout<P: Principal + Sync>(&self, token: &str, claims: &P) -> Outcome<bool> {
        self.blacklist_token(token, claims.expires_at()).await
    }

    /// Returns whether `token` is blacklisted.
    #[tracing::instrument(skip_all)]
    pub async fn is_token_blacklisted(&self, token: &str) -> Outcome<bool> {
        self.exists("is_token_blacklisted", &keys::blacklist(token)).await
    }

    // Login attempts

    /// Counts a failed login and re-arms the attempt window.
    ///
    /// The window slides: every failure pushes its end out by the full
    /// configured duration. Returns the new count.
    #[tracing::instrument(skip_all)]
    pub async fn increment_login_attempts(&self, email: &str) -> Outcome<u32> {
        let key = keys::login_attempts(email);
        let count = match self.store.increment(&key).await {
            Ok(n) => clamp_count(n),
            Err(cause) => return Outcome::degraded("increment_login_attempts", 0, cause),
        };

        match self.store.expire(&key, self.config.login_attempt_window()).await {
            Ok(_) => Outcome::Fresh(count),
            Err(cause) => Outcome::degraded("increment_login_attempts", count, cause),
        }
    }

    /// Clears the failed-login counter.
    #[tracing::instrument(skip_all)]
    pub async fn reset_login_attempts(&self, email: &str) -> Outcome<()> {
        let result = self.store.delete(&keys::login_attempts(email)).await.map(|_| ());
        Outcome::from_store("reset_login_attempts", result, ())
    }

    /// Returns the failed-login count, `0` if none is recorded.
    #[tracing::instrument(skip_all)]
    pub async fn get_login_attempts(&self, email: &str) -> Outcome<u32> {
        let key = keys::login_attempts(email);
        let raw = match self.store.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Outcome::Fresh(0),
            Err(cause) => return Outcome::degraded("get_login_attempts", 0, cause),
        };

        match std::str::from_utf8(&raw).ok().and_then(|s| s.parse::<i64>().ok()) {
            Some(n) => Outcome::Fresh(clamp_count(n)),
            None => Outcome::degraded(
                "get_login_attempts",
                0,
                StorageError::serialization("login attempt counter is not an integer"),
            ),
        }
    }

    // Introspection

    /// Lists the ids of all blocked users.
    #[tracing::instrument(skip(self))]
    pub async fn blocked_users(&self) -> Outcome<Vec<String>> {
        self.subjects("blocked_users", KeyKind::BlockedUser).await
    }

    /// Lists the ids of all users with a live force-logout marker.
    #[tracing::instrument(skip(self))]
    pub async fn forced_logout_users(&self) -> Outcome<Vec<String>> {
        self.subjects("forced_logout_users", KeyKind::ForceLogout).await
    }

    /// Lists the fingerprints of every blacklisted token.
    ///
    /// See [`token_fingerprint`](crate::token_fingerprint).
    #[tracing::instrument(skip(self))]
    pub async fn blacklisted_tokens(&self) -> Outcome<Vec<String>> {
        self.subjects("blacklisted_tokens", KeyKind::Blacklist).await
    }

    /// Groups every live store key by kind.
    #[tracing::instrument(skip(self))]
    pub async fn keys_by_kind(&self) -> Outcome<BTreeMap<KeyKind, Vec<String>>> {
        Outcome::from_store("keys_by_kind", self.grouped_keys().await, BTreeMap::new())
    }

    /// Returns aggregate counts over the store.
    #[tracing::instrument(skip(self))]
    pub async fn stats(&self) -> Outcome<RegistryStats> {
        let result = async {
            let store = self.store.stats().await?;
            let grouped = self.grouped_keys().await?;
            let count = |kind: KeyKind| grouped.get(&kind).map_or(0, Vec::len);
            Ok::<_, StorageError>(RegistryStats {
                store,
                blocked_users: count(KeyKind::BlockedUser),
                forced_logouts: count(KeyKind::ForceLogout),
                blacklisted_tokens: count(KeyKind::Blacklist),
                login_counters: count(KeyKind::LoginAttempts),
                other_keys: count(KeyKind::Other),
            })
        }
        .await;
        Outcome::from_store("stats", result, RegistryStats::default())
    }

    /// Probes the underlying store.
    ///
    /// # Errors
    ///
    /// Returns the store's error if it is unreachable or too slow.
    pub async fn health_check(&self) -> StorageResult<()> {
        self.store.health_check().await
    }

    async fn exists(&self, op: &'static str, key: &str) -> Outcome<bool> {
        Outcome::from_store(op, self.store.get(key).await.map(|v| v.is_some()), false)
    }

    async fn subjects(&self, op: &'static str, kind: KeyKind) -> Outcome<Vec<String>> {
        let prefix = kind.prefix().unwrap_or_default();
        let result = self
            .store
            .keys_with_prefix(prefix)
            .await
            .map(|keys| keys.iter().map(|key| kind.subject(key).to_owned()).collect());
        Outcome::from_store(op, result, Vec::new())
    }

    async fn grouped_keys(&self) -> StorageResult<BTreeMap<KeyKind, Vec<String>>> {
        let mut grouped: BTreeMap<KeyKind, Vec<String>> = BTreeMap::new();
        for key in self.store.keys_with_prefix("").await? {
            grouped.entry(KeyKind::of(&key)).or_default().push(key);
        }
        Ok(grouped)
    }
}
