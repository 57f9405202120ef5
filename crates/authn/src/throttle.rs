//! Failed-login throttling and the pre-session account gate.
//!
//! A login runs through [`LoginThrottle`] in this order:
//!
//! 1. [`check`](LoginThrottle::check) before touching credentials. A
//!    throttled identity is refused without a password check and without a
//!    store write, so a refused request never extends the window.
//! 2. [`check_account`](LoginThrottle::check_account) once the user record is
//!    loaded.
//! 3. [`record_failure`](LoginThrottle::record_failure) on a wrong password,
//!    or [`record_success`](LoginThrottle::record_success) on a right one.

use chrono::{DateTime, Utc};

use crate::{
    error::{AuthError, Result},
    registry::CredentialRegistry,
};

/// Result of a pre-login throttle check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    /// The login may proceed.
    Allowed {
        /// Failed attempts counted so far in the window.
        attempts: u32,
    },
    /// The identity is over the threshold; refuse without checking credentials.
    Throttled {
        /// Failed attempts counted in the window.
        attempts: u32,
    },
}

impl ThrottleDecision {
    /// Returns `true` for [`ThrottleDecision::Allowed`].
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }

    /// Returns the attempt count the decision was based on.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Allowed { attempts } | Self::Throttled { attempts } => *attempts,
        }
    }
}

/// Account flags from the user record, supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountStatus {
    /// Whether the account is active. Inactive accounts cannot log in.
    pub active: bool,
    /// Block flag stored on the user record.
    pub blocked: bool,
    /// Temporary lock, if any.
    pub locked_until: Option<DateTime<Utc>>,
}

impl Default for AccountStatus {
    fn default() -> Self {
        Self { active: true, blocked: false, locked_until: None }
    }
}

/// Counts failed logins per identity and refuses logins over the threshold.
#[derive(Debug, Clone)]
pub struct LoginThrottle {
    registry: CredentialRegistry,
}

impl LoginThrottle {
    /// Creates a throttle over `registry`, using its configured threshold.
    pub fn new(registry: CredentialRegistry) -> Self {
        Self { registry }
    }

    /// Reads the attempt count and decides whether a login may proceed.
    ///
    /// Read-only. If the count cannot be read the login is allowed.
    #[tracing::instrument(skip_all)]
    pub async fn check(&self, email: &str) -> ThrottleDecision {
        let attempts = self.registry.get_login_attempts(email).await.value();
        if attempts >= self.registry.config().max_login_attempts() {
            tracing::debug!(attempts, "login throttled");
            ThrottleDecision::Throttled { attempts }
        } else {
            ThrottleDecision::Allowed { attempts }
        }
    }

    /// Like [`check`](Self::check), as a `Result` for `?` in login handlers.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TooManyAttempts`] when throttled.
    pub async fn ensure_allowed(&self, email: &str) -> Result<u32> {
        match self.check(email).await {
            ThrottleDecision::Allowed { attempts } => Ok(attempts),
            ThrottleDecision::Throttled { attempts } => Err(AuthError::too_many_attempts(attempts)),
        }
    }

    /// Records a failed credential check and returns the new count.
    #[tracing::instrument(skip_all)]
    pub async fn record_failure(&self, email: &str) -> u32 {
        self.registry.increment_login_attempts(email).await.value()
    }

    /// Records a successful login, clearing the count.
    #[tracing::instrument(skip_all)]
    pub async fn record_success(&self, email: &str) {
        // A leftover counter only delays the user; it expires with the window.
        let _ = self.registry.reset_login_attempts(email).await;
    }

    /// Checks the user record before a session is issued.
    ///
    /// An inactive account counts as a failed attempt and is reported as
    /// [`AuthError::InvalidCredentials`], indistinguishable from an unknown
    /// email.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidCredentials`] if the account is inactive
    /// - [`AuthError::AccountBlocked`] if the record or the registry marks the user blocked
    /// - [`AuthError::AccountLocked`] if `locked_until` is after `now`
    #[tracing::instrument(skip(self, email, status))]
    pub async fn check_account(
        &self,
        email: &str,
        user_id: &str,
        status: &AccountStatus,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if !status.active {
            self.record_failure(email).await;
            return Err(AuthError::InvalidCredentials);
        }
        if status.blocked || self.registry.is_user_blocked(user_id).await.value() {
            return Err(AuthError::AccountBlocked);
        }
        if let Some(until) = status.locked_until
            && until > now
        {
            return Err(AuthError::account_locked(until));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration as ChronoDuration;
    use credgate_storage::{MemoryStore, testutil::UnavailableStore};

    use super::*;
    use crate::RegistryConfig;

    fn throttle() -> LoginThrottle {
        LoginThrottle::new(CredentialRegistry::new(
            Arc::new(MemoryStore::new()),
            RegistryConfig::default(),
        ))
    }

    #[tokio::test]
    async fn test_five_failures_throttle() {
        let throttle = throttle();
        for n in 1..=4 {
            assert_eq!(throttle.record_failure("a@b.c").await, n);
            assert!(throttle.check("a@b.c").await.is_allowed());
        }
        assert_eq!(throttle.record_failure("a@b.c").await, 5);

        let decision = throttle.check("a@b.c").await;
        assert_eq!(decision, ThrottleDecision::Throttled { attempts: 5 });
        assert_eq!(throttle.ensure_allowed("a@b.c").await, Err(AuthError::too_many_attempts(5)));
    }

    #[tokio::test]
    async fn test_check_does_not_write() {
        let throttle = throttle();
        for _ in 0..5 {
            throttle.record_failure("a@b.c").await;
        }
        for _ in 0..3 {
            assert!(!throttle.check("a@b.c").await.is_allowed());
        }
        assert_eq!(throttle.registry.get_login_attempts("a@b.c").await.value(), 5);
    }

    #[tokio::test]
    async fn test_success_resets() {
        let throttle = throttle();
        for _ in 0..5 {
            throttle.record_failure("a@b.c").await;
        }
        throttle.record_success("a@b.c").await;
        assert_eq!(throttle.check("a@b.c").await, ThrottleDecision::Allowed { attempts: 0 });
    }

    #[tokio::test]
    async fn test_identities_are_independent() {
        let throttle = throttle();
        for _ in 0..5 {
            throttle.record_failure("a@b.c").await;
        }
        assert!(throttle.check("x@y.z").await.is_allowed());
    }

    #[tokio::test]
    async fn test_custom_threshold() {
        let config = RegistryConfig::builder().max_login_attempts(2).build().unwrap();
        let throttle =
            LoginThrottle::new(CredentialRegistry::new(Arc::new(MemoryStore::new()), config));
        throttle.record_failure("a@b.c").await;
        assert!(throttle.check("a@b.c").await.is_allowed());
        throttle.record_failure("a@b.c").await;
        assert_eq!(throttle.check("a@b.c").await.attempts(), 2);
        assert!(!throttle.check("a@b.c").await.is_allowed());
    }

    #[tokio::test]
    async fn test_unreachable_store_allows_login() {
        let throttle = LoginThrottle::new(CredentialRegistry::new(
            Arc::new(UnavailableStore),
            RegistryConfig::default(),
        ));
        assert_eq!(throttle.check("a@b.c").await, ThrottleDecision::Allowed { attempts: 0 });
        assert_eq!(throttle.record_failure("a@b.c").await, 0);
    }

    #[tokio::test]
    async fn test_account_gate() {
        let throttle = throttle();
        let now = Utc::now();

        let ok = AccountStatus::default();
        assert!(throttle.check_account("a@b.c", "u1", &ok, now).await.is_ok());

        let inactive = AccountStatus { active: false, ..ok };
        assert_eq!(
            throttle.check_account("a@b.c", "u1", &inactive, now).await,
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(throttle.registry.get_login_attempts("a@b.c").await.value(), 1);

        let record_blocked = AccountStatus { blocked: true, ..ok };
        assert_eq!(
            throttle.check_account("a@b.c", "u1", &record_blocked, now).await,
            Err(AuthError::AccountBlocked)
        );

        let until = now + ChronoDuration::minutes(10);
        let locked = AccountStatus { locked_until: Some(until), ..ok };
        assert_eq!(
            throttle.check_account("a@b.c", "u1", &locked, now).await,
            Err(AuthError::account_locked(until))
        );

        let lapsed = AccountStatus { locked_until: Some(now - ChronoDuration::minutes(1)), ..ok };
        assert!(throttle.check_account("a@b.c", "u1", &lapsed, now).await.is_ok());
    }

    #[tokio::test]
    async fn test_registry_block_overrides_record() {
        let throttle = throttle();
        let _ = throttle.registry.block_user("u1").await;

        let result =
            throttle.check_account("a@b.c", "u1", &AccountStatus::default(), Utc::now()).await;
        assert_eq!(result, Err(AuthError::AccountBlocked));
    }
}
