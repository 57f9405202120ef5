//! Per-request access verdicts.
//!
//! [`AccessEvaluator::evaluate`] runs three registry checks in a fixed order
//! and stops at the first that fires:
//!
//! 1. token blacklisted → [`DenyReason::TokenInvalidated`]
//! 2. subject blocked → [`DenyReason::AccountBlocked`]
//! 3. subject force-logged-out → [`DenyReason::SessionTerminated`]
//!
//! A check the store cannot answer counts as "signal absent". The request
//! keeps going rather than being denied because a dependency is down.

use serde::Serialize;
use thiserror::Error;

use crate::{claims::Principal, outcome::Outcome, registry::CredentialRegistry};

/// Message returned to the client for every denial.
pub const GENERIC_DENIAL_MESSAGE: &str = "Access denied. Please log in again.";

/// Why a request was denied.
///
/// The display string is the reason code used in logs. Clients only ever see
/// [`GENERIC_DENIAL_MESSAGE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// The presented token was revoked.
    #[error("token invalidated")]
    TokenInvalidated,
    /// The subject is administratively blocked.
    #[error("account blocked")]
    AccountBlocked,
    /// Every session of the subject was terminated.
    #[error("session terminated")]
    SessionTerminated,
}

impl DenyReason {
    /// Stable code for logs and metrics.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::TokenInvalidated => "token_invalidated",
            Self::AccountBlocked => "account_blocked",
            Self::SessionTerminated => "session_terminated",
        }
    }
}

/// The outcome of access evaluation for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Verdict<P> {
    /// Continue with the decoded payload, unchanged.
    Allow(P),
    /// Stop the request.
    Deny(DenyReason),
}

impl<P> Verdict<P> {
    /// Returns `true` for [`Verdict::Allow`].
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow(_))
    }

    /// Returns the deny reason, if any.
    #[must_use]
    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            Self::Allow(_) => None,
            Self::Deny(reason) => Some(*reason),
        }
    }

    /// Returns the client-facing message for a denial.
    ///
    /// Identical for every [`DenyReason`] so a client cannot tell which
    /// check fired.
    #[must_use]
    pub fn public_message(&self) -> Option<&'static str> {
        match self {
            Self::Allow(_) => None,
            Self::Deny(_) => Some(GENERIC_DENIAL_MESSAGE),
        }
    }

    /// Converts into a `Result`, handing back the payload on allow.
    ///
    /// # Errors
    ///
    /// Returns the [`DenyReason`] on deny.
    pub fn into_result(self) -> Result<P, DenyReason> {
        match self {
            Self::Allow(principal) => Ok(principal),
            Self::Deny(reason) => Err(reason),
        }
    }
}

/// Combines registry signals into a single verdict per request.
#[derive(Debug, Clone)]
pub struct AccessEvaluator {
    registry: CredentialRegistry,
}

impl AccessEvaluator {
    /// Creates an evaluator over `registry`.
    pub fn new(registry: CredentialRegistry) -> Self {
        Self { registry }
    }

    /// Returns the registry the evaluator consults.
    #[must_use]
    pub fn registry(&self) -> &CredentialRegistry {
        &self.registry
    }

    /// Evaluates a verified token and its decoded payload.
    ///
    /// Never fails: store errors are treated as the signal being absent.
    #[tracing::instrument(skip_all, fields(user_id = principal.subject()))]
    pub async fn evaluate<P>(&self, token: &str, principal: P) -> Verdict<P>
    where
        P: Principal + Send + Sync,
    {
        if fired("blacklist", self.registry.is_token_blacklisted(token).await) {
            return deny(DenyReason::TokenInvalidated);
        }

        let subject = principal.subject();
        if fired("blocked", self.registry.is_user_blocked(subject).await) {
            return deny(DenyReason::AccountBlocked);
        }
        if fired("force_logout", self.registry.is_forced_logout(subject).await) {
            return deny(DenyReason::SessionTerminated);
        }

        Verdict::Allow(principal)
    }
}

/// Resolves one check. A degraded check did not fire.
fn fired(check: &'static str, outcome: Outcome<bool>) -> bool {
    match outcome {
        Outcome::Fresh(present) => present,
        Outcome::Degraded { .. } => {
            tracing::debug!(check, "check unavailable, treating signal as absent");
            false
        },
    }
}

fn deny<P>(reason: DenyReason) -> Verdict<P> {
    tracing::debug!(reason = reason.code(), "access denied");
    Verdict::Deny(reason)
}
