//! Login-path error types.
//!
//! Registry and evaluator operations never fail; they return an
//! [`Outcome`](crate::Outcome) or a [`Verdict`](crate::Verdict). The only
//! errors surfaced to callers are the login denials defined here.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Generic message shown to a user for any login denial except throttling.
pub const GENERIC_LOGIN_MESSAGE: &str = "Invalid credentials";

/// Message shown to a throttled user.
pub const THROTTLED_LOGIN_MESSAGE: &str = "Too many login attempts. Please try again later.";

/// Reasons a login attempt is refused before a session is issued.
///
/// # Non-exhaustive
///
/// New variants may be added in future minor releases. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// The identity reached the failed-attempt threshold inside the window.
    #[error("Too many login attempts ({attempts})")]
    TooManyAttempts {
        /// Failed attempts counted in the current window.
        attempts: u32,
    },

    /// Unknown identity, inactive account, or wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The account is blocked, by its user record or by the registry.
    #[error("Account is blocked")]
    AccountBlocked,

    /// The account is locked until the given instant.
    #[error("Account is temporarily locked until {until}")]
    AccountLocked {
        /// When the lock lifts.
        until: DateTime<Utc>,
    },
}

impl AuthError {
    /// Creates a [`AuthError::TooManyAttempts`] error.
    #[must_use]
    pub fn too_many_attempts(attempts: u32) -> Self {
        Self::TooManyAttempts { attempts }
    }

    /// Creates a [`AuthError::AccountLocked`] error.
    #[must_use]
    pub fn account_locked(until: DateTime<Utc>) -> Self {
        Self::AccountLocked { until }
    }

    /// Returns the message safe to show the user.
    ///
    /// Throttling gets its own message so the user knows to wait; every other
    /// denial collapses into one string that does not reveal which check fired.
    #[must_use]
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::TooManyAttempts { .. } => THROTTLED_LOGIN_MESSAGE,
            _ => GENERIC_LOGIN_MESSAGE,
        }
    }

    /// Returns a stable machine-readable code for logs and metrics.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::TooManyAttempts { .. } => "too_many_attempts",
            Self::InvalidCredentials => "invalid_credentials",
            Self::AccountBlocked => "account_blocked",
            Self::AccountLocked { .. } => "account_locked",
        }
    }
}

/// Result type alias for login-path operations.
pub type Result<T> = std::result::Result<T, AuthError>;
