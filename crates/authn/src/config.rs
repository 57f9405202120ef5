//! Registry configuration.
//!
//! All tunables have defaults matching the production deployment and can be
//! loaded from any serde format using human-readable durations:
//!
//! ```
//! use std::time::Duration;
//!
//! use credgate_authn::RegistryConfig;
//!
//! let config: RegistryConfig = serde_json::from_str(
//!     r#"{ "login_attempt_window": "30m", "max_login_attempts": 3 }"#,
//! )?;
//! assert_eq!(config.login_attempt_window(), Duration::from_secs(30 * 60));
//! assert_eq!(config.force_logout_ttl(), Duration::from_secs(24 * 60 * 60));
//! # Ok::<(), serde_json::Error>(())
//! ```

use std::time::Duration;

use credgate_storage::ConfigError;
use serde::Deserialize;

/// Default lifetime of a force-logout marker (24 hours).
pub const DEFAULT_FORCE_LOGOUT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default sliding window for failed login attempts (15 minutes).
pub const DEFAULT_LOGIN_ATTEMPT_WINDOW: Duration = Duration::from_secs(15 * 60);

/// Default number of failed attempts that triggers throttling.
pub const DEFAULT_MAX_LOGIN_ATTEMPTS: u32 = 5;

/// Default deadline for a single store call (250 ms).
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(250);

/// Configuration for [`CredentialRegistry`](crate::CredentialRegistry).
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use credgate_authn::RegistryConfig;
///
/// let config = RegistryConfig::builder()
///     .max_login_attempts(10)
///     .store_timeout(Duration::from_millis(100))
///     .build()?;
/// assert_eq!(config.max_login_attempts(), 10);
/// # Ok::<(), credgate_storage::ConfigError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawRegistryConfig")]
pub struct RegistryConfig {
    force_logout_ttl: Duration,
    login_attempt_window: Duration,
    max_login_attempts: u32,
    store_timeout: Duration,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRegistryConfig {
    #[serde(with = "humantime_serde", default = "default_force_logout_ttl")]
    force_logout_ttl: Duration,
    #[serde(with = "humantime_serde", default = "default_login_attempt_window")]
    login_attempt_window: Duration,
    #[serde(default = "default_max_login_attempts")]
    max_login_attempts: u32,
    #[serde(with = "humantime_serde", default = "default_store_timeout")]
    store_timeout: Duration,
}

fn default_force_logout_ttl() -> Duration {
    DEFAULT_FORCE_LOGOUT_TTL
}

fn default_login_attempt_window() -> Duration {
    DEFAULT_LOGIN_ATTEMPT_WINDOW
}

fn default_max_login_attempts() -> u32 {
    DEFAULT_MAX_LOGIN_ATTEMPTS
}

fn default_store_timeout() -> Duration {
    DEFAULT_STORE_TIMEOUT
}

impl TryFrom<RawRegistryConfig> for RegistryConfig {
    type Error = ConfigError;

    fn try_from(raw: RawRegistryConfig) -> Result<Self, Self::Error> {
        Self::builder()
            .force_logout_ttl(raw.force_logout_ttl)
            .login_attempt_window(raw.login_attempt_window)
            .max_login_attempts(raw.max_login_attempts)
            .store_timeout(raw.store_timeout)
            .build()
    }
}

fn require_positive(field: &'static str, value: Duration) -> Result<(), ConfigError> {
    if value.is_zero() {
        return Err(ConfigError::MustBePositive { field, value: format!("{value:?}") });
    }
    Ok(())
}

#[bon::bon]
impl RegistryConfig {
    /// Creates a new configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MustBePositive`] if any duration is zero, or
    /// [`ConfigError::BelowMinimum`] if `max_login_attempts` is zero.
    #[builder]
    pub fn new(
        #[builder(default = DEFAULT_FORCE_LOGOUT_TTL)] force_logout_ttl: Duration,
        #[builder(default = DEFAULT_LOGIN_ATTEMPT_WINDOW)] login_attempt_window: Duration,
        #[builder(default = DEFAULT_MAX_LOGIN_ATTEMPTS)] max_login_attempts: u32,
        #[builder(default = DEFAULT_STORE_TIMEOUT)] store_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        require_positive("force_logout_ttl", force_logout_ttl)?;
        require_positive("login_attempt_window", login_attempt_window)?;
        require_positive("store_timeout", store_timeout)?;
        if max_login_attempts == 0 {
            return Err(ConfigError::BelowMinimum {
                field: "max_login_attempts",
                min: "1".into(),
                value: max_login_attempts.to_string(),
            });
        }
        Ok(Self { force_logout_ttl, login_attempt_window, max_login_attempts, store_timeout })
    }

    /// Lifetime of a force-logout marker.
    #[must_use]
    pub fn force_logout_ttl(&self) -> Duration {
        self.force_logout_ttl
    }

    /// Sliding window re-armed on every failed login attempt.
    #[must_use]
    pub fn login_attempt_window(&self) -> Duration {
        self.login_attempt_window
    }

    /// Failed attempts at which logins are throttled.
    #[must_use]
    pub fn max_login_attempts(&self) -> u32 {
        self.max_login_attempts
    }

    /// Deadline applied to every store call.
    #[must_use]
    pub fn store_timeout(&self) -> Duration {
        self.store_timeout
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            force_logout_ttl: DEFAULT_FORCE_LOGOUT_TTL,
            login_attempt_window: DEFAULT_LOGIN_ATTEMPT_WINDOW,
            max_login_attempts: DEFAULT_MAX_LOGIN_ATTEMPTS,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}
