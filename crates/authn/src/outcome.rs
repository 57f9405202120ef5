//! Success-or-degraded results for registry operations.
//!
//! A registry call that cannot reach the store does not fail. It returns
//! [`Outcome::Degraded`] carrying the fail-open default and the storage error
//! that forced it, so the caller decides what degradation means instead of
//! the registry hiding it in a log line.

use credgate_storage::{StorageError, StorageResult};

/// The result of a registry operation.
#[derive(Debug, Clone)]
#[must_use = "a degraded outcome should be inspected or deliberately discarded"]
pub enum Outcome<T> {
    /// The store answered.
    Fresh(T),
    /// The store failed; `fallback` is the fail-open default.
    Degraded {
        /// Value to use in place of the store's answer.
        fallback: T,
        /// Why the store could not answer.
        cause: StorageError,
    },
}

impl<T> Outcome<T> {
    /// Wraps a store result, substituting `fallback` on error.
    ///
    /// Transient errors are logged at `warn`, anything else at `error`.
    pub(crate) fn from_store(op: &'static str, result: StorageResult<T>, fallback: T) -> Self {
        match result {
            Ok(value) => Self::Fresh(value),
            Err(cause) => Self::degraded(op, fallback, cause),
        }
    }

    /// Builds a degraded outcome and logs it.
    pub(crate) fn degraded(op: &'static str, fallback: T, cause: StorageError) -> Self {
        if cause.is_transient() {
            tracing::warn!(op, error = %cause, "credential store unavailable, failing open");
        } else {
            tracing::error!(op, error = %cause, "credential store call failed, failing open");
        }
        Self::Degraded { fallback, cause }
    }

    /// Returns the answer, or the fail-open default when degraded.
    pub fn value(self) -> T {
        match self {
            Self::Fresh(value) | Self::Degraded { fallback: value, .. } => value,
        }
    }

    /// Borrows the answer, or the fail-open default when degraded.
    #[must_use]
    pub fn as_value(&self) -> &T {
        match self {
            Self::Fresh(value) | Self::Degraded { fallback: value, .. } => value,
        }
    }

    /// Returns `true` if the store could not answer.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    /// Returns the storage error behind a degraded outcome.
    #[must_use]
    pub fn cause(&self) -> Option<&StorageError> {
        match self {
            Self::Fresh(_) => None,
            Self::Degraded { cause, .. } => Some(cause),
        }
    }

    /// Maps the carried value, keeping the degradation cause.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Fresh(value) => Outcome::Fresh(f(value)),
            Self::Degraded { fallback, cause } => Outcome::Degraded { fallback: f(fallback), cause },
        }
    }

    /// Converts into a `Result`, discarding the fallback.
    ///
    /// # Errors
    ///
    /// Returns the storage error of a degraded outcome.
    pub fn into_result(self) -> StorageResult<T> {
        match self {
            Self::Fresh(value) => Ok(value),
            Self::Degraded { cause, .. } => Err(cause),
        }
    }
}
