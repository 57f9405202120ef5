//! Argument validation shared by store implementations.
//!
//! Keys must be non-empty and at most [`MAX_KEY_SIZE`] bytes. TTLs must be
//! strictly positive; a zero TTL would create an entry that is already dead,
//! which is always a bug in the composing logic.

use std::time::Duration;

use crate::StorageError;

/// Maximum key size in bytes (512 B).
pub const MAX_KEY_SIZE: usize = 512;

/// Validates a key.
///
/// # Errors
///
/// Returns [`StorageError::InvalidArgument`] if `key` is empty or longer than
/// [`MAX_KEY_SIZE`] bytes.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() {
        return Err(StorageError::invalid_argument("key must not be empty"));
    }
    if key.len() > MAX_KEY_SIZE {
        return Err(StorageError::invalid_argument(format!(
            "key is {} bytes, limit is {MAX_KEY_SIZE}",
            key.len()
        )));
    }
    Ok(())
}

/// Validates a TTL for `set_with_ttl` and `expire`.
///
/// # Errors
///
/// Returns [`StorageError::InvalidArgument`] if `ttl` is zero.
pub fn validate_ttl(ttl: Duration) -> Result<(), StorageError> {
    if ttl.is_zero() {
        return Err(StorageError::invalid_argument("ttl must be positive"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_regular_key() {
        assert!(validate_key("blocked_user:42").is_ok());
    }

    #[test]
    fn rejects_empty_key() {
        assert!(matches!(validate_key(""), Err(StorageError::InvalidArgument { .. })));
    }

    #[test]
    fn key_at_limit_is_accepted() {
        let key = "k".repeat(MAX_KEY_SIZE);
        assert!(validate_key(&key).is_ok());
    }

    #[test]
    fn key_over_limit_is_rejected() {
        let key = "k".repeat(MAX_KEY_SIZE + 1);
        assert!(matches!(validate_key(&key), Err(StorageError::InvalidArgument { .. })));
    }

    #[test]
    fn zero_ttl_is_rejected() {
        assert!(validate_ttl(Duration::ZERO).is_err());
        assert!(validate_ttl(Duration::from_nanos(1)).is_ok());
    }
}
