//! Store key layout.
//!
//! | Prefix | Meaning | Expiry |
//! |--------|---------|--------|
//! | `blocked_user:{user_id}` | User is administratively blocked | None |
//! | `force_logout:{user_id}` | Every session of the user is invalid | Force-logout TTL |
//! | `blacklist:{fingerprint}` | This token is revoked | Token's own expiry |
//! | `login_attempts:{email}` | Failed login counter | Sliding attempt window |
//!
//! Blacklist keys carry a [`token_fingerprint`] rather than the token itself,
//! so key length does not depend on how many claims a token embeds.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Prefix of blocked-user markers.
pub const BLOCKED_USER_PREFIX: &str = "blocked_user:";
/// Prefix of force-logout markers.
pub const FORCE_LOGOUT_PREFIX: &str = "force_logout:";
/// Prefix of blacklisted-token entries.
pub const BLACKLIST_PREFIX: &str = "blacklist:";
/// Prefix of failed-login counters.
pub const LOGIN_ATTEMPTS_PREFIX: &str = "login_attempts:";

/// Value stored under presence-only markers.
pub(crate) const MARKER_VALUE: &str = "true";

pub(crate) fn blocked_user(user_id: &str) -> String {
    format!("{BLOCKED_USER_PREFIX}{user_id}")
}

pub(crate) fn force_logout(user_id: &str) -> String {
    format!("{FORCE_LOGOUT_PREFIX}{user_id}")
}

/// Returns the lowercase hex SHA-256 of `token`.
///
/// This is the identifier under which a revoked token is stored and listed.
#[must_use]
pub fn token_fingerprint(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

pub(crate) fn blacklist(token: &str) -> String {
    format!("{BLACKLIST_PREFIX}{}", token_fingerprint(token))
}

pub(crate) fn login_attempts(email: &str) -> String {
    format!("{LOGIN_ATTEMPTS_PREFIX}{email}")
}

/// The kind of state a store key holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    /// `blocked_user:` marker.
    BlockedUser,
    /// `force_logout:` marker.
    ForceLogout,
    /// `blacklist:` entry.
    Blacklist,
    /// `login_attempts:` counter.
    LoginAttempts,
    /// Anything else sharing the store.
    Other,
}

impl KeyKind {
    /// Every kind with a registry prefix.
    pub const PREFIXED: [KeyKind; 4] =
        [KeyKind::BlockedUser, KeyKind::ForceLogout, KeyKind::Blacklist, KeyKind::LoginAttempts];

    /// Classifies a raw store key.
    #[must_use]
    pub fn of(key: &str) -> Self {
        Self::PREFIXED
            .into_iter()
            .find(|kind| kind.prefix().is_some_and(|prefix| key.starts_with(prefix)))
            .unwrap_or(KeyKind::Other)
    }

    /// Returns the key prefix, or `None` for [`KeyKind::Other`].
    #[must_use]
    pub fn prefix(self) -> Option<&'static str> {
        match self {
            KeyKind::BlockedUser => Some(BLOCKED_USER_PREFIX),
            KeyKind::ForceLogout => Some(FORCE_LOGOUT_PREFIX),
            KeyKind::Blacklist => Some(BLACKLIST_PREFIX),
            KeyKind::LoginAttempts => Some(LOGIN_ATTEMPTS_PREFIX),
            KeyKind::Other => None,
        }
    }

    /// Strips this kind's prefix, yielding the user id, token fingerprint or
    /// email.
    #[must_use]
    pub fn subject(self, key: &str) -> &str {
        self.prefix().and_then(|prefix| key.strip_prefix(prefix)).unwrap_or(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_use_prefixes() {
        assert_eq!(blocked_user("u1"), "blocked_user:u1");
        assert_eq!(force_logout("u1"), "force_logout:u1");
        assert_eq!(blacklist("a.b.c"), format!("blacklist:{}", token_fingerprint("a.b.c")));
        assert_eq!(login_attempts("a@b.c"), "login_attempts:a@b.c");
    }

    #[test]
    fn classify_and_strip() {
        assert_eq!(KeyKind::of("blocked_user:u1"), KeyKind::BlockedUser);
        assert_eq!(KeyKind::of("force_logout:u1"), KeyKind::ForceLogout);
        assert_eq!(KeyKind::of("blacklist:tok"), KeyKind::Blacklist);
        assert_eq!(KeyKind::of("login_attempts:a@b.c"), KeyKind::LoginAttempts);
        assert_eq!(KeyKind::of("session:xyz"), KeyKind::Other);
        assert_eq!(KeyKind::of("blocked_user"), KeyKind::Other);

        assert_eq!(KeyKind::BlockedUser.subject("blocked_user:u1"), "u1");
        assert_eq!(KeyKind::Other.subject("session:xyz"), "session:xyz");
    }

    #[test]
    fn fingerprint_is_fixed_length() {
        let short = token_fingerprint("t");
        let long = token_fingerprint(&"x".repeat(8 * 1024));
        assert_eq!(short.len(), 64);
        assert_eq!(long.len(), 64);
        assert_ne!(short, long);
        assert!(short.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()));
    }

    #[test]
    fn fingerprint_of_known_input() {
        assert_eq!(
            token_fingerprint("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn blacklist_key_strips_to_fingerprint() {
        let key = blacklist("header:payload:sig");
        assert_eq!(KeyKind::Blacklist.subject(&key), token_fingerprint("header:payload:sig"));
    }
}
