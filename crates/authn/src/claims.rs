//! Decoded session token payloads.
//!
//! Signature verification happens upstream; by the time a payload reaches
//! this crate it is trusted to be authentic and unexpired. The registry only
//! needs to know whose session it is and when the token dies on its own.

use serde::{Deserialize, Serialize};

/// A decoded token payload the access checks can reason about.
pub trait Principal {
    /// The user id the token was issued to.
    fn subject(&self) -> &str;

    /// The token's own expiry as Unix seconds.
    fn expires_at(&self) -> i64;
}

/// Role summary embedded in a session token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleClaims {
    /// Role identifier.
    pub name: String,
    /// Human-readable role name.
    #[serde(default)]
    pub display_name: String,
    /// Permission strings granted by the role.
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Claims carried by a session token.
///
/// ```
/// use credgate_authn::{Principal, SessionClaims};
///
/// let claims: SessionClaims = serde_json::from_str(
///     r#"{ "userId": "u1", "email": "a@b.c", "iat": 1700000000, "exp": 1700086400 }"#,
/// )?;
/// assert_eq!(claims.subject(), "u1");
/// assert_eq!(claims.expires_at(), 1_700_086_400);
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    /// User id (subject).
    pub user_id: String,
    /// Login email.
    pub email: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Role id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<String>,
    /// Role summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<RoleClaims>,
    /// Issued-at, Unix seconds.
    pub iat: i64,
    /// Expiry, Unix seconds.
    pub exp: i64,
}

impl Principal for SessionClaims {
    fn subject(&self) -> &str {
        &self.user_id
    }

    fn expires_at(&self) -> i64 {
        self.exp
    }
}

impl<P: Principal + ?Sized> Principal for &P {
    fn subject(&self) -> &str {
        (**self).subject()
    }

    fn expires_at(&self) -> i64 {
        (**self).expires_at()
    }
}
