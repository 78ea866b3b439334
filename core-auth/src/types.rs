use crate::error::{AuthError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Access/refresh token pair for one authenticated subject.
///
/// Replaced wholesale on every refresh. Outside this crate it is only ever
/// read; [`crate::TokenRefreshCoordinator`] is the single writer.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, Utc};
/// use core_auth::Credential;
///
/// let now = Utc::now();
/// let credential = Credential::new("access", "refresh", now + Duration::hours(1), "jane");
///
/// assert!(!credential.is_expired_at(now));
/// assert!(credential.is_expired_at(now + Duration::hours(1)));
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
    pub expiration: DateTime<Utc>,
    pub subject_id: String,
}

impl Credential {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expiration: DateTime<Utc>,
        subject_id: impl Into<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expiration,
            subject_id: subject_id.into(),
        }
    }

    /// Expired once `now` reaches the expiration instant. There is no early
    /// refresh window.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiration
    }

    /// Build the successor of `previous` from a token grant received at `now`.
    ///
    /// Fields the authorization server omitted carry over from `previous`.
    ///
    /// # Errors
    ///
    /// [`AuthError::RefreshFailed`] when `expires_in` puts the expiration
    /// outside the representable date range.
    pub fn from_grant(grant: TokenGrant, previous: &Credential, now: DateTime<Utc>) -> Result<Self> {
        let expiration = Duration::try_seconds(grant.expires_in)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                AuthError::RefreshFailed(format!("invalid expires_in: {}", grant.expires_in))
            })?;

        Ok(Self {
            access_token: grant.access_token,
            refresh_token: grant
                .refresh_token
                .unwrap_or_else(|| previous.refresh_token.clone()),
            expiration,
            subject_id: grant
                .user_name
                .unwrap_or_else(|| previous.subject_id.clone()),
        })
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expiration", &self.expiration)
            .field("subject_id", &self.subject_id)
            .finish()
    }
}

/// Token endpoint response for a `refresh_token` grant.
#[derive(Clone, Deserialize, Serialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Seconds until the new access token expires.
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
    #[serde(
        default,
        rename = "userName",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

fn default_expires_in() -> i64 {
    3600
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_in", &self.expires_in)
            .field("user_name", &self.user_name)
            .finish()
    }
}
