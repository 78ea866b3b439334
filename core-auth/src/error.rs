use thiserror::Error;

/// Errors from the credential lifecycle.
///
/// `Clone` so one refresh outcome can be handed to every caller that waited
/// on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The refresh exchange was rejected or never reached the authorization
    /// server. The stored credential is stale; the holder must log in again.
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Credential persistence failed: {0}")]
    Persistence(String),

    #[error("Invalid OAuth configuration: {0}")]
    Config(String),
}

impl AuthError {
    /// True when the only way forward is a fresh login.
    pub fn requires_login(&self) -> bool {
        matches!(self, AuthError::RefreshFailed(_))
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
