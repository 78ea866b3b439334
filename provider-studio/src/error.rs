//! Error types for the Studio API client

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Failures of a single remote call.
///
/// Nothing here is retried by the client; the variant tells the caller
/// whether a response was ever received.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StudioError {
    /// No response: DNS, connect, TLS or timeout failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The API or blob storage answered with a 4xx/5xx.
    #[error("Studio API error (status {status_code}): {body}")]
    Remote { status_code: u16, body: String },

    /// A 2xx response whose body did not match the expected shape.
    #[error("Failed to parse API response: {0}")]
    InvalidResponse(String),

    /// The request could not be built (serialization, malformed URL).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl StudioError {
    pub fn is_transport(&self) -> bool {
        matches!(self, StudioError::Transport(_))
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            StudioError::Remote { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

impl From<BridgeError> for StudioError {
    fn from(error: BridgeError) -> Self {
        match error {
            BridgeError::Transport(msg) => StudioError::Transport(msg),
            BridgeError::Io(e) => StudioError::Transport(e.to_string()),
            BridgeError::NotAvailable(msg) => StudioError::Transport(msg),
            BridgeError::OperationFailed(msg) => StudioError::InvalidRequest(msg),
        }
    }
}

/// Result type for Studio API operations
pub type Result<T> = std::result::Result<T, StudioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = StudioError::Remote {
            status_code: 404,
            body: "Session not found".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Studio API error (status 404): Session not found"
        );
        assert_eq!(error.status_code(), Some(404));
    }

    #[test]
    fn test_bridge_transport_maps_to_transport() {
        let error: StudioError = BridgeError::Transport("connection refused".to_string()).into();
        assert!(error.is_transport());

        let error: StudioError = BridgeError::OperationFailed("bad url".to_string()).into();
        assert!(matches!(error, StudioError::InvalidRequest(_)));
    }
}
