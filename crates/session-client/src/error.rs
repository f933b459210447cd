//! Error types for the authenticated request pipeline
//!
//! Every variant is terminal from the caller's point of view: a recoverable
//! expiry (401 on an ordinary request) never surfaces here unless the refresh
//! and resend could not recover it.

use session_auth::{NETWORK_ERROR_MESSAGE, SESSION_EXPIRED_MESSAGE};

/// Errors surfaced by `SessionClient`.
///
/// `Clone` so a single refresh failure can be handed to every queued request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Refresh credential missing or rejected. The store has been cleared and
    /// the caller must send the user back to the login entry point.
    #[error("session expired")]
    SessionExpired,

    /// 401 that may not trigger a refresh: wrong login, register or refresh
    /// exchange, or a request already resent once after a refresh.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// Any other non-success status.
    #[error("request failed ({status}): {message}")]
    Http {
        status: u16,
        message: String,
        body: String,
    },

    /// No response was received.
    #[error("network error: {0}")]
    Network(String),

    /// Gave up waiting for an in-flight refresh exchange.
    #[error("timed out waiting for session refresh")]
    RefreshTimeout,

    /// Success response whose body did not match the expected shape.
    #[error("invalid response body: {0}")]
    Decode(String),

    /// Credential store write failed.
    #[error("credential storage error: {0}")]
    Storage(String),

    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl ClientError {
    /// HTTP status behind the error, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Unauthorized { .. } => Some(401),
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the caller must treat the session as gone.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, ClientError::SessionExpired)
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::SessionExpired => SESSION_EXPIRED_MESSAGE.to_owned(),
            ClientError::Unauthorized { message } | ClientError::Http { message, .. } => {
                message.clone()
            }
            ClientError::Network(_) => NETWORK_ERROR_MESSAGE.to_owned(),
            ClientError::RefreshTimeout => {
                "Your session could not be renewed in time. Please try again.".to_owned()
            }
            ClientError::Decode(_) | ClientError::Storage(_) | ClientError::Configuration(_) => {
                session_auth::UNEXPECTED_ERROR_MESSAGE.to_owned()
            }
        }
    }
}

impl From<session_auth::Error> for ClientError {
    fn from(err: session_auth::Error) -> Self {
        ClientError::Storage(err.to_string())
    }
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_reported_for_http_variants() {
        assert_eq!(
            ClientError::Unauthorized {
                message: "Invalid credentials".into()
            }
            .status(),
            Some(401)
        );
        let http = ClientError::Http {
            status: 404,
            message: "not found".into(),
            body: String::new(),
        };
        assert_eq!(http.status(), Some(404));
        assert_eq!(ClientError::Network("refused".into()).status(), None);
        assert_eq!(ClientError::SessionExpired.status(), None);
    }

    #[test]
    fn user_messages_hide_internal_causes() {
        assert_eq!(
            ClientError::SessionExpired.user_message(),
            "Session expired. Please log in again."
        );
        assert_eq!(
            ClientError::Network("dns error: no such host".into()).user_message(),
            "Network error. Please check your connection."
        );
        assert_eq!(
            ClientError::Decode("missing field `uid`".into()).user_message(),
            "An unexpected error occurred."
        );
    }

    #[test]
    fn storage_errors_convert() {
        let err: ClientError = session_auth::Error::Io("disk full".into()).into();
        assert!(matches!(err, ClientError::Storage(ref m) if m.contains("disk full")));
    }

    #[test]
    fn only_session_expired_is_session_expired() {
        assert!(ClientError::SessionExpired.is_session_expired());
        assert!(!ClientError::RefreshTimeout.is_session_expired());
    }
}
