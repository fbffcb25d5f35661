use thiserror::Error;

/// Client-side operation errors.
///
/// Auth failures are their own kinds rather than message text so that the
/// blob transfer loop can dispatch its abort-vs-continue decision on the
/// error kind.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// Authentication failed
    #[error("authentication failed: {message}")]
    Auth { message: String },
    /// Session expired
    #[error("session expired")]
    SessionExpired,
    /// Network error
    #[error("network error: {message}")]
    Network { message: String },
    /// Serialization error
    #[error("serialization error: {message}")]
    Serialization { message: String },
    /// PDS operation failed
    #[error("PDS operation '{operation}' failed: {message}")]
    PdsOperation { operation: String, message: String },
    /// Invalid response format
    #[error("invalid response: expected {expected}, got {got}")]
    InvalidResponse { expected: String, got: String },
}

impl ClientError {
    /// True when the session behind the call is no longer usable and
    /// further calls on it would fail the same way.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            ClientError::Auth { .. } | ClientError::SessionExpired
        )
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_classification() {
        assert!(ClientError::Auth {
            message: "bad token".into()
        }
        .is_auth());
        assert!(ClientError::SessionExpired.is_auth());
        assert!(!ClientError::Network {
            message: "connection reset".into()
        }
        .is_auth());
        assert!(!ClientError::PdsOperation {
            operation: "listBlobs".into(),
            message: "rate limited".into()
        }
        .is_auth());
    }
}
