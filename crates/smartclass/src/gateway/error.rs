//! Error types for calls to the timetable service.

use thiserror::Error;

/// Which part of the failure taxonomy an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Service unreachable, timed out, or replied with something unusable.
    /// Prior view state stays in place.
    Network,
    /// The service refused the request and said why. Not retried.
    Validation,
}

/// Errors that can occur while talking to the timetable service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Network/HTTP request failed before a response arrived
    #[error("Network error: {message}")]
    Network { message: String },

    /// Non-2xx response without a usable reason
    #[error("Service returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// The service rejected the request; `reason` is its own wording
    #[error("{reason}")]
    Rejected { reason: String },

    /// The requested record does not exist (or nothing matched)
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// Response body did not match the expected shape
    #[error("Could not decode response: {message}")]
    Decode { message: String },

    /// Endpoint URL could not be built
    #[error("URL error: {message}")]
    Url { message: String },
}

impl GatewayError {
    pub fn kind(&self) -> FailureKind {
        match self {
            GatewayError::Rejected { .. } => FailureKind::Validation,
            _ => FailureKind::Network,
        }
    }

    /// Returns true if this error is potentially transient and retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Network { .. } => true,
            GatewayError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::Decode {
                message: err.to_string(),
            }
        } else {
            GatewayError::Network {
                message: err.to_string(),
            }
        }
    }
}

impl From<url::ParseError> for GatewayError {
    fn from(err: url::ParseError) -> Self {
        GatewayError::Url {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Decode {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_displays_reason_verbatim() {
        let err = GatewayError::Rejected {
            reason: "faculty not assigned to subjects".to_string(),
        };
        assert_eq!(err.to_string(), "faculty not assigned to subjects");
        assert_eq!(err.kind(), FailureKind::Validation);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_transient_errors_are_retryable() {
        let network = GatewayError::Network {
            message: "connection refused".to_string(),
        };
        let server = GatewayError::Status {
            status: 503,
            message: "unavailable".to_string(),
        };
        let client = GatewayError::Status {
            status: 409,
            message: "conflict".to_string(),
        };
        assert!(network.is_retryable());
        assert!(server.is_retryable());
        assert!(!client.is_retryable());
        assert_eq!(client.kind(), FailureKind::Network);
    }

    #[test]
    fn test_json_errors_become_decode_errors() {
        let err: GatewayError = serde_json::from_str::<Vec<u8>>("{").unwrap_err().into();
        assert!(matches!(err, GatewayError::Decode { .. }));
    }
}
