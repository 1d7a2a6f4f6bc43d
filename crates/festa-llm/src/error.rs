//! Error types for inference providers

use thiserror::Error;

/// Errors that can occur during an inference call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    /// The caller's cancel token fired while the call was in flight
    #[error("Request aborted by user")]
    Aborted,

    /// Service unreachable, timed out, rate limited, or 5xx
    #[error("Transient network error: {0}")]
    Transient(String),

    /// Missing or rejected API key, or a request the service refuses as configured
    #[error("Service configuration error: {0}")]
    Configuration(String),

    /// The service answered with something that could not be parsed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl InferenceError {
    /// Whether retrying the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            InferenceError::Transient(_) | InferenceError::InvalidResponse(_)
        )
    }

    /// Whether this is a user abort rather than a failure
    pub fn is_aborted(&self) -> bool {
        matches!(self, InferenceError::Aborted)
    }
}

impl From<serde_json::Error> for InferenceError {
    fn from(e: serde_json::Error) -> Self {
        InferenceError::InvalidResponse(format!("JSON parse error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(InferenceError::Transient("timeout".into()).is_retryable());
        assert!(InferenceError::InvalidResponse("bad json".into()).is_retryable());
        assert!(!InferenceError::Configuration("API key".into()).is_retryable());
        assert!(!InferenceError::Aborted.is_retryable());
        assert!(InferenceError::Aborted.is_aborted());
    }

    #[test]
    fn test_messages_are_verbatim() {
        let err = InferenceError::Transient("HTTP 503: overloaded".into());
        assert_eq!(err.to_string(), "Transient network error: HTTP 503: overloaded");
    }
}
