//! Error types for the Stepwise domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.

use thiserror::Error;

// --- Bounded context errors ---

/// Failures of the model transport. Any of these ends the current loop.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

/// Tool-boundary errors.
///
/// Execution faults never surface here: tools turn them into result strings.
/// Only a lookup miss is reported as an error, so the loop can correct the model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),
}

/// A model reply that could not be decoded as a Step Envelope.
///
/// Always recoverable: the loop feeds a correction back to the model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    #[error("reply was empty after removing code fences")]
    Empty,

    #[error("reply is not valid JSON: {0}")]
    Malformed(String),

    #[error("reply is JSON but not an object (found {0})")]
    NotAnObject(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = ProviderError::ApiError {
            status_code: 529,
            message: "Overloaded".into(),
        };
        assert!(err.to_string().contains("529"));
        assert!(err.to_string().contains("Overloaded"));
    }

    #[test]
    fn tool_error_displays_correctly() {
        let err = ToolError::NotFound("delete_everything".into());
        assert!(err.to_string().contains("delete_everything"));
    }

    #[test]
    fn envelope_error_names_the_json_kind() {
        let err = EnvelopeError::NotAnObject("array");
        assert!(err.to_string().contains("array"));
    }
}
