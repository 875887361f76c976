//! Error types for LLM invocation.
//!
//! Three families, handled at three different places:
//!
//! - [`OutputError`]: the backend answered but the answer is unusable. Retried
//!   in place with a corrective re-prompt.
//! - [`BackendError`]: the backend itself could not be used. Never retried in
//!   place; the engine moves to the next backend.
//! - [`InvocationError`]: what the engine surfaces to its caller. Only
//!   cancellation escapes, since the stub always produces a result.

use thiserror::Error;
use triagent_core::ToolError;

/// Failures of the backend integration itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The integration is not installed, not configured, or refused credentials.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Network failure, timeout, or a non-success response.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The provider is throttling or the quota is exhausted.
    #[error("Rate limited: {0}")]
    RateLimited(String),
}

impl BackendError {
    /// Get the error code suitable for logging or reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            BackendError::Unavailable(_) => "BACKEND_UNAVAILABLE",
            BackendError::Transport(_) => "TRANSPORT_ERROR",
            BackendError::RateLimited(_) => "RATE_LIMITED",
        }
    }
}

/// Unusable model output. Always retryable against the same backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutputError {
    /// The response was not valid JSON.
    #[error("response is not valid JSON: {0}")]
    Parse(String),

    /// The JSON did not satisfy the expected schema.
    #[error("response does not match schema '{schema}': {}", .errors.join("; "))]
    Schema { schema: String, errors: Vec<String> },
}

impl OutputError {
    pub fn error_code(&self) -> &'static str {
        match self {
            OutputError::Parse(_) => "PARSE_ERROR",
            OutputError::Schema { .. } => "SCHEMA_VALIDATION_ERROR",
        }
    }
}

/// Errors surfaced by [`InvocationEngine::invoke`](crate::InvocationEngine::invoke).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvocationError {
    #[error("LLM invocation cancelled (trace_id={trace_id})")]
    Cancelled { trace_id: String },
}

impl From<InvocationError> for ToolError {
    fn from(error: InvocationError) -> Self {
        match error {
            InvocationError::Cancelled { trace_id } => ToolError::Cancelled { trace_id },
        }
    }
}

/// Result type for engine operations.
pub type InvocationResult<T> = Result<T, InvocationError>;

/// A schema document that does not compile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid output schema '{name}': {message}")]
pub struct SchemaError {
    pub name: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_lists_every_violation() {
        let error = OutputError::Schema {
            schema: "runbook_response".into(),
            errors: vec!["/runbook: missing".into(), "/source: not a string".into()],
        };

        let message = error.to_string();
        assert!(message.contains("'runbook_response'"));
        assert!(message.contains("/runbook: missing; /source: not a string"));
        assert_eq!(error.error_code(), "SCHEMA_VALIDATION_ERROR");
    }

    #[test]
    fn cancellation_maps_onto_tool_error() {
        let error: ToolError = InvocationError::Cancelled {
            trace_id: "t-9".into(),
        }
        .into();
        assert_eq!(
            error,
            ToolError::Cancelled {
                trace_id: "t-9".into()
            }
        );
    }

    #[test]
    fn backend_error_codes() {
        assert_eq!(
            BackendError::RateLimited("429".into()).error_code(),
            "RATE_LIMITED"
        );
        assert_eq!(
            BackendError::Unavailable("no key".into()).to_string(),
            "Backend unavailable: no key"
        );
    }
}
