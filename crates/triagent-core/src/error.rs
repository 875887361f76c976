//! Tool lookup, validation and execution errors.
//!
//! Registry and adapter failures propagate to the immediate caller as
//! `ToolError`. Callers at the system boundary convert them into a
//! [`ToolEnvelope`](crate::ToolEnvelope) instead of leaking the error type.

use crate::identifiers::IdValidationError;
use thiserror::Error;

/// Input validation failures raised before a wrapped function runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputValidationError {
    /// A required input key was absent.
    #[error("Expected '{key}' in inputs. Got keys: {present:?}")]
    MissingKey {
        /// The key the tool requires
        key: String,
        /// The keys that were actually supplied
        present: Vec<String>,
    },

    /// The input was present but could not be converted to the tool's argument type.
    #[error("Malformed tool input: {reason}")]
    Malformed { reason: String },
}

/// Errors that can occur during tool operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    /// Tool was not found in the registry.
    #[error("Tool '{name}' not found in registry. Available tools: {}", available_list(.available))]
    NotFound {
        /// The requested tool name
        name: String,
        /// Every tool registered at lookup time
        available: Vec<String>,
    },

    /// Tool input was invalid or malformed.
    #[error("Tool '{tool}' received invalid input: {source}")]
    InvalidInput {
        tool: String,
        #[source]
        source: InputValidationError,
    },

    /// The tool body failed. The original error type is discarded, its message kept.
    #[error("Tool '{tool}' execution failed: {message}")]
    ExecutionFailed { tool: String, message: String },

    /// The tool name does not pass identifier validation.
    #[error("Invalid tool name '{name}': {reason}")]
    InvalidToolName {
        name: String,
        #[source]
        reason: IdValidationError,
    },

    /// The caller cancelled the call before it completed.
    #[error("Tool call cancelled (trace_id={trace_id})")]
    Cancelled { trace_id: String },
}

fn available_list(available: &[String]) -> String {
    if available.is_empty() {
        "none registered".to_string()
    } else {
        format!("{available:?}")
    }
}

impl ToolError {
    /// Create a NotFound error.
    pub fn not_found(name: impl Into<String>, available: Vec<String>) -> Self {
        ToolError::NotFound {
            name: name.into(),
            available,
        }
    }

    /// Create an ExecutionFailed error from any displayable cause.
    pub fn execution_failed(tool: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        ToolError::ExecutionFailed {
            tool: tool.into(),
            message: cause.to_string(),
        }
    }

    /// Create an InvalidInput error.
    pub fn invalid_input(tool: impl Into<String>, source: InputValidationError) -> Self {
        ToolError::InvalidInput {
            tool: tool.into(),
            source,
        }
    }

    /// Get the tool name associated with this error, if any.
    pub fn tool_name(&self) -> Option<&str> {
        match self {
            ToolError::NotFound { name, .. } | ToolError::InvalidToolName { name, .. } => {
                Some(name)
            }
            ToolError::InvalidInput { tool, .. } | ToolError::ExecutionFailed { tool, .. } => {
                Some(tool)
            }
            ToolError::Cancelled { .. } => None,
        }
    }

    /// Rewrite the tool named by an input or execution error.
    ///
    /// Lookup, naming and cancellation errors are returned unchanged.
    pub fn attributed_to(self, name: &str) -> Self {
        match self {
            ToolError::InvalidInput { source, .. } => ToolError::InvalidInput {
                tool: name.to_string(),
                source,
            },
            ToolError::ExecutionFailed { message, .. } => ToolError::ExecutionFailed {
                tool: name.to_string(),
                message,
            },
            other => other,
        }
    }

    /// Whether this error was caused by cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ToolError::Cancelled { .. })
    }

    /// Get the error code suitable for logging or reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            ToolError::NotFound { .. } => "TOOL_NOT_FOUND",
            ToolError::InvalidInput { .. } => "INVALID_INPUT",
            ToolError::ExecutionFailed { .. } => "EXECUTION_FAILED",
            ToolError::InvalidToolName { .. } => "INVALID_TOOL_NAME",
            ToolError::Cancelled { .. } => "CANCELLED",
        }
    }
}

/// Result type alias for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;
