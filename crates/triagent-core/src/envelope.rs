//! Boundary response envelope.
//!
//! Callers outside the core never see `ToolError` directly; they receive either
//! `{"status": "success", ...fields}` or `{"status": "error", "message": "..."}`.

use serde::{Deserialize, Serialize};

use crate::error::ToolResult;
use crate::tool::ToolOutput;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolEnvelope {
    /// Successful result; the output fields are flattened next to `status`.
    Success(ToolOutput),
    /// Tool-level failure with a diagnostic message.
    Error { message: String },
}

impl ToolEnvelope {
    /// Convert a tool result into an envelope.
    pub fn from_result(result: ToolResult<ToolOutput>) -> Self {
        match result {
            Ok(output) => ToolEnvelope::Success(output),
            Err(error) => {
                tracing::debug!(code = error.error_code(), error = %error, "Tool call failed");
                ToolEnvelope::Error {
                    message: error.to_string(),
                }
            }
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ToolEnvelope::Error {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolEnvelope::Success(_))
    }

    /// Render the envelope as a JSON value.
    pub fn to_value(&self) -> serde_json::Value {
        // A map-backed enum always serializes; fall back to a bare error object regardless.
        serde_json::to_value(self).unwrap_or_else(|e| {
            serde_json::json!({"status": "error", "message": e.to_string()})
        })
    }
}

impl From<ToolResult<ToolOutput>> for ToolEnvelope {
    fn from(result: ToolResult<ToolOutput>) -> Self {
        Self::from_result(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;
    use serde_json::json;

    #[test]
    fn success_flattens_output_fields() {
        let output = json!({"label": "HIGH", "score": 8}).as_object().cloned().unwrap();
        let envelope = ToolEnvelope::from_result(Ok(output));

        assert!(envelope.is_success());
        assert_eq!(
            envelope.to_value(),
            json!({"status": "success", "label": "HIGH", "score": 8})
        );
    }

    #[test]
    fn errors_carry_message_only() {
        let envelope =
            ToolEnvelope::from_result(Err(ToolError::not_found("nope", vec!["triage".into()])));

        let value = envelope.to_value();
        assert_eq!(value["status"], "error");
        assert!(value["message"].as_str().unwrap().contains("'nope' not found"));
        assert_eq!(value.as_object().unwrap().len(), 2);
    }

    #[test]
    fn deserializes_both_variants() {
        let ok: ToolEnvelope =
            serde_json::from_value(json!({"status": "success", "steps": 3})).unwrap();
        assert_eq!(
            ok,
            ToolEnvelope::Success(json!({"steps": 3}).as_object().cloned().unwrap())
        );

        let err: ToolEnvelope =
            serde_json::from_value(json!({"status": "error", "message": "boom"})).unwrap();
        assert_eq!(err, ToolEnvelope::error("boom"));
    }
}
