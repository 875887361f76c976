//! Named JSON Schemas for structured model output.
//!
//! An [`OutputSchema`] pairs a stable name (used in the request envelope and
//! in corrective re-prompts) with a compiled JSON Schema validator.

use jsonschema::JSONSchema;
use serde_json::{Value, json};
use std::fmt;
use std::sync::{Arc, LazyLock};

use crate::error::{OutputError, SchemaError};

/// Schema name for explanation output.
pub const TRIAGE_EXPLANATION: &str = "triage_explanation";
/// Schema name for runbook output.
pub const RUNBOOK_RESPONSE: &str = "runbook_response";

/// A compiled, named output schema. Cheap to clone.
#[derive(Clone)]
pub struct OutputSchema {
    inner: Arc<SchemaInner>,
}

struct SchemaInner {
    name: String,
    document: Value,
    compiled: JSONSchema,
}

impl OutputSchema {
    /// Compile a schema document.
    pub fn new(name: impl Into<String>, document: Value) -> Result<Self, SchemaError> {
        let name = name.into();
        let compiled = JSONSchema::compile(&document).map_err(|e| SchemaError {
            name: name.clone(),
            message: e.to_string(),
        })?;

        Ok(Self {
            inner: Arc::new(SchemaInner {
                name,
                document,
                compiled,
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn document(&self) -> &Value {
        &self.inner.document
    }

    /// Validate an instance, collecting every violation.
    pub fn validate(&self, instance: &Value) -> Result<(), OutputError> {
        self.inner.compiled.validate(instance).map_err(|errors| {
            let errors = errors
                .map(|e| {
                    let path = e.instance_path.to_string();
                    if path.is_empty() {
                        e.to_string()
                    } else {
                        format!("{path}: {e}")
                    }
                })
                .collect();
            OutputError::Schema {
                schema: self.inner.name.clone(),
                errors,
            }
        })
    }

    pub fn is_valid(&self, instance: &Value) -> bool {
        self.inner.compiled.is_valid(instance)
    }
}

impl fmt::Debug for OutputSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputSchema")
            .field("name", &self.inner.name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for OutputSchema {
    fn eq(&self, other: &Self) -> bool {
        self.inner.name == other.inner.name && self.inner.document == other.inner.document
    }
}

static TRIAGE_EXPLANATION_SCHEMA: LazyLock<OutputSchema> = LazyLock::new(|| {
    OutputSchema::new(
        TRIAGE_EXPLANATION,
        json!({
            "type": "object",
            "required": ["explanation", "reasons"],
            "properties": {
                "explanation": {"type": "string", "minLength": 1},
                "reasons": {
                    "type": "array",
                    "items": {"type": "string"}
                }
            }
        }),
    )
    .expect("built-in explanation schema compiles")
});

static RUNBOOK_RESPONSE_SCHEMA: LazyLock<OutputSchema> = LazyLock::new(|| {
    OutputSchema::new(
        RUNBOOK_RESPONSE,
        json!({
            "type": "object",
            "required": ["runbook"],
            "properties": {
                "runbook": {
                    "type": "array",
                    "minItems": 1,
                    "items": {
                        "type": "object",
                        "required": ["step", "why", "risk"],
                        "properties": {
                            "step": {"type": "string", "minLength": 1},
                            "why": {"type": "string"},
                            "risk": {"enum": ["low", "medium", "high"]}
                        }
                    }
                },
                "source": {"type": "string"}
            }
        }),
    )
    .expect("built-in runbook schema compiles")
});

/// Schema for `{explanation, reasons}` output.
pub fn triage_explanation() -> OutputSchema {
    TRIAGE_EXPLANATION_SCHEMA.clone()
}

/// Schema for `{runbook: [{step, why, risk}], source}` output.
pub fn runbook_response() -> OutputSchema {
    RUNBOOK_RESPONSE_SCHEMA.clone()
}
