//! Typed views of the structured outputs produced by the chains.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use triagent_core::ToolOutput;

/// Why an incident got its label, in prose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explanation {
    pub explanation: String,
    #[serde(default)]
    pub reasons: Vec<String>,
}

impl Explanation {
    pub fn into_output(self) -> ToolOutput {
        let mut output = Map::new();
        output.insert("explanation".into(), Value::String(self.explanation));
        output.insert(
            "reasons".into(),
            Value::Array(self.reasons.into_iter().map(Value::String).collect()),
        );
        output
    }
}

/// Risk of carrying out a runbook step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Risk {
    Low,
    Medium,
    High,
}

impl Risk {
    pub fn as_str(&self) -> &'static str {
        match self {
            Risk::Low => "low",
            Risk::Medium => "medium",
            Risk::High => "high",
        }
    }
}

impl fmt::Display for Risk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunbookStep {
    pub step: String,
    pub why: String,
    pub risk: Risk,
}

impl RunbookStep {
    pub fn new(step: impl Into<String>, why: impl Into<String>, risk: Risk) -> Self {
        Self {
            step: step.into(),
            why: why.into(),
            risk,
        }
    }

    fn into_value(self) -> Value {
        let mut step = Map::new();
        step.insert("step".into(), Value::String(self.step));
        step.insert("why".into(), Value::String(self.why));
        step.insert("risk".into(), Value::String(self.risk.as_str().into()));
        Value::Object(step)
    }
}

/// Source tag for generated runbooks.
pub const SOURCE_RAG: &str = "rag";
/// Source tag for stub runbooks.
pub const SOURCE_STUB: &str = "stub";

/// Ordered response steps plus where they came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Runbook {
    pub runbook: Vec<RunbookStep>,
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_source() -> String {
    SOURCE_RAG.to_string()
}

impl Runbook {
    pub fn len(&self) -> usize {
        self.runbook.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runbook.is_empty()
    }

    pub fn is_stub(&self) -> bool {
        self.source == SOURCE_STUB
    }

    pub fn into_output(self) -> ToolOutput {
        let mut output = Map::new();
        output.insert(
            "runbook".into(),
            Value::Array(self.runbook.into_iter().map(RunbookStep::into_value).collect()),
        );
        output.insert("source".into(), Value::String(self.source));
        output
    }
}
