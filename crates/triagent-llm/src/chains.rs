//! Explanation and runbook generation on top of the engine.
//!
//! Each chain builds its prompts from the triage result, asks the engine for
//! schema-checked output, and falls back to the matching stub.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;
use triagent_core::{ContributingFactor, SeverityLabel, ToolContext};

use crate::engine::{InvocationEngine, InvocationRequest};
use crate::error::InvocationResult;
use crate::response::{Explanation, Runbook};
use crate::schema::{runbook_response, triage_explanation};
use crate::stub::{StubRequest, stub_explanation, stub_runbook};

const EXPLAIN_FEATURE_LIMIT: usize = 10;
const RUNBOOK_FEATURE_LIMIT: usize = 8;
const RUNBOOK_FACTOR_LIMIT: usize = 5;
const REFERENCE_LIMIT: usize = 3;
const REFERENCE_CHARS: usize = 500;

const EXPLANATION_SYSTEM_PROMPT: &str = r#"You are a security analyst AI assistant. Your task is to explain
security incident triage decisions in clear, professional language.

Always respond with valid JSON in this exact format:
{
    "explanation": "A clear 2-3 sentence explanation of why this incident was classified this way",
    "reasons": ["First specific reason", "Second specific reason"]
}

Do not include any text outside the JSON object."#;

const RUNBOOK_SYSTEM_PROMPT: &str = r#"You are a security incident response expert. Generate a structured
runbook with specific, actionable steps to respond to the incident.

Always respond with valid JSON in this exact format:
{
    "runbook": [
        {
            "step": "Specific action to take",
            "why": "Reason this step is necessary",
            "risk": "low|medium|high"
        }
    ],
    "source": "rag"
}

Each step should be:
- Specific and actionable
- Include commands or tools when relevant
- Marked with appropriate risk level

Generate 3-7 steps appropriate for the severity level.
Do not include any text outside the JSON object."#;

/// A previously written runbook retrieved as context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRunbook {
    pub text: String,
    /// Similarity to the current incident.
    #[serde(default)]
    pub score: f64,
}

/// Explain why an incident received its label.
pub async fn explain_incident(
    engine: &InvocationEngine,
    context: &ToolContext,
    features: &Map<String, Value>,
    label: &SeverityLabel,
    score: f64,
    factors: &[ContributingFactor],
) -> InvocationResult<Explanation> {
    let factor_text = factors
        .iter()
        .map(|f| format!("- {}: +{} points", f.feature, f.weight))
        .collect::<Vec<_>>()
        .join("\n");

    let prompt = format!(
        "Explain why this security incident was classified as {label} severity.\n\n\
         Incident Features:\n{features}\n\n\
         Triage Score: {score}\n\n\
         Contributing Factors:\n{factor_text}\n\n\
         Provide a clear explanation and two specific reasons for this classification.",
        features = feature_lines(features, EXPLAIN_FEATURE_LIMIT),
    );

    let request = InvocationRequest::new(prompt)
        .with_system_prompt(EXPLANATION_SYSTEM_PROMPT)
        .with_schema(triage_explanation())
        .with_stub(StubRequest::Explanation {
            label: label.clone(),
            score,
            factors: factors.to_vec(),
        });

    let invocation = engine.invoke(&request, context).await?;
    match serde_json::from_value(Value::Object(invocation.output)) {
        Ok(explanation) => Ok(explanation),
        Err(error) => {
            warn!(error = %error, "Explanation output did not deserialize, using stub");
            Ok(stub_explanation(label, score, factors))
        }
    }
}

/// Generate response steps, using reference runbooks as context.
pub async fn generate_runbook(
    engine: &InvocationEngine,
    context: &ToolContext,
    features: &Map<String, Value>,
    label: &SeverityLabel,
    score: f64,
    factors: &[ContributingFactor],
    references: &[ReferenceRunbook],
) -> InvocationResult<Runbook> {
    let indicators = factors
        .iter()
        .take(RUNBOOK_FACTOR_LIMIT)
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");

    let prompt = format!(
        "Generate a security incident response runbook.\n\n\
         Incident Severity: {label}\n\
         Triage Score: {score}\n\n\
         Key Indicators:\n{indicators}\n\n\
         Incident Details:\n{features}\n{references}\n\n\
         Generate appropriate response steps for this {label} severity incident.",
        features = feature_lines(features, RUNBOOK_FEATURE_LIMIT),
        references = reference_context(references),
    );

    let request = InvocationRequest::new(prompt)
        .with_system_prompt(RUNBOOK_SYSTEM_PROMPT)
        .with_schema(runbook_response())
        .with_stub(StubRequest::Runbook {
            label: label.clone(),
            factors: factors.to_vec(),
        });

    let invocation = engine.invoke(&request, context).await?;
    match serde_json::from_value(Value::Object(invocation.output)) {
        Ok(runbook) => Ok(runbook),
        Err(error) => {
            warn!(error = %error, "Runbook output did not deserialize, using stub");
            Ok(stub_runbook(label, factors))
        }
    }
}

fn feature_lines(features: &Map<String, Value>, limit: usize) -> String {
    features
        .iter()
        .take(limit)
        .map(|(key, value)| match value {
            Value::String(s) => format!("- {key}: {s}"),
            other => format!("- {key}: {other}"),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn reference_context(references: &[ReferenceRunbook]) -> String {
    if references.is_empty() {
        return String::new();
    }

    let mut text = String::from("\n\nRelevant Reference Runbooks:\n");
    for (i, reference) in references.iter().take(REFERENCE_LIMIT).enumerate() {
        text.push_str(&format!(
            "\n--- Reference {} (similarity: {:.2}) ---\n",
            i + 1,
            reference.score
        ));
        text.extend(reference.text.chars().take(REFERENCE_CHARS));
    }
    text
}
