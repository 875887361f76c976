//! The default incident-triage tool set.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::info;
use triagent_core::{
    ContributingFactor, InputValidationError, SeverityLabel, ToolContext, ToolError, ToolInputs,
    ToolOutput, ToolResult,
};
use triagent_llm::{InvocationEngine, ReferenceRunbook, explain_incident, generate_runbook};

use crate::fn_tool::tool_fn;
use crate::registry::ToolRegistry;
use crate::sync_adapter::{BlockingPool, wrap_sync};

pub const TRIAGE: &str = "triage";
pub const EXPLAIN: &str = "explain";
pub const RUNBOOK: &str = "runbook";

/// What the scoring function returns: `(label, score, contributing factors)`.
pub type Score = (SeverityLabel, f64, Vec<ContributingFactor>);

/// Triage result as passed to `explain`.
#[derive(Debug, Deserialize)]
struct TriageResult {
    #[serde(default = "unknown_label")]
    label: SeverityLabel,
    #[serde(default)]
    score: f64,
    #[serde(default)]
    contribs: Vec<ContributingFactor>,
}

impl Default for TriageResult {
    fn default() -> Self {
        Self {
            label: unknown_label(),
            score: 0.0,
            contribs: Vec::new(),
        }
    }
}

fn unknown_label() -> SeverityLabel {
    SeverityLabel::Unknown("UNKNOWN".to_string())
}

#[derive(Debug, Deserialize)]
struct ExplainInputs {
    #[serde(default)]
    features: Map<String, Value>,
    #[serde(default)]
    triage_result: TriageResult,
}

#[derive(Debug, Deserialize)]
struct RunbookInputs {
    #[serde(default)]
    features: Map<String, Value>,
    #[serde(default = "medium_label")]
    severity: SeverityLabel,
    #[serde(default)]
    score: f64,
    #[serde(default)]
    contribs: Vec<ContributingFactor>,
    #[serde(default)]
    references: Vec<ReferenceRunbook>,
}

fn medium_label() -> SeverityLabel {
    SeverityLabel::Medium
}

fn parse_inputs<T: for<'de> Deserialize<'de>>(tool: &str, inputs: ToolInputs) -> ToolResult<T> {
    serde_json::from_value(Value::Object(inputs)).map_err(|e| {
        ToolError::invalid_input(
            tool,
            InputValidationError::Malformed {
                reason: e.to_string(),
            },
        )
    })
}

/// Register `triage`, `explain` and `runbook`.
///
/// `triage` wraps the injected blocking `scorer` and receives
/// `inputs["features"]`. `explain` and `runbook` go through `engine`, so they
/// degrade to stub output when no LLM is reachable.
pub fn register_default_tools<S, E>(
    registry: &mut ToolRegistry,
    engine: Arc<InvocationEngine>,
    scorer: S,
    pool: BlockingPool,
) -> ToolResult<()>
where
    S: Fn(Map<String, Value>) -> Result<Score, E> + Send + Sync + 'static,
    E: fmt::Display + Send + 'static,
{
    info!("Registering default tools");

    let triage = wrap_sync(scorer)
        .input_key("features")
        .name(TRIAGE)
        .with_description("Score incident severity from a feature map")
        .pool(pool);
    registry.register_strict(TRIAGE, Arc::new(triage))?;

    let explain_engine = Arc::clone(&engine);
    let explain = tool_fn(move |inputs: ToolInputs, context: ToolContext| {
        let engine = Arc::clone(&explain_engine);
        async move { explain_tool(&engine, inputs, &context).await }
    })
    .with_description("Explain a triage result");
    registry.register_strict(EXPLAIN, Arc::new(explain))?;

    let runbook = tool_fn(move |inputs: ToolInputs, context: ToolContext| {
        let engine = Arc::clone(&engine);
        async move { runbook_tool(&engine, inputs, &context).await }
    })
    .with_description("Generate incident response steps");
    registry.register_strict(RUNBOOK, Arc::new(runbook))?;

    info!(count = registry.len(), tools = ?registry.list(), "Registered default tools");
    Ok(())
}

async fn explain_tool(
    engine: &InvocationEngine,
    inputs: ToolInputs,
    context: &ToolContext,
) -> ToolResult<ToolOutput> {
    let inputs: ExplainInputs = parse_inputs(EXPLAIN, inputs)?;
    let triage = inputs.triage_result;

    let explanation = explain_incident(
        engine,
        context,
        &inputs.features,
        &triage.label,
        triage.score,
        &triage.contribs,
    )
    .await?;

    let mut output = ToolOutput::new();
    output.insert(
        "explanation".into(),
        Value::Object(explanation.into_output()),
    );
    Ok(output)
}

async fn runbook_tool(
    engine: &InvocationEngine,
    inputs: ToolInputs,
    context: &ToolContext,
) -> ToolResult<ToolOutput> {
    let inputs: RunbookInputs = parse_inputs(RUNBOOK, inputs)?;

    let runbook = generate_runbook(
        engine,
        context,
        &inputs.features,
        &inputs.severity,
        inputs.score,
        &inputs.contribs,
        &inputs.references,
    )
    .await?;

    Ok(runbook.into_output())
}
