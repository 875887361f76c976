//! Deterministic offline output.
//!
//! Used when the LLM subsystem is switched off and as the terminal fallback
//! once every backend is exhausted. Nothing here performs I/O or can fail.

use triagent_core::{ContributingFactor, SeverityLabel, ToolOutput};

use crate::response::{Explanation, Risk, Runbook, RunbookStep, SOURCE_STUB};
use crate::schema::{self, OutputSchema};

/// How many factors the stub explanation lists.
const TOP_FACTORS: usize = 3;

/// What to produce when no backend answers.
#[derive(Debug, Clone, PartialEq)]
pub enum StubRequest {
    Explanation {
        label: SeverityLabel,
        score: f64,
        factors: Vec<ContributingFactor>,
    },
    Runbook {
        label: SeverityLabel,
        factors: Vec<ContributingFactor>,
    },
    /// A fixed map returned as-is.
    Fixed(ToolOutput),
}

impl Default for StubRequest {
    fn default() -> Self {
        StubRequest::Fixed(ToolOutput::new())
    }
}

impl StubRequest {
    /// The stub matching a built-in schema, used when a request names that
    /// schema but sets no stub of its own.
    pub fn for_schema(output_schema: &OutputSchema) -> Option<Self> {
        if *output_schema == schema::triage_explanation() {
            Some(StubRequest::Explanation {
                label: unknown_label(),
                score: 0.0,
                factors: Vec::new(),
            })
        } else if *output_schema == schema::runbook_response() {
            Some(StubRequest::Runbook {
                label: unknown_label(),
                factors: Vec::new(),
            })
        } else {
            None
        }
    }

    pub fn render(&self) -> ToolOutput {
        match self {
            StubRequest::Explanation {
                label,
                score,
                factors,
            } => stub_explanation(label, *score, factors).into_output(),
            StubRequest::Runbook { label, factors } => stub_runbook(label, factors).into_output(),
            StubRequest::Fixed(output) => output.clone(),
        }
    }
}

/// Explanation built only from the triage result.
pub fn stub_explanation(
    label: &SeverityLabel,
    score: f64,
    factors: &[ContributingFactor],
) -> Explanation {
    let top = factors
        .iter()
        .take(TOP_FACTORS)
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    let top = if top.is_empty() {
        "none".to_string()
    } else {
        top.join(", ")
    };

    let primary = factors
        .first()
        .map(|f| f.feature.as_str())
        .unwrap_or("general anomaly");

    Explanation {
        explanation: format!(
            "This incident was classified as {label} severity with a score of {score}. \
             Key contributing factors: {top}."
        ),
        reasons: vec![
            format!("Primary indicator: {primary}"),
            format!("Cumulative risk score of {score} exceeds threshold for {label} classification"),
        ],
    }
}

/// Fixed runbook keyed by severity.
///
/// HIGH and MEDIUM have dedicated templates; every other label gets the
/// two-step default. Factors do not affect the steps.
pub fn stub_runbook(label: &SeverityLabel, _factors: &[ContributingFactor]) -> Runbook {
    let runbook = match label {
        SeverityLabel::High => high_steps(),
        SeverityLabel::Medium => medium_steps(),
        _ => default_steps(),
    };

    Runbook {
        runbook,
        source: SOURCE_STUB.to_string(),
    }
}

fn high_steps() -> Vec<RunbookStep> {
    vec![
        RunbookStep::new(
            "Immediately isolate affected host from network",
            "Prevent lateral movement and further compromise",
            Risk::Medium,
        ),
        RunbookStep::new(
            "Capture memory dump and disk image for forensics",
            "Preserve evidence before any remediation",
            Risk::Low,
        ),
        RunbookStep::new(
            "Reset credentials for affected accounts",
            "Prevent unauthorized access using compromised credentials",
            Risk::Medium,
        ),
        RunbookStep::new(
            "Deploy EDR scan on affected and adjacent systems",
            "Detect any persistence mechanisms or lateral movement",
            Risk::Low,
        ),
        RunbookStep::new(
            "Review and update firewall rules to block identified IOCs",
            "Prevent communication with known malicious infrastructure",
            Risk::Medium,
        ),
    ]
}

fn medium_steps() -> Vec<RunbookStep> {
    vec![
        RunbookStep::new(
            "Enable enhanced logging on affected system",
            "Gather additional telemetry for investigation",
            Risk::Low,
        ),
        RunbookStep::new(
            "Review authentication logs for anomalies",
            "Identify scope of potential compromise",
            Risk::Low,
        ),
        RunbookStep::new(
            "Validate user activity with asset owner",
            "Confirm whether activity is legitimate",
            Risk::Low,
        ),
        RunbookStep::new(
            "Consider password reset for affected user",
            "Precautionary measure if credentials may be compromised",
            Risk::Low,
        ),
    ]
}

fn default_steps() -> Vec<RunbookStep> {
    vec![
        RunbookStep::new(
            "Document incident details in ticketing system",
            "Maintain audit trail and enable trend analysis",
            Risk::Low,
        ),
        RunbookStep::new(
            "Monitor for similar events over next 24 hours",
            "Detect if this is part of a larger pattern",
            Risk::Low,
        ),
    ]
}

fn unknown_label() -> SeverityLabel {
    SeverityLabel::Unknown("UNKNOWN".to_string())
}
