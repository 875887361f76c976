//! Rule-based severity scorer wired into the `triage` tool.
//!
//! Deployments inject their own scorer; this one keeps the CLI usable out of
//! the box.

use serde_json::{Map, Value};
use triagent_core::{ContributingFactor, SeverityLabel};
use triagent_tools::Score;

const HIGH_THRESHOLD: i64 = 60;
const MEDIUM_THRESHOLD: i64 = 30;

/// Boolean indicators and their weights.
const FLAGS: &[(&str, i64)] = &[
    ("malware_detected", 40),
    ("privileged_account", 20),
    ("off_hours", 10),
    ("new_device", 5),
];

/// Sum weighted indicators into `(label, score, factors)`, strongest first.
pub fn score_incident(features: Map<String, Value>) -> Result<Score, String> {
    let mut factors = Vec::new();

    if let Some(value) = features.get("failed_logins_last_hour") {
        let count = value
            .as_i64()
            .ok_or_else(|| format!("failed_logins_last_hour must be an integer, got {value}"))?;
        let weight = (count * 2).min(40);
        if weight > 0 {
            factors.push(ContributingFactor::new("failed_logins_last_hour", weight));
        }
    }

    for (flag, weight) in FLAGS {
        if features.get(*flag).and_then(Value::as_bool).unwrap_or(false) {
            factors.push(ContributingFactor::new(*flag, *weight));
        }
    }

    factors.sort_by(|a, b| b.weight.cmp(&a.weight));
    let score: i64 = factors.iter().map(|f| f.weight).sum();

    let label = if score >= HIGH_THRESHOLD {
        SeverityLabel::High
    } else if score >= MEDIUM_THRESHOLD {
        SeverityLabel::Medium
    } else {
        SeverityLabel::Low
    };

    Ok((label, score as f64, factors))
}
