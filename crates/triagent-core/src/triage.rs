//! Severity labels and contributing factors produced by the scoring tool.
//!
//! The core never interprets these beyond formatting them into prompts and
//! selecting a stub template.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity assigned by the upstream scoring tool.
///
/// Parsing never fails: unrecognized labels are kept verbatim as `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SeverityLabel {
    Low,
    Medium,
    High,
    Critical,
    Unknown(String),
}

impl SeverityLabel {
    pub fn as_str(&self) -> &str {
        match self {
            SeverityLabel::Low => "LOW",
            SeverityLabel::Medium => "MEDIUM",
            SeverityLabel::High => "HIGH",
            SeverityLabel::Critical => "CRITICAL",
            SeverityLabel::Unknown(label) => label,
        }
    }
}

impl From<&str> for SeverityLabel {
    fn from(label: &str) -> Self {
        match label {
            "LOW" => SeverityLabel::Low,
            "MEDIUM" => SeverityLabel::Medium,
            "HIGH" => SeverityLabel::High,
            "CRITICAL" => SeverityLabel::Critical,
            other => SeverityLabel::Unknown(other.to_string()),
        }
    }
}

impl From<String> for SeverityLabel {
    fn from(label: String) -> Self {
        SeverityLabel::from(label.as_str())
    }
}

impl From<SeverityLabel> for String {
    fn from(label: SeverityLabel) -> Self {
        match label {
            SeverityLabel::Unknown(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for SeverityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `(feature, weight)` pair explaining a score.
///
/// Serialized as a two-element array, `["malware_detected", 40]`, which is the
/// shape the scoring tool emits. An object form `{"feature", "weight"}` is also
/// accepted on input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "FactorRepr", into = "(String, i64)")]
pub struct ContributingFactor {
    pub feature: String,
    pub weight: i64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FactorRepr {
    Pair(String, i64),
    Named { feature: String, weight: i64 },
}

impl From<FactorRepr> for ContributingFactor {
    fn from(repr: FactorRepr) -> Self {
        match repr {
            FactorRepr::Pair(feature, weight) | FactorRepr::Named { feature, weight } => {
                Self { feature, weight }
            }
        }
    }
}

impl From<ContributingFactor> for (String, i64) {
    fn from(factor: ContributingFactor) -> Self {
        (factor.feature, factor.weight)
    }
}

impl ContributingFactor {
    pub fn new(feature: impl Into<String>, weight: i64) -> Self {
        Self {
            feature: feature.into(),
            weight,
        }
    }
}

impl fmt::Display for ContributingFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (+{})", self.feature, self.weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn labels_parse_and_display() {
        assert_eq!(SeverityLabel::from("HIGH"), SeverityLabel::High);
        assert_eq!(SeverityLabel::from("CRITICAL").to_string(), "CRITICAL");
        assert_eq!(
            SeverityLabel::from("high"),
            SeverityLabel::Unknown("high".into())
        );
        assert_eq!(SeverityLabel::from("weird").to_string(), "weird");
    }

    #[test]
    fn labels_serialize_as_strings() {
        assert_eq!(serde_json::to_value(SeverityLabel::Medium).unwrap(), json!("MEDIUM"));
        let label: SeverityLabel = serde_json::from_value(json!("LOW")).unwrap();
        assert_eq!(label, SeverityLabel::Low);
    }

    #[test]
    fn factors_serialize_as_pairs() {
        let factor = ContributingFactor::new("malware_detected", 40);
        assert_eq!(serde_json::to_value(&factor).unwrap(), json!(["malware_detected", 40]));
        assert_eq!(factor.to_string(), "malware_detected (+40)");
    }

    #[test]
    fn factors_accept_both_input_forms() {
        let pair: ContributingFactor = serde_json::from_value(json!(["geo", 5])).unwrap();
        let named: ContributingFactor =
            serde_json::from_value(json!({"feature": "geo", "weight": 5})).unwrap();
        assert_eq!(pair, named);
    }
}
