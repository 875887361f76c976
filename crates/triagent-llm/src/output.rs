//! Parsing raw model replies into structured output.

use serde_json::Value;
use triagent_core::{ToolOutput, ToolReturn, normalize};

use crate::error::OutputError;
use crate::schema::OutputSchema;

/// Parse a raw reply and validate it against `schema` when one is given.
///
/// Models regularly wrap JSON in a markdown code fence despite being told not
/// to, so a single surrounding fence is stripped before parsing. With a schema
/// the value must be an object that satisfies it. Without one, any JSON value
/// is accepted and normalized into a map.
pub fn parse_structured(raw: &str, schema: Option<&OutputSchema>) -> Result<ToolOutput, OutputError> {
    let text = strip_code_fence(raw);
    let value: Value = serde_json::from_str(text).map_err(|e| OutputError::Parse(e.to_string()))?;

    match schema {
        Some(schema) => {
            schema.validate(&value)?;
            match value {
                Value::Object(map) => Ok(map),
                other => Err(OutputError::Schema {
                    schema: schema.name().to_string(),
                    errors: vec![format!("expected a JSON object, got {}", kind(&other))],
                }),
            }
        }
        None => Ok(normalize(ToolReturn::from_value(value), None)),
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    match body.split_once('\n') {
        Some((_, inner)) => inner.trim(),
        None => body.trim(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::triage_explanation;
    use serde_json::json;

    #[test]
    fn parses_plain_objects() {
        let output = parse_structured(r#"{"a": 1}"#, None).unwrap();
        assert_eq!(output["a"], json!(1));
    }

    #[test]
    fn strips_markdown_fences() {
        let raw = "```json\n{\"explanation\": \"x\", \"reasons\": []}\n```";
        let output = parse_structured(raw, Some(&triage_explanation())).unwrap();
        assert_eq!(output["explanation"], json!("x"));

        let bare = "```\n{\"a\": true}\n```";
        assert_eq!(parse_structured(bare, None).unwrap()["a"], json!(true));
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let error = parse_structured("Sure! Here is the JSON:", None).unwrap_err();
        assert!(matches!(error, OutputError::Parse(_)));
        assert_eq!(error.error_code(), "PARSE_ERROR");
    }

    #[test]
    fn schema_violations_are_reported() {
        let error = parse_structured(r#"{"explanation": "x"}"#, Some(&triage_explanation()))
            .unwrap_err();
        assert!(matches!(error, OutputError::Schema { .. }));
    }

    #[test]
    fn schema_requires_an_object() {
        let schema = OutputSchema::new("anything", json!({})).unwrap();
        let error = parse_structured("[1, 2]", Some(&schema)).unwrap_err();
        assert!(error.to_string().contains("expected a JSON object, got an array"));
    }

    #[test]
    fn schemaless_scalars_are_normalized() {
        let output = parse_structured("42", None).unwrap();
        assert_eq!(output["result"], json!(42));
    }
}
