//! Property-Based Tests for Result Normalization and Stub Output
//!
//! These tests check invariants that should hold for any input: the
//! normalizer's shape table, stub determinism, and the wrapped-tool contract.

use proptest::prelude::*;
use serde_json::{Value, json};
use triagent::core::{ToolReturn, normalize};
use triagent::llm::{stub_explanation, stub_runbook};
use triagent::{ContributingFactor, SeverityLabel, Tool, ToolContext, ToolInputs, wrap_sync};

fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-z ]{0,16}".prop_map(Value::from),
        prop::collection::vec(any::<i32>(), 0..4).prop_map(|xs| json!(xs)),
    ]
}

fn label_strategy() -> impl Strategy<Value = SeverityLabel> {
    prop_oneof![
        Just(SeverityLabel::Low),
        Just(SeverityLabel::Medium),
        Just(SeverityLabel::High),
        Just(SeverityLabel::Critical),
        "[A-Z]{1,8}".prop_map(SeverityLabel::from),
    ]
}

fn factors_strategy() -> impl Strategy<Value = Vec<ContributingFactor>> {
    prop::collection::vec(
        ("[a-z_]{1,12}", -50i64..50).prop_map(|(f, w)| ContributingFactor::new(f, w)),
        0..8,
    )
}

proptest! {
    /// Property: scalars land under exactly one key, the configured one
    #[test]
    fn prop_scalar_uses_result_key(value in scalar_strategy(), key in "[a-z]{1,10}") {
        let output = normalize(ToolReturn::Scalar(value.clone()), Some(&key));
        prop_assert_eq!(output.len(), 1);
        prop_assert_eq!(output.get(&key), Some(&value));
    }

    /// Property: mappings pass through untouched
    #[test]
    fn prop_mapping_is_identity(
        entries in prop::collection::btree_map("[a-z]{1,6}", any::<i64>(), 0..6)
    ) {
        let map: serde_json::Map<String, Value> =
            entries.into_iter().map(|(k, v)| (k, Value::from(v))).collect();
        let output = normalize(ToolReturn::Mapping(map.clone()), Some("ignored"));
        prop_assert_eq!(output, map);
    }

    /// Property: other-arity tuples keep every element in order under `values`
    #[test]
    fn prop_tuple_keeps_values(values in prop::collection::vec(scalar_strategy(), 0..6)) {
        let output = normalize(ToolReturn::Tuple(values.clone()), None);
        prop_assert_eq!(output.len(), 1);
        prop_assert_eq!(&output["values"], &Value::Array(values));
    }

    /// Property: stub runbooks depend only on the label
    #[test]
    fn prop_stub_runbook_length(label in label_strategy(), factors in factors_strategy()) {
        let runbook = stub_runbook(&label, &factors);
        let expected = match label {
            SeverityLabel::High => 5,
            SeverityLabel::Medium => 4,
            _ => 2,
        };
        prop_assert_eq!(runbook.len(), expected);
        prop_assert!(runbook.is_stub());
        prop_assert_eq!(runbook, stub_runbook(&label, &[]));
    }

    /// Property: stub explanations are deterministic and always give two reasons
    #[test]
    fn prop_stub_explanation_deterministic(
        label in label_strategy(),
        score in 0.0f64..100.0,
        factors in factors_strategy()
    ) {
        let first = stub_explanation(&label, score, &factors);
        let second = stub_explanation(&label, score, &factors);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.reasons.len(), 2);
        prop_assert!(first.explanation.contains(label.as_str()));
    }

    /// Property: a wrapped function sees exactly the value under its input key
    #[test]
    fn prop_wrapped_tool_receives_input_key(value in scalar_strategy()) {
        let tool = wrap_sync(|v: Value| -> Result<Value, String> { Ok(v) })
            .input_key("x")
            .result_key("echo");

        let mut inputs = ToolInputs::new();
        inputs.insert("x".into(), value.clone());
        inputs.insert("noise".into(), json!("ignored"));

        let context = ToolContext::new();
        let output = tokio_test::block_on(tool.invoke(inputs, &context));

        prop_assert_eq!(output.unwrap(), json!({"echo": value}).as_object().cloned().unwrap());
    }
}
