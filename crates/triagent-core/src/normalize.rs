//! Result normalization.
//!
//! Tools return many shapes: mappings, positional tuples, bare scalars. The
//! normalizer represents that space as the tagged [`ToolReturn`] enum and
//! collapses it into one canonical [`ToolOutput`] mapping.
//!
//! | Return shape       | Canonical mapping                         |
//! |--------------------|-------------------------------------------|
//! | mapping            | unchanged                                 |
//! | 3-tuple            | `{"label", "score", "contribs"}`          |
//! | 2-tuple            | `{"first", "second"}`                     |
//! | other tuple arity  | `{"values": [...]}`                       |
//! | anything else      | `{result_key: value}` or `{"result": value}` |
//!
//! The 3-tuple row is the shape the severity-scoring tool returns.
//!
//! ```rust
//! use serde_json::json;
//! use triagent_core::{IntoToolReturn, normalize};
//!
//! let ret = ("HIGH", 0.9, vec![("malware_detected", 40)]).into_tool_return().unwrap();
//! let output = normalize(ret, None);
//!
//! assert_eq!(
//!     serde_json::Value::Object(output),
//!     json!({"label": "HIGH", "score": 0.9, "contribs": [["malware_detected", 40]]})
//! );
//! ```

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

use crate::tool::ToolOutput;

/// Default key for scalar results when no result key is configured.
pub const DEFAULT_RESULT_KEY: &str = "result";

/// The shapes a tool return value can take.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolReturn {
    /// Already a mapping.
    Mapping(Map<String, Value>),
    /// Positional `(label, score, contribs)`.
    Triple(Value, Value, Value),
    /// Positional pair.
    Pair(Value, Value),
    /// A tuple of any other arity.
    Tuple(Vec<Value>),
    /// Any non-mapping, non-tuple value.
    Scalar(Value),
}

/// Collapse a tool return value into the canonical mapping.
///
/// `result_key` only affects [`ToolReturn::Scalar`].
pub fn normalize(ret: ToolReturn, result_key: Option<&str>) -> ToolOutput {
    match ret {
        ToolReturn::Mapping(map) => map,
        ToolReturn::Triple(label, score, contribs) => {
            let mut out = Map::with_capacity(3);
            out.insert("label".into(), label);
            out.insert("score".into(), score);
            out.insert("contribs".into(), contribs);
            out
        }
        ToolReturn::Pair(first, second) => {
            let mut out = Map::with_capacity(2);
            out.insert("first".into(), first);
            out.insert("second".into(), second);
            out
        }
        ToolReturn::Tuple(values) => {
            let mut out = Map::with_capacity(1);
            out.insert("values".into(), Value::Array(values));
            out
        }
        ToolReturn::Scalar(value) => {
            let mut out = Map::with_capacity(1);
            out.insert(
                result_key.unwrap_or(DEFAULT_RESULT_KEY).to_string(),
                value,
            );
            out
        }
    }
}

impl ToolReturn {
    /// Classify an arbitrary JSON value. JSON has no tuples, so arrays are scalars.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => ToolReturn::Mapping(map),
            other => ToolReturn::Scalar(other),
        }
    }
}

/// Conversion of a Rust return type into a [`ToolReturn`].
///
/// Serialization can fail for exotic types (for example maps with non-string
/// keys), so the conversion is fallible.
pub trait IntoToolReturn {
    fn into_tool_return(self) -> serde_json::Result<ToolReturn>;
}

impl IntoToolReturn for ToolReturn {
    fn into_tool_return(self) -> serde_json::Result<ToolReturn> {
        Ok(self)
    }
}

impl IntoToolReturn for Value {
    fn into_tool_return(self) -> serde_json::Result<ToolReturn> {
        Ok(ToolReturn::from_value(self))
    }
}

impl IntoToolReturn for Map<String, Value> {
    fn into_tool_return(self) -> serde_json::Result<ToolReturn> {
        Ok(ToolReturn::Mapping(self))
    }
}

impl<V: Serialize> IntoToolReturn for HashMap<String, V> {
    fn into_tool_return(self) -> serde_json::Result<ToolReturn> {
        serde_json::to_value(self).map(ToolReturn::from_value)
    }
}

impl<V: Serialize> IntoToolReturn for BTreeMap<String, V> {
    fn into_tool_return(self) -> serde_json::Result<ToolReturn> {
        serde_json::to_value(self).map(ToolReturn::from_value)
    }
}

/// Wrapper for returning any serializable type.
///
/// Structs and maps serialize to objects and become mappings; everything else
/// is a scalar.
#[derive(Debug, Clone)]
pub struct Structured<T>(pub T);

impl<T: Serialize> IntoToolReturn for Structured<T> {
    fn into_tool_return(self) -> serde_json::Result<ToolReturn> {
        serde_json::to_value(self.0).map(ToolReturn::from_value)
    }
}

impl IntoToolReturn for () {
    fn into_tool_return(self) -> serde_json::Result<ToolReturn> {
        Ok(ToolReturn::Tuple(Vec::new()))
    }
}

impl<A: Serialize> IntoToolReturn for (A,) {
    fn into_tool_return(self) -> serde_json::Result<ToolReturn> {
        Ok(ToolReturn::Tuple(vec![serde_json::to_value(self.0)?]))
    }
}

impl<A: Serialize, B: Serialize> IntoToolReturn for (A, B) {
    fn into_tool_return(self) -> serde_json::Result<ToolReturn> {
        Ok(ToolReturn::Pair(
            serde_json::to_value(self.0)?,
            serde_json::to_value(self.1)?,
        ))
    }
}

impl<A: Serialize, B: Serialize, C: Serialize> IntoToolReturn for (A, B, C) {
    fn into_tool_return(self) -> serde_json::Result<ToolReturn> {
        Ok(ToolReturn::Triple(
            serde_json::to_value(self.0)?,
            serde_json::to_value(self.1)?,
            serde_json::to_value(self.2)?,
        ))
    }
}

impl<A: Serialize, B: Serialize, C: Serialize, D: Serialize> IntoToolReturn for (A, B, C, D) {
    fn into_tool_return(self) -> serde_json::Result<ToolReturn> {
        Ok(ToolReturn::Tuple(vec![
            serde_json::to_value(self.0)?,
            serde_json::to_value(self.1)?,
            serde_json::to_value(self.2)?,
            serde_json::to_value(self.3)?,
        ]))
    }
}

impl<A: Serialize, B: Serialize, C: Serialize, D: Serialize, E: Serialize> IntoToolReturn
    for (A, B, C, D, E)
{
    fn into_tool_return(self) -> serde_json::Result<ToolReturn> {
        Ok(ToolReturn::Tuple(vec![
            serde_json::to_value(self.0)?,
            serde_json::to_value(self.1)?,
            serde_json::to_value(self.2)?,
            serde_json::to_value(self.3)?,
            serde_json::to_value(self.4)?,
        ]))
    }
}

impl<T: Serialize> IntoToolReturn for Vec<T> {
    fn into_tool_return(self) -> serde_json::Result<ToolReturn> {
        serde_json::to_value(self).map(ToolReturn::Scalar)
    }
}

impl<T: Serialize> IntoToolReturn for Option<T> {
    fn into_tool_return(self) -> serde_json::Result<ToolReturn> {
        serde_json::to_value(self).map(ToolReturn::Scalar)
    }
}

macro_rules! scalar_tool_return {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoToolReturn for $ty {
                fn into_tool_return(self) -> serde_json::Result<ToolReturn> {
                    serde_json::to_value(self).map(ToolReturn::Scalar)
                }
            }
        )*
    };
}

scalar_tool_return!(
    String, &str, bool, char, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64,
);
