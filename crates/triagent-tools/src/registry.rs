use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use tracing::{Instrument, debug, debug_span, warn};
use triagent_core::{
    Tool, ToolContext, ToolEnvelope, ToolError, ToolInputs, ToolName, ToolOutput, ToolResult,
};

/// Name-indexed collection of tools.
///
/// Registration takes `&mut self` and lookups take `&self`, so a registry
/// populated at startup and then shared behind an `Arc` supports concurrent
/// lookups without locking. Names are listed in registration order.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use triagent_tools::{ToolRegistry, wrap_sync};
///
/// let registry = ToolRegistry::new()
///     .with_tool("double", Arc::new(wrap_sync(|x: i64| Ok::<_, String>(x * 2))));
///
/// assert!(registry.contains("double"));
/// assert_eq!(registry.list(), vec!["double"]);
/// ```
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: IndexMap<ToolName, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty tool registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `tool` under any non-empty `name`.
    ///
    /// Re-registering an existing name replaces the tool in place (keeping its
    /// position in [`list`](Self::list)) and logs a warning. Returns whether an
    /// earlier registration was replaced. An empty name is not stored; the
    /// call logs a warning and returns `false`.
    pub fn register(&mut self, name: &str, tool: Arc<dyn Tool>) -> bool {
        match ToolName::new(name) {
            Ok(tool_name) => self.register_validated(tool_name, tool),
            Err(reason) => {
                warn!(reason = %reason, "Ignoring tool registration with an empty name");
                false
            }
        }
    }

    /// Store `tool` only if `name` follows the strict identifier rules.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::InvalidToolName` if `name` fails
    /// [`ToolName::parse_strict`].
    pub fn register_strict(&mut self, name: &str, tool: Arc<dyn Tool>) -> ToolResult<bool> {
        let tool_name =
            ToolName::parse_strict(name).map_err(|reason| ToolError::InvalidToolName {
                name: name.to_string(),
                reason,
            })?;
        Ok(self.register_validated(tool_name, tool))
    }

    /// Register under an already validated name.
    pub fn register_validated(&mut self, name: ToolName, tool: Arc<dyn Tool>) -> bool {
        let replaced = self.tools.insert(name.clone(), tool).is_some();
        if replaced {
            warn!(tool = %name, "Overwriting existing tool registration");
        } else {
            debug!(tool = %name, "Registered tool");
        }
        replaced
    }

    /// Add a tool using the builder pattern.
    pub fn with_tool(mut self, name: &str, tool: Arc<dyn Tool>) -> Self {
        self.register(name, tool);
        self
    }

    /// Add a tool using the builder pattern, enforcing the strict name rules.
    pub fn try_with_tool(mut self, name: &str, tool: Arc<dyn Tool>) -> ToolResult<Self> {
        self.register_strict(name, tool)?;
        Ok(self)
    }

    /// Look up a tool.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::NotFound` carrying every registered name when
    /// `name` is absent.
    pub fn get(&self, name: &str) -> ToolResult<Arc<dyn Tool>> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| ToolError::not_found(name, self.list()))
    }

    /// Registered names in registration order.
    pub fn list(&self) -> Vec<String> {
        self.tools.keys().map(|n| n.as_str().to_string()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// `(name, description)` pairs in registration order.
    pub fn describe(&self) -> Vec<(String, Option<String>)> {
        self.tools
            .iter()
            .map(|(name, tool)| (name.to_string(), tool.description().map(str::to_string)))
            .collect()
    }

    /// Look up `name` and invoke it.
    pub async fn invoke(
        &self,
        name: &str,
        inputs: ToolInputs,
        context: &ToolContext,
    ) -> ToolResult<ToolOutput> {
        let tool = self.get(name)?;
        let span = debug_span!("tool", tool = %name, trace_id = %context.trace_id());

        async move {
            debug!("Invoking tool");
            // Errors name the tool as registered, not as the tool calls itself.
            let result = tool
                .invoke(inputs, context)
                .await
                .map_err(|error| error.attributed_to(name));
            if let Err(error) = &result {
                debug!(error_code = error.error_code(), error = %error, "Tool failed");
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Invoke and convert the outcome into the boundary envelope.
    pub async fn invoke_enveloped(
        &self,
        name: &str,
        inputs: ToolInputs,
        context: &ToolContext,
    ) -> ToolEnvelope {
        ToolEnvelope::from_result(self.invoke(name, inputs, context).await)
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.list())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{tool_fn, wrap_sync};
    use serde_json::json;

    fn constant(value: &'static str) -> Arc<dyn Tool> {
        Arc::new(tool_fn(move |_inputs, _ctx| async move {
            let mut output = ToolOutput::new();
            output.insert("value".into(), json!(value));
            Ok(output)
        }))
    }

    #[test]
    fn test_missing_tool_lists_registered_names() {
        let registry = ToolRegistry::new()
            .with_tool("triage", constant("a"))
            .with_tool("explain", constant("b"));

        let error = registry.get("runbook").err().unwrap();
        assert_eq!(
            error,
            ToolError::NotFound {
                name: "runbook".into(),
                available: registry.list(),
            }
        );
        assert!(error.to_string().contains(r#"["triage", "explain"]"#));
    }

    #[test]
    fn test_empty_registry_not_found() {
        let error = ToolRegistry::new().get("triage").err().unwrap();
        assert_eq!(error.error_code(), "TOOL_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_reregistration_replaces_in_place() {
        let mut registry = ToolRegistry::new();
        assert!(!registry.register("triage", constant("old")));
        assert!(!registry.register("explain", constant("x")));
        assert!(registry.register("triage", constant("new")));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.list(), vec!["triage", "explain"]);

        let output = registry
            .invoke("triage", ToolInputs::new(), &ToolContext::new())
            .await
            .unwrap();
        assert_eq!(output["value"], json!("new"));
    }

    #[tokio::test]
    async fn test_any_non_empty_name_registers() {
        let mut registry = ToolRegistry::new();
        assert!(!registry.register("policy check", constant("p")));
        assert!(!registry.register("x".repeat(300).as_str(), constant("long")));

        assert!(registry.contains("policy check"));
        assert_eq!(registry.len(), 2);
        let output = registry
            .invoke("policy check", ToolInputs::new(), &ToolContext::new())
            .await
            .unwrap();
        assert_eq!(output["value"], json!("p"));
    }

    #[test]
    fn test_empty_name_is_not_stored() {
        let mut registry = ToolRegistry::new();
        assert!(!registry.register("", constant("x")));
        assert!(registry.is_empty());

        let registry = ToolRegistry::new().with_tool("", constant("x"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_strict_registration_rejects_unsafe_names() {
        let mut registry = ToolRegistry::new();
        let error = registry
            .register_strict("bad name", constant("x"))
            .unwrap_err();
        assert_eq!(error.error_code(), "INVALID_TOOL_NAME");
        assert!(registry.is_empty());
        assert!(!registry.register_strict("good_name", constant("x")).unwrap());

        assert!(
            ToolRegistry::new()
                .try_with_tool("../etc", constant("x"))
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_errors_carry_registered_name() {
        let registry = ToolRegistry::new().with_tool(
            "scorer",
            Arc::new(wrap_sync(|_: serde_json::Value| Err::<i64, _>("boom"))),
        );

        let error = registry
            .invoke("scorer", ToolInputs::new(), &ToolContext::new())
            .await
            .unwrap_err();
        assert_eq!(
            error,
            ToolError::ExecutionFailed {
                tool: "scorer".into(),
                message: "boom".into()
            }
        );
        assert_eq!(error.to_string(), "Tool 'scorer' execution failed: boom");
    }

    #[tokio::test]
    async fn test_enveloped_errors() {
        let registry = ToolRegistry::new().with_tool(
            "fails",
            Arc::new(wrap_sync(|_: serde_json::Value| Err::<i64, _>("disk on fire"))),
        );

        let envelope = registry
            .invoke_enveloped("fails", ToolInputs::new(), &ToolContext::new())
            .await;
        let value = envelope.to_value();
        assert_eq!(value["status"], json!("error"));
        assert!(value["message"].as_str().unwrap().contains("disk on fire"));

        let missing = registry
            .invoke_enveloped("nope", ToolInputs::new(), &ToolContext::new())
            .await;
        assert!(!missing.is_success());
    }

    #[tokio::test]
    async fn test_concurrent_lookups() {
        let registry = Arc::new(ToolRegistry::new().with_tool("triage", constant("v")));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    registry
                        .invoke("triage", ToolInputs::new(), &ToolContext::new())
                        .await
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap()["value"], json!("v"));
        }
    }
}
