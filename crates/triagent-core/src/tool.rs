//! The uniform async tool contract.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::error::{ToolError, ToolResult};

/// Tool-specific input parameters.
pub type ToolInputs = Map<String, Value>;

/// Canonical tool result mapping.
pub type ToolOutput = Map<String, Value>;

/// An invocable unit of functionality.
///
/// Implementations receive the caller's inputs by value and the context by
/// shared reference; the context is read-only to tools.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use serde_json::json;
/// use triagent_core::{Tool, ToolContext, ToolInputs, ToolOutput, ToolResult};
///
/// struct EchoTool;
///
/// #[async_trait]
/// impl Tool for EchoTool {
///     async fn invoke(&self, inputs: ToolInputs, ctx: &ToolContext) -> ToolResult<ToolOutput> {
///         let mut output = ToolOutput::new();
///         output.insert("echo".into(), inputs.into());
///         output.insert("trace_id".into(), json!(ctx.trace_id()));
///         Ok(output)
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// Invoke the tool.
    async fn invoke(&self, inputs: ToolInputs, context: &ToolContext) -> ToolResult<ToolOutput>;

    /// Short human-readable description used by tool listings.
    fn description(&self) -> Option<&str> {
        None
    }
}

/// Cross-cutting execution context passed to every tool call.
///
/// Cloning is cheap: the cancellation token is reference counted and clones
/// observe the same cancellation state.
#[derive(Debug, Clone)]
pub struct ToolContext {
    trace_id: String,
    cancellation: CancellationToken,
    fields: Map<String, Value>,
}

impl Default for ToolContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolContext {
    /// Create a context with a fresh random trace id.
    pub fn new() -> Self {
        Self::with_trace_id(uuid::Uuid::new_v4().to_string())
    }

    /// Create a context with an explicit trace id.
    pub fn with_trace_id(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            cancellation: CancellationToken::new(),
            fields: Map::new(),
        }
    }

    /// Build a context from a JSON mapping.
    ///
    /// A string `trace_id` entry becomes the trace id; every other entry is
    /// kept as a free-form field.
    pub fn from_map(mut map: Map<String, Value>) -> Self {
        let mut ctx = match map.remove("trace_id") {
            Some(Value::String(id)) => Self::with_trace_id(id),
            _ => Self::new(),
        };
        ctx.fields = map;
        ctx
    }

    /// Attach a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Attach a free-form field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Return `ToolError::Cancelled` once cancellation has been requested.
    pub fn ensure_active(&self) -> ToolResult<()> {
        if self.is_cancelled() {
            Err(self.cancelled_error())
        } else {
            Ok(())
        }
    }

    pub fn cancelled_error(&self) -> ToolError {
        ToolError::Cancelled {
            trace_id: self.trace_id.clone(),
        }
    }

    /// Derive a context for a nested call that can be cancelled on its own
    /// and is cancelled whenever this one is.
    pub fn child(&self) -> Self {
        Self {
            trace_id: self.trace_id.clone(),
            cancellation: self.cancellation.child_token(),
            fields: self.fields.clone(),
        }
    }
}
