use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use triagent_core::{Tool, ToolContext, ToolInputs, ToolOutput, ToolResult};

/// An async closure presented as a [`Tool`].
pub struct FnTool<F> {
    func: F,
    description: Option<String>,
}

/// Wrap an async closure as a tool.
///
/// The closure receives its own clone of the context so the returned future
/// can be `'static`.
///
/// ```rust
/// use serde_json::json;
/// use triagent_core::ToolOutput;
/// use triagent_tools::tool_fn;
///
/// let echo = tool_fn(|inputs, ctx| async move {
///     let mut output = ToolOutput::new();
///     output.insert("echo".into(), inputs.into());
///     output.insert("trace_id".into(), json!(ctx.trace_id()));
///     Ok(output)
/// });
/// ```
pub fn tool_fn<F, Fut>(func: F) -> FnTool<F>
where
    F: Fn(ToolInputs, ToolContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ToolResult<ToolOutput>> + Send + 'static,
{
    FnTool {
        func,
        description: None,
    }
}

impl<F> FnTool<F> {
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[async_trait]
impl<F, Fut> Tool for FnTool<F>
where
    F: Fn(ToolInputs, ToolContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ToolResult<ToolOutput>> + Send + 'static,
{
    async fn invoke(&self, inputs: ToolInputs, context: &ToolContext) -> ToolResult<ToolOutput> {
        (self.func)(inputs, context.clone()).await
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl<F> fmt::Debug for FnTool<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTool")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}
