//! Lifting blocking functions into the async tool contract.
//!
//! [`wrap_sync`] turns `Fn(I) -> Result<R, E>` into a [`Tool`]. The function
//! runs on tokio's blocking thread pool, gated by a [`BlockingPool`] semaphore,
//! and its return value is canonicalized by [`normalize`]:
//!
//! | function returns        | tool output                      |
//! |-------------------------|----------------------------------|
//! | a map / JSON object     | unchanged                        |
//! | 3-tuple `(a, b, c)`     | `{label: a, score: b, contribs: c}` |
//! | 2-tuple `(a, b)`        | `{first: a, second: b}`          |
//! | other tuple             | `{values: [...]}`                |
//! | anything else           | `{<result_key>: v}` or `{result: v}` |

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tracing::debug;
use triagent_core::{
    InputValidationError, IntoToolReturn, Tool, ToolContext, ToolError, ToolInputs, ToolOutput,
    ToolResult, normalize,
};

/// Default number of wrapped functions allowed to run at once.
pub const DEFAULT_MAX_BLOCKING: usize = 16;

const DEFAULT_TOOL_NAME: &str = "sync_tool";

/// Bound on concurrently running blocking tool calls.
///
/// Clones share the same permits, so handing one pool to several wrapped
/// tools bounds them together.
#[derive(Debug, Clone)]
pub struct BlockingPool {
    permits: Arc<Semaphore>,
    max_blocking: usize,
}

impl BlockingPool {
    /// `max_blocking` is clamped to at least one.
    pub fn new(max_blocking: usize) -> Self {
        let max_blocking = max_blocking.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_blocking)),
            max_blocking,
        }
    }

    pub fn max_blocking(&self) -> usize {
        self.max_blocking
    }

    /// Permits not currently held by a running call.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

impl Default for BlockingPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BLOCKING)
    }
}

/// A blocking function presented as a [`Tool`]. Built by [`wrap_sync`].
pub struct SyncTool<F, I, R, E> {
    func: Arc<F>,
    name: String,
    description: Option<String>,
    input_key: Option<String>,
    result_key: Option<String>,
    pool: BlockingPool,
    _signature: PhantomData<fn(I) -> Result<R, E>>,
}

/// Wrap a blocking function as a tool.
///
/// Without an [`input_key`](SyncTool::input_key) the whole input map is
/// deserialized into `I`; with one, only that entry is.
///
/// ```rust
/// use serde_json::{Map, Value};
/// use triagent_tools::wrap_sync;
///
/// fn score(features: Map<String, Value>) -> Result<(String, f64, Vec<(String, i64)>), String> {
///     let logins = features.get("failed_logins").and_then(Value::as_i64).unwrap_or(0);
///     Ok(("HIGH".into(), 0.9, vec![("failed_logins".into(), logins)]))
/// }
///
/// let triage = wrap_sync(score).input_key("features").name("triage");
/// ```
pub fn wrap_sync<F, I, R, E>(func: F) -> SyncTool<F, I, R, E>
where
    F: Fn(I) -> Result<R, E> + Send + Sync + 'static,
    I: DeserializeOwned + Send + 'static,
    R: IntoToolReturn + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    SyncTool {
        func: Arc::new(func),
        name: DEFAULT_TOOL_NAME.to_string(),
        description: None,
        input_key: None,
        result_key: None,
        pool: BlockingPool::default(),
        _signature: PhantomData,
    }
}

impl<F, I, R, E> SyncTool<F, I, R, E> {
    /// Pass `inputs[key]` to the function instead of the whole map.
    pub fn input_key(mut self, key: impl Into<String>) -> Self {
        self.input_key = Some(key.into());
        self
    }

    /// Key used when the result is neither a map nor a tuple.
    pub fn result_key(mut self, key: impl Into<String>) -> Self {
        self.result_key = Some(key.into());
        self
    }

    /// Name reported in execution errors.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Share a concurrency bound with other wrapped tools.
    pub fn pool(mut self, pool: BlockingPool) -> Self {
        self.pool = pool;
        self
    }

    fn invalid_input(&self, source: InputValidationError) -> ToolError {
        ToolError::invalid_input(&self.name, source)
    }

    fn extract_argument(&self, mut inputs: ToolInputs) -> ToolResult<Value> {
        match &self.input_key {
            Some(key) => inputs.shift_remove(key).ok_or_else(|| {
                self.invalid_input(InputValidationError::MissingKey {
                    key: key.clone(),
                    present: inputs.keys().cloned().collect(),
                })
            }),
            None => Ok(Value::Object(inputs)),
        }
    }
}

#[async_trait]
impl<F, I, R, E> Tool for SyncTool<F, I, R, E>
where
    F: Fn(I) -> Result<R, E> + Send + Sync + 'static,
    I: DeserializeOwned + Send + 'static,
    R: IntoToolReturn + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    async fn invoke(&self, inputs: ToolInputs, context: &ToolContext) -> ToolResult<ToolOutput> {
        let argument = self.extract_argument(inputs)?;
        let argument: I = serde_json::from_value(argument).map_err(|e| {
            self.invalid_input(InputValidationError::Malformed {
                reason: e.to_string(),
            })
        })?;
        context.ensure_active()?;

        let permit = tokio::select! {
            biased;
            _ = context.cancellation().cancelled() => return Err(context.cancelled_error()),
            permit = Arc::clone(&self.pool.permits).acquire_owned() => {
                permit.map_err(|e| ToolError::execution_failed(&self.name, e))?
            }
        };

        debug!(
            tool = %self.name,
            trace_id = %context.trace_id(),
            "Dispatching blocking tool call"
        );

        let func = Arc::clone(&self.func);
        // The permit travels with the closure so it is held until the function
        // returns, even if the caller stops waiting.
        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            func(argument)
        });

        let joined = tokio::select! {
            biased;
            _ = context.cancellation().cancelled() => return Err(context.cancelled_error()),
            joined = handle => joined,
        };

        let returned = joined
            .map_err(|e| ToolError::execution_failed(&self.name, join_failure(e)))?
            .map_err(|e| ToolError::execution_failed(&self.name, e))?;

        let shape = returned.into_tool_return().map_err(|e| {
            ToolError::execution_failed(&self.name, format!("result is not serializable: {e}"))
        })?;

        Ok(normalize(shape, self.result_key.as_deref()))
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl<F, I, R, E> fmt::Debug for SyncTool<F, I, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncTool")
            .field("name", &self.name)
            .field("input_key", &self.input_key)
            .field("result_key", &self.result_key)
            .field("max_blocking", &self.pool.max_blocking)
            .finish_non_exhaustive()
    }
}

fn join_failure(error: JoinError) -> String {
    if error.is_panic() {
        format!("panicked: {}", panic_message(error.into_panic()))
    } else {
        error.to_string()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
