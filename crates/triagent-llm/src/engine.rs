//! Resilient invocation engine.
//!
//! One call walks the backends in their fixed order. Each backend gets its own
//! corrective retry loop ([`run_with_retries`]); a backend that fails outright
//! or runs out of retries hands over to the next one. When nothing is left, or
//! the engine is offline, the request's stub is rendered instead.
//!
//! No health state survives between calls: every invocation starts again from
//! the first backend.

use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use triagent_core::{ToolContext, ToolOutput};

use crate::backend::LlmBackend;
use crate::config::{DEFAULT_MAX_RETRIES, LlmConfig};
use crate::error::{InvocationError, InvocationResult};
use crate::http::HttpChatBackend;
use crate::retry::{
    AttemptOutcome, CorrectiveBuilder, RetryPolicy, default_corrective_message, run_with_retries,
};
use crate::schema::OutputSchema;
use crate::stub::StubRequest;

/// One structured-output request. Immutable once built.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    prompt: String,
    system_prompt: String,
    schema: Option<OutputSchema>,
    max_retries: u32,
    stub: Option<StubRequest>,
}

impl InvocationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: String::new(),
            schema: None,
            max_retries: DEFAULT_MAX_RETRIES,
            stub: None,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn with_schema(mut self, schema: OutputSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Output to fall back on when no backend produces a result.
    ///
    /// Without one, a request using a built-in schema falls back on that
    /// schema's stub, and any other request on an empty map.
    pub fn with_stub(mut self, stub: StubRequest) -> Self {
        self.stub = Some(stub);
        self
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn schema(&self) -> Option<&OutputSchema> {
        self.schema.as_ref()
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// The stub this request falls back on.
    pub fn stub(&self) -> StubRequest {
        self.stub
            .clone()
            .or_else(|| self.schema.as_ref().and_then(StubRequest::for_schema))
            .unwrap_or_default()
    }
}

// Wire form: {prompt, system_prompt, schema: <name|null>, max_retries}
impl Serialize for InvocationRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("InvocationRequest", 4)?;
        state.serialize_field("prompt", &self.prompt)?;
        state.serialize_field("system_prompt", &self.system_prompt)?;
        state.serialize_field("schema", &self.schema.as_ref().map(OutputSchema::name))?;
        state.serialize_field("max_retries", &self.max_retries)?;
        state.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubReason {
    /// The LLM subsystem is switched off or has no credentials.
    Offline,
    /// Online, but no backend survived construction.
    NoBackends,
    /// Every backend failed or ran out of retries.
    Exhausted,
}

impl StubReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StubReason::Offline => "offline",
            StubReason::NoBackends => "no_backends",
            StubReason::Exhausted => "exhausted",
        }
    }
}

/// Where an [`Invocation`]'s output came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    Backend { name: String },
    Stub { reason: StubReason },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub output: ToolOutput,
    pub provenance: Provenance,
    /// Requests sent across all backends.
    pub backend_calls: u32,
}

impl Invocation {
    pub fn is_stub(&self) -> bool {
        matches!(self.provenance, Provenance::Stub { .. })
    }

    pub fn backend_name(&self) -> Option<&str> {
        match &self.provenance {
            Provenance::Backend { name } => Some(name),
            Provenance::Stub { .. } => None,
        }
    }

    pub fn into_output(self) -> ToolOutput {
        self.output
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmMode {
    Online,
    /// Never contact a backend.
    Offline,
}

/// Drives structured-output requests through the backends.
#[derive(Clone)]
pub struct InvocationEngine {
    backends: Vec<Arc<dyn LlmBackend>>,
    mode: LlmMode,
    corrective: CorrectiveBuilder,
}

impl InvocationEngine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// An engine that always renders stubs.
    pub fn offline() -> Self {
        Self::builder().offline().build()
    }

    /// Build from configuration: offline unless an LLM is available, otherwise
    /// one HTTP backend per configured model.
    pub fn from_config(config: &LlmConfig) -> Self {
        if !config.is_llm_available() {
            info!("LLM not configured, using stub output");
            return Self::offline();
        }

        let mut builder = Self::builder();
        for backend in HttpChatBackend::from_config(config) {
            match backend {
                Ok(backend) => builder = builder.backend(backend),
                Err(error) => warn!(error = %error, "Skipping LLM backend"),
            }
        }
        builder.build()
    }

    pub fn mode(&self) -> LlmMode {
        self.mode
    }

    pub fn is_offline(&self) -> bool {
        self.mode == LlmMode::Offline
    }

    /// Names of the usable backends in fallback order.
    pub fn backend_names(&self) -> Vec<String> {
        self.backends.iter().map(|b| b.name().to_string()).collect()
    }

    /// Produce a structured result for `request`.
    ///
    /// Never fails except on cancellation: output problems are retried, backend
    /// problems fall through to the next backend, and the stub is the last
    /// resort.
    pub async fn invoke(
        &self,
        request: &InvocationRequest,
        context: &ToolContext,
    ) -> InvocationResult<Invocation> {
        if context.is_cancelled() {
            return Err(cancelled(context));
        }

        if self.mode == LlmMode::Offline {
            return Ok(self.stub(request, context, StubReason::Offline, 0));
        }
        if self.backends.is_empty() {
            return Ok(self.stub(request, context, StubReason::NoBackends, 0));
        }

        let policy = RetryPolicy::new(request.max_retries()).with_corrective(self.corrective.clone());
        let mut backend_calls = 0;

        for backend in &self.backends {
            let outcome = run_with_retries(backend.as_ref(), request, &policy, context).await;
            backend_calls += outcome.calls();

            match outcome {
                AttemptOutcome::Success { output, calls } => {
                    debug!(
                        backend = %backend.name(),
                        trace_id = %context.trace_id(),
                        calls,
                        "LLM invocation succeeded"
                    );
                    return Ok(Invocation {
                        output,
                        provenance: Provenance::Backend {
                            name: backend.name().to_string(),
                        },
                        backend_calls,
                    });
                }
                AttemptOutcome::Exhausted { calls, last_error } => {
                    warn!(
                        backend = %backend.name(),
                        trace_id = %context.trace_id(),
                        calls,
                        error = %last_error,
                        "Retries exhausted, falling back"
                    );
                }
                AttemptOutcome::Failed { calls, error } => {
                    warn!(
                        backend = %backend.name(),
                        trace_id = %context.trace_id(),
                        calls,
                        error_code = error.error_code(),
                        error = %error,
                        "Backend failed, falling back"
                    );
                }
                AttemptOutcome::Cancelled { .. } => return Err(cancelled(context)),
            }
        }

        Ok(self.stub(request, context, StubReason::Exhausted, backend_calls))
    }

    fn stub(
        &self,
        request: &InvocationRequest,
        context: &ToolContext,
        reason: StubReason,
        backend_calls: u32,
    ) -> Invocation {
        info!(
            trace_id = %context.trace_id(),
            reason = reason.as_str(),
            "Using stub LLM output"
        );
        let output = request.stub().render();
        if let Some(schema) = request.schema() {
            if let Err(error) = schema.validate(&Value::Object(output.clone())) {
                warn!(
                    trace_id = %context.trace_id(),
                    schema = schema.name(),
                    error = %error,
                    "Stub output does not match the request schema"
                );
            }
        }
        Invocation {
            output,
            provenance: Provenance::Stub { reason },
            backend_calls,
        }
    }
}

fn cancelled(context: &ToolContext) -> InvocationError {
    InvocationError::Cancelled {
        trace_id: context.trace_id().to_string(),
    }
}

impl fmt::Debug for InvocationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationEngine")
            .field("backends", &self.backend_names())
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// Builder for [`InvocationEngine`].
pub struct EngineBuilder {
    backends: Vec<Arc<dyn LlmBackend>>,
    mode: LlmMode,
    corrective: CorrectiveBuilder,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            backends: Vec::new(),
            mode: LlmMode::Online,
            corrective: Arc::new(default_corrective_message),
        }
    }
}

impl EngineBuilder {
    /// Append a backend to the fallback order.
    ///
    /// Backends that report themselves unavailable are dropped here, once.
    pub fn backend(self, backend: impl LlmBackend + 'static) -> Self {
        self.shared_backend(Arc::new(backend))
    }

    pub fn shared_backend(mut self, backend: Arc<dyn LlmBackend>) -> Self {
        match backend.availability() {
            Ok(()) => {
                debug!(backend = %backend.name(), "Registered LLM backend");
                self.backends.push(backend);
            }
            Err(error) => {
                warn!(backend = %backend.name(), error = %error, "Dropping unavailable LLM backend");
            }
        }
        self
    }

    pub fn offline(mut self) -> Self {
        self.mode = LlmMode::Offline;
        self
    }

    pub fn mode(mut self, mode: LlmMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn corrective_message(
        mut self,
        builder: impl Fn(&crate::error::OutputError) -> String + Send + Sync + 'static,
    ) -> Self {
        self.corrective = Arc::new(builder);
        self
    }

    pub fn build(self) -> InvocationEngine {
        InvocationEngine {
            backends: self.backends,
            mode: self.mode,
            corrective: self.corrective,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use crate::schema::{runbook_response, triage_explanation};
    use crate::testing::ScriptedBackend;
    use serde_json::json;
    use std::time::Duration;
    use triagent_core::{CancellationToken, SeverityLabel};

    const VALID: &str = r#"{"explanation": "Malware found.", "reasons": ["edr"]}"#;

    fn explain_request(max_retries: u32) -> InvocationRequest {
        InvocationRequest::new("explain")
            .with_system_prompt("sys")
            .with_schema(triage_explanation())
            .with_max_retries(max_retries)
            .with_stub(StubRequest::Explanation {
                label: SeverityLabel::High,
                score: 8.0,
                factors: vec![],
            })
    }

    #[tokio::test]
    async fn third_attempt_succeeds_on_first_backend() {
        let a = ScriptedBackend::new("a").reply("x").reply("{").reply(VALID);
        let b = ScriptedBackend::new("b").always(VALID);
        let engine = InvocationEngine::builder()
            .backend(a.clone())
            .backend(b.clone())
            .build();

        let result = engine
            .invoke(&explain_request(2), &ToolContext::new())
            .await
            .unwrap();

        assert_eq!(result.backend_name(), Some("a"));
        assert_eq!(result.output["explanation"], json!("Malware found."));
        assert_eq!(result.backend_calls, 3);
        assert_eq!(a.call_count(), 3);
        assert_eq!(b.call_count(), 0);
    }

    #[tokio::test]
    async fn falls_back_after_exhausting_retries() {
        let a = ScriptedBackend::new("a").always("not json");
        let b = ScriptedBackend::new("b").always(VALID);
        let engine = InvocationEngine::builder()
            .backend(a.clone())
            .backend(b.clone())
            .build();

        let result = engine
            .invoke(&explain_request(1), &ToolContext::new())
            .await
            .unwrap();

        assert_eq!(a.call_count(), 2);
        assert_eq!(b.call_count(), 1);
        assert_eq!(result.backend_name(), Some("b"));
        assert_eq!(result.backend_calls, 3);

        // The second backend starts a fresh conversation.
        assert_eq!(b.conversations()[0].len(), 2);
    }

    #[tokio::test]
    async fn backend_failure_moves_on_immediately() {
        let a = ScriptedBackend::new("a").always_fail(BackendError::Transport("reset".into()));
        let b = ScriptedBackend::new("b").always(VALID);
        let engine = InvocationEngine::builder()
            .backend(a.clone())
            .backend(b.clone())
            .build();

        let result = engine
            .invoke(&explain_request(3), &ToolContext::new())
            .await
            .unwrap();

        assert_eq!(a.call_count(), 1);
        assert_eq!(result.backend_name(), Some("b"));
    }

    #[tokio::test]
    async fn stub_after_every_backend_is_exhausted() {
        let a = ScriptedBackend::new("a").always("nope");
        let engine = InvocationEngine::builder().backend(a.clone()).build();

        let result = engine
            .invoke(&explain_request(1), &ToolContext::new())
            .await
            .unwrap();

        assert_eq!(a.call_count(), 2);
        assert_eq!(
            result.provenance,
            Provenance::Stub {
                reason: StubReason::Exhausted
            }
        );
        assert!(
            result.output["explanation"]
                .as_str()
                .unwrap()
                .contains("HIGH severity")
        );
    }

    #[tokio::test]
    async fn offline_mode_never_contacts_backends() {
        let a = ScriptedBackend::new("a").always(VALID);
        let engine = InvocationEngine::builder()
            .backend(a.clone())
            .offline()
            .build();
        let request = InvocationRequest::new("runbook")
            .with_schema(runbook_response())
            .with_stub(StubRequest::Runbook {
                label: SeverityLabel::Medium,
                factors: vec![],
            });

        let first = engine.invoke(&request, &ToolContext::new()).await.unwrap();
        let second = engine.invoke(&request, &ToolContext::new()).await.unwrap();

        assert_eq!(a.call_count(), 0);
        assert_eq!(first, second);
        assert_eq!(first.output["runbook"].as_array().unwrap().len(), 4);
        assert_eq!(first.backend_calls, 0);
    }

    #[tokio::test]
    async fn unavailable_backends_are_dropped_at_build() {
        let a = ScriptedBackend::new("a").unavailable("sdk missing");
        let b = ScriptedBackend::new("b").always(VALID);
        let engine = InvocationEngine::builder()
            .backend(a.clone())
            .backend(b)
            .build();

        assert_eq!(engine.backend_names(), vec!["b"]);
        engine
            .invoke(&explain_request(0), &ToolContext::new())
            .await
            .unwrap();
        assert_eq!(a.call_count(), 0);
    }

    #[tokio::test]
    async fn no_backends_renders_stub() {
        let engine = InvocationEngine::builder().build();
        let result = engine
            .invoke(&explain_request(2), &ToolContext::new())
            .await
            .unwrap();
        assert_eq!(
            result.provenance,
            Provenance::Stub {
                reason: StubReason::NoBackends
            }
        );
    }

    #[tokio::test]
    async fn schema_without_stub_still_conforms_offline() {
        let engine = InvocationEngine::offline();

        for schema in [triage_explanation(), runbook_response()] {
            let request = InvocationRequest::new("p").with_schema(schema.clone());
            let result = engine.invoke(&request, &ToolContext::new()).await.unwrap();

            assert!(result.is_stub());
            assert!(
                schema.is_valid(&Value::Object(result.output)),
                "stub for {} does not conform",
                schema.name()
            );
        }
    }

    #[tokio::test]
    async fn schema_without_stub_conforms_after_exhaustion() {
        let backend = ScriptedBackend::new("a").always("not json");
        let engine = InvocationEngine::builder().backend(backend).build();
        let request = InvocationRequest::new("p")
            .with_schema(runbook_response())
            .with_max_retries(0);

        let result = engine.invoke(&request, &ToolContext::new()).await.unwrap();

        assert_eq!(
            result.provenance,
            Provenance::Stub {
                reason: StubReason::Exhausted
            }
        );
        assert!(runbook_response().is_valid(&Value::Object(result.output)));
    }

    #[test]
    fn explicit_stub_takes_precedence() {
        let request = InvocationRequest::new("p")
            .with_schema(runbook_response())
            .with_stub(StubRequest::Runbook {
                label: SeverityLabel::High,
                factors: vec![],
            });
        assert_eq!(request.stub().render()["runbook"].as_array().unwrap().len(), 5);
        assert_eq!(InvocationRequest::new("p").stub(), StubRequest::default());
    }

    #[tokio::test]
    async fn cancelled_context_is_rejected_up_front() {
        let a = ScriptedBackend::new("a").always(VALID);
        let engine = InvocationEngine::builder().backend(a.clone()).build();
        let context = ToolContext::with_trace_id("t-1");
        context.cancellation().cancel();

        let error = engine
            .invoke(&explain_request(2), &context)
            .await
            .unwrap_err();

        assert_eq!(
            error,
            InvocationError::Cancelled {
                trace_id: "t-1".into()
            }
        );
        assert_eq!(a.call_count(), 0);
    }

    #[tokio::test]
    async fn cancellation_between_retries_skips_fallback() {
        let token = CancellationToken::new();
        let a = ScriptedBackend::new("a")
            .always("bad")
            .cancel_after(1, token.clone());
        let b = ScriptedBackend::new("b").always(VALID);
        let engine = InvocationEngine::builder()
            .backend(a.clone())
            .backend(b.clone())
            .build();
        let context = ToolContext::new().with_cancellation(token);

        let result = engine.invoke(&explain_request(3), &context).await;

        assert!(matches!(result, Err(InvocationError::Cancelled { .. })));
        assert_eq!(a.call_count(), 1);
        assert_eq!(b.call_count(), 0);
    }

    #[tokio::test]
    async fn in_flight_request_is_abandoned_on_cancel() {
        let a = ScriptedBackend::new("a")
            .always(VALID)
            .with_delay(Duration::from_secs(30));
        let engine = InvocationEngine::builder().backend(a).build();
        let context = ToolContext::new();
        let token = context.cancellation().clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            engine.invoke(&explain_request(0), &context),
        )
        .await
        .expect("cancellation should interrupt the request");
        assert!(matches!(result, Err(InvocationError::Cancelled { .. })));
    }

    #[tokio::test]
    async fn custom_corrective_message_is_sent() {
        let a = ScriptedBackend::new("a").reply("junk").reply(VALID);
        let engine = InvocationEngine::builder()
            .backend(a.clone())
            .corrective_message(|_| "JSON only, please.".to_string())
            .build();

        engine
            .invoke(&explain_request(1), &ToolContext::new())
            .await
            .unwrap();

        let second = &a.conversations()[1];
        assert_eq!(second.last().unwrap().content, "JSON only, please.");
    }

    #[test]
    fn request_serializes_schema_by_name() {
        let value = serde_json::to_value(explain_request(2)).unwrap();
        assert_eq!(
            value,
            json!({
                "prompt": "explain",
                "system_prompt": "sys",
                "schema": "triage_explanation",
                "max_retries": 2
            })
        );

        let bare = serde_json::to_value(InvocationRequest::new("p")).unwrap();
        assert_eq!(bare["schema"], json!(null));
    }

    #[test]
    fn from_config_without_credentials_is_offline() {
        let config = crate::LlmConfigBuilder::new().build().unwrap();
        assert!(InvocationEngine::from_config(&config).is_offline());

        let online = crate::LlmConfigBuilder::new()
            .use_stub_llm(false)
            .api_key("k")
            .build()
            .unwrap();
        let engine = InvocationEngine::from_config(&online);
        assert!(!engine.is_offline());
        assert_eq!(engine.backend_names(), vec!["http:gpt-4o-mini"]);
    }
}
