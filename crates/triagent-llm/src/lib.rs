//! # Triagent LLM
//!
//! Resilient structured-output invocation for tools that depend on a remote
//! model.
//!
//! A call to [`InvocationEngine::invoke`] tries each configured backend in
//! order. Malformed or schema-violating replies are retried against the same
//! backend with a corrective re-prompt; backend failures move on to the next
//! backend; when nothing works (or the LLM is switched off) a deterministic
//! stub answers instead. Only cancellation is reported as an error.
//!
//! ```rust,no_run
//! use triagent_core::{SeverityLabel, ToolContext};
//! use triagent_llm::{InvocationEngine, InvocationRequest, StubRequest, schema};
//!
//! # async fn run() -> Result<(), triagent_llm::InvocationError> {
//! let engine = InvocationEngine::offline();
//! let request = InvocationRequest::new("Generate a runbook")
//!     .with_schema(schema::runbook_response())
//!     .with_stub(StubRequest::Runbook {
//!         label: SeverityLabel::High,
//!         factors: vec![],
//!     });
//!
//! let result = engine.invoke(&request, &ToolContext::new()).await?;
//! assert!(result.is_stub());
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod chains;
pub mod config;
pub mod conversation;
pub mod engine;
pub mod error;
pub mod http;
pub mod output;
pub mod response;
pub mod retry;
pub mod schema;
pub mod stub;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use backend::LlmBackend;
pub use chains::{ReferenceRunbook, explain_incident, generate_runbook};
pub use config::{ConfigError, LlmConfig, LlmConfigBuilder};
pub use conversation::{ChatMessage, Conversation, Role};
pub use engine::{
    EngineBuilder, Invocation, InvocationEngine, InvocationRequest, LlmMode, Provenance, StubReason,
};
pub use error::{BackendError, InvocationError, InvocationResult, OutputError, SchemaError};
pub use http::HttpChatBackend;
pub use output::parse_structured;
pub use response::{Explanation, Risk, Runbook, RunbookStep};
pub use retry::{AttemptOutcome, CorrectiveBuilder, RetryPolicy, run_with_retries};
pub use schema::OutputSchema;
pub use stub::{StubRequest, stub_explanation, stub_runbook};
