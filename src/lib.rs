//! # Triagent
//!
//! Tool dispatch and resilient LLM invocation for incident-triage agents.
//!
//! This crate re-exports the workspace crates under one roof:
//!
//! - [`core`]: the tool contract, result normalization and error envelope
//! - [`tools`]: the registry, the blocking-function adapter and the default
//!   `triage`/`explain`/`runbook` tools
//! - [`llm`]: the invocation engine with corrective retries, backend
//!   fallback and deterministic stubs
//!
//! ```rust
//! use std::sync::Arc;
//! use triagent::{BlockingPool, InvocationEngine, ToolContext, ToolRegistry, SeverityLabel};
//! use triagent::tools::register_default_tools;
//!
//! # async fn run() {
//! let mut registry = ToolRegistry::new();
//! register_default_tools(
//!     &mut registry,
//!     Arc::new(InvocationEngine::offline()),
//!     |_features: serde_json::Map<String, serde_json::Value>| {
//!         Ok::<_, String>((SeverityLabel::Low, 0.0, vec![]))
//!     },
//!     BlockingPool::default(),
//! )
//! .unwrap();
//!
//! let envelope = registry
//!     .invoke_enveloped("runbook", Default::default(), &ToolContext::new())
//!     .await;
//! assert!(envelope.is_success());
//! # }
//! ```

pub use triagent_core as core;
pub use triagent_llm as llm;
pub use triagent_tools as tools;

pub use triagent_core::{
    CancellationToken, ContributingFactor, SeverityLabel, Tool, ToolContext, ToolEnvelope,
    ToolError, ToolInputs, ToolOutput, ToolResult,
};
pub use triagent_llm::{InvocationEngine, InvocationRequest, LlmBackend, StubRequest};
pub use triagent_tools::{BlockingPool, ToolRegistry, tool_fn, wrap_sync};
