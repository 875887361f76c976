//! # Triagent Tools
//!
//! Tool dispatch for incident-triage agents.
//!
//! - [`ToolRegistry`]: name-indexed tools with a uniform async invocation
//!   contract and the boundary error envelope.
//! - [`wrap_sync`]: lifts a blocking function into that contract, running it
//!   on a bounded worker pool and normalizing its return shape.
//! - [`tool_fn`]: the same for async closures.
//! - [`register_default_tools`]: `triage`, `explain` and `runbook`.

/// Default incident-triage tools.
pub mod defaults;
/// Async closure tools.
pub mod fn_tool;
/// Name-indexed tool registry.
pub mod registry;
/// Blocking function adapter.
pub mod sync_adapter;

pub use defaults::{Score, register_default_tools};
pub use fn_tool::{FnTool, tool_fn};
pub use registry::ToolRegistry;
pub use sync_adapter::{BlockingPool, DEFAULT_MAX_BLOCKING, SyncTool, wrap_sync};
