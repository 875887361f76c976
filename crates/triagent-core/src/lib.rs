//! # Triagent Core
//!
//! Core traits and types shared by every Triagent crate: the uniform async tool
//! contract, the result normalizer that canonicalizes heterogeneous return
//! shapes, the tool error taxonomy and the boundary error envelope.
//!
//! ## Tool contract
//!
//! Every tool, whether naturally async or lifted from a blocking function,
//! presents the same signature:
//!
//! ```text
//! (inputs: ToolInputs, context: &ToolContext) -> ToolResult<ToolOutput>
//! ```
//!
//! `ToolInputs` and `ToolOutput` are JSON object maps. `ToolContext` carries the
//! trace identifier, a cancellation token and free-form cross-cutting fields.

pub mod envelope;
pub mod error;
pub mod identifiers;
pub mod normalize;
pub mod tool;
pub mod triage;

pub use envelope::ToolEnvelope;
pub use error::{InputValidationError, ToolError, ToolResult};
pub use identifiers::{IdValidationError, ToolName};
pub use normalize::{IntoToolReturn, Structured, ToolReturn, normalize};
pub use tool::{Tool, ToolContext, ToolInputs, ToolOutput};
pub use triage::{ContributingFactor, SeverityLabel};

// Re-exported so downstream crates agree on one token type.
pub use tokio_util::sync::CancellationToken;
