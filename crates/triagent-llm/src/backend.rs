//! Backend abstraction.

use async_trait::async_trait;

use crate::conversation::Conversation;
use crate::error::BackendError;

/// One LLM provider integration.
///
/// Backends are stateless from the engine's point of view: the engine hands
/// over the whole conversation on every call and expects the raw text reply.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Name used in logs and provenance.
    fn name(&self) -> &str;

    /// Whether the backend can be used at all.
    ///
    /// Checked once when the engine is built. A backend that fails here is
    /// left out of the fallback order instead of being retried on every call.
    fn availability(&self) -> Result<(), BackendError> {
        Ok(())
    }

    /// Send the conversation and return the model's raw text reply.
    async fn send(&self, conversation: &Conversation) -> Result<String, BackendError>;
}
