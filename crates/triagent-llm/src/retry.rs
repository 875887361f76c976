//! Corrective retry against a single backend.
//!
//! [`RetryPolicy`] decides whether another attempt is allowed and what the
//! corrective message says. [`run_with_retries`] drives one backend through
//! that policy; choosing which backend to try next is the engine's job.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use triagent_core::{ToolContext, ToolOutput};

use crate::backend::LlmBackend;
use crate::conversation::{ChatMessage, Conversation};
use crate::engine::InvocationRequest;
use crate::error::{BackendError, OutputError};
use crate::output::parse_structured;

/// Builds the corrective user message from the reason the last reply failed.
pub type CorrectiveBuilder = Arc<dyn Fn(&OutputError) -> String + Send + Sync>;

/// Default corrective message.
pub fn default_corrective_message(error: &OutputError) -> String {
    match error {
        OutputError::Parse(_) => format!(
            "Your previous response was not valid JSON. Error: {error}. \
             Please respond with ONLY valid JSON, no markdown formatting or explanation."
        ),
        OutputError::Schema { .. } => format!(
            "Your previous response did not match the required format. Error: {error}. \
             Please respond with ONLY valid JSON in the requested format, no markdown \
             formatting or explanation."
        ),
    }
}

#[derive(Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    corrective: CorrectiveBuilder,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            corrective: Arc::new(default_corrective_message),
        }
    }

    pub fn with_corrective(mut self, corrective: CorrectiveBuilder) -> Self {
        self.corrective = corrective;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Total calls one backend may receive.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Whether a failed zero-based `attempt` may be followed by another.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    pub fn corrective_message(&self, error: &OutputError) -> String {
        (self.corrective)(error)
    }

    /// Append the rejected reply and the correction so the backend sees both.
    pub fn apply(&self, conversation: &mut Conversation, reply: String, error: &OutputError) {
        conversation.push(ChatMessage::assistant(reply));
        conversation.push(ChatMessage::user(self.corrective_message(error)));
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MAX_RETRIES)
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

/// How one backend's retry loop ended. `calls` counts requests sent.
#[derive(Debug)]
pub enum AttemptOutcome {
    Success { output: ToolOutput, calls: u32 },
    /// Every attempt produced unusable output.
    Exhausted { calls: u32, last_error: OutputError },
    /// The backend itself failed; not retried.
    Failed { calls: u32, error: BackendError },
    Cancelled { calls: u32 },
}

impl AttemptOutcome {
    pub fn calls(&self) -> u32 {
        match self {
            AttemptOutcome::Success { calls, .. }
            | AttemptOutcome::Exhausted { calls, .. }
            | AttemptOutcome::Failed { calls, .. }
            | AttemptOutcome::Cancelled { calls } => *calls,
        }
    }
}

/// Run `request` against one backend with corrective retries.
///
/// The conversation starts fresh and grows by one `(assistant, user)` pair
/// per retry. Cancellation is checked before each attempt and raced against
/// the in-flight request.
pub async fn run_with_retries(
    backend: &dyn LlmBackend,
    request: &InvocationRequest,
    policy: &RetryPolicy,
    context: &ToolContext,
) -> AttemptOutcome {
    let mut conversation = Conversation::new(request.system_prompt(), request.prompt());
    let mut attempt: u32 = 0;

    loop {
        if context.is_cancelled() {
            return AttemptOutcome::Cancelled { calls: attempt };
        }

        debug!(
            backend = %backend.name(),
            trace_id = %context.trace_id(),
            attempt,
            "Sending LLM request"
        );

        let calls = attempt + 1;
        let reply = tokio::select! {
            biased;
            _ = context.cancellation().cancelled() => {
                return AttemptOutcome::Cancelled { calls };
            }
            reply = backend.send(&conversation) => reply,
        };

        let reply = match reply {
            Ok(reply) => reply,
            Err(error) => return AttemptOutcome::Failed { calls, error },
        };

        match parse_structured(&reply, request.schema()) {
            Ok(output) => return AttemptOutcome::Success { output, calls },
            Err(error) => {
                warn!(
                    backend = %backend.name(),
                    trace_id = %context.trace_id(),
                    attempt,
                    error_code = error.error_code(),
                    error = %error,
                    "Invalid LLM output"
                );
                if !policy.should_retry(attempt) {
                    return AttemptOutcome::Exhausted {
                        calls,
                        last_error: error,
                    };
                }
                policy.apply(&mut conversation, reply, &error);
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;
    use crate::schema::triage_explanation;
    use crate::testing::ScriptedBackend;
    use triagent_core::CancellationToken;

    const VALID: &str = r#"{"explanation": "ok", "reasons": []}"#;

    fn request(max_retries: u32) -> InvocationRequest {
        InvocationRequest::new("explain")
            .with_system_prompt("sys")
            .with_schema(triage_explanation())
            .with_max_retries(max_retries)
    }

    #[test]
    fn policy_counts_attempts() {
        let policy = RetryPolicy::new(2);
        assert!(policy.should_retry(0));
        assert!(policy.should_retry(1));
        assert!(!policy.should_retry(2));
        assert_eq!(policy.max_attempts(), 3);
        assert!(!RetryPolicy::new(0).should_retry(0));
    }

    #[test]
    fn corrective_message_names_the_error() {
        let policy = RetryPolicy::new(1);
        let message = policy.corrective_message(&OutputError::Parse("expected value".into()));
        assert!(message.starts_with("Your previous response was not valid JSON."));
        assert!(message.contains("expected value"));

        let custom = RetryPolicy::new(1).with_corrective(Arc::new(|e| format!("fix: {e}")));
        assert_eq!(
            custom.corrective_message(&OutputError::Parse("x".into())),
            "fix: response is not valid JSON: x"
        );
    }

    #[tokio::test]
    async fn recovers_within_retry_budget() {
        let backend = ScriptedBackend::new("a").reply("nope").reply("{bad").reply(VALID);
        let outcome =
            run_with_retries(&backend, &request(2), &RetryPolicy::new(2), &ToolContext::new())
                .await;

        assert!(matches!(outcome, AttemptOutcome::Success { calls: 3, .. }));
        assert_eq!(backend.call_count(), 3);

        // Third call saw both earlier mistakes and corrections.
        let last = backend.conversations().pop().unwrap();
        assert_eq!(last.len(), 6);
        assert_eq!(last.messages()[2], ChatMessage::assistant("nope"));
        assert_eq!(last.messages()[3].role, Role::User);
        assert!(last.messages()[3].content.contains("not valid JSON"));
    }

    #[tokio::test]
    async fn exhausts_after_max_retries() {
        let backend = ScriptedBackend::new("a").always("not json");
        let outcome =
            run_with_retries(&backend, &request(1), &RetryPolicy::new(1), &ToolContext::new())
                .await;

        assert!(matches!(
            outcome,
            AttemptOutcome::Exhausted {
                calls: 2,
                last_error: OutputError::Parse(_)
            }
        ));
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn backend_errors_are_not_retried() {
        let backend =
            ScriptedBackend::new("a").fail(BackendError::RateLimited("quota".into()));
        let outcome =
            run_with_retries(&backend, &request(3), &RetryPolicy::new(3), &ToolContext::new())
                .await;

        assert!(matches!(outcome, AttemptOutcome::Failed { calls: 1, .. }));
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn cancellation_stops_between_attempts() {
        let token = CancellationToken::new();
        let backend = ScriptedBackend::new("a")
            .always("not json")
            .cancel_after(2, token.clone());
        let context = ToolContext::new().with_cancellation(token);

        let outcome = run_with_retries(&backend, &request(5), &RetryPolicy::new(5), &context).await;

        assert!(matches!(outcome, AttemptOutcome::Cancelled { calls: 2 }));
        assert_eq!(backend.call_count(), 2);
    }
}
