//! # Scripted Backend for Testing
//!
//! A backend that replays canned replies in order and records every
//! conversation it receives, so retry and fallback behaviour can be asserted
//! without a network.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use triagent_core::CancellationToken;

use crate::backend::LlmBackend;
use crate::conversation::Conversation;
use crate::error::BackendError;

type Reply = Result<String, BackendError>;

/// A backend that replays scripted replies.
///
/// Clones share the script and the call history, so a test can keep one
/// handle and give another to the engine.
#[derive(Debug, Clone)]
pub struct ScriptedBackend {
    name: String,
    script: Arc<Mutex<VecDeque<Reply>>>,
    default_reply: Option<Reply>,
    unavailable: Option<String>,
    delay: Option<Duration>,
    cancel_after: Option<(usize, CancellationToken)>,
    call_history: Arc<Mutex<Vec<Conversation>>>,
}

impl ScriptedBackend {
    /// Create a new scripted backend with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Arc::new(Mutex::new(VecDeque::new())),
            default_reply: None,
            unavailable: None,
            delay: None,
            cancel_after: None,
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a text reply
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.script.lock().unwrap().push_back(Ok(text.into()));
        self
    }

    /// Queue a backend failure
    pub fn fail(self, error: BackendError) -> Self {
        self.script.lock().unwrap().push_back(Err(error));
        self
    }

    /// Reply with `text` once the script runs out
    pub fn always(mut self, text: impl Into<String>) -> Self {
        self.default_reply = Some(Ok(text.into()));
        self
    }

    /// Fail with `error` once the script runs out
    pub fn always_fail(mut self, error: BackendError) -> Self {
        self.default_reply = Some(Err(error));
        self
    }

    /// Report the backend as unavailable at construction time
    pub fn unavailable(mut self, reason: impl Into<String>) -> Self {
        self.unavailable = Some(reason.into());
        self
    }

    /// Sleep before every reply
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Cancel `token` as the `n`th call completes
    pub fn cancel_after(mut self, n: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((n, token));
        self
    }

    /// Get the number of times this backend has been called
    pub fn call_count(&self) -> usize {
        self.call_history.lock().unwrap().len()
    }

    /// Get every conversation sent to this backend, oldest first
    pub fn conversations(&self) -> Vec<Conversation> {
        self.call_history.lock().unwrap().clone()
    }

    /// Reset call history
    pub fn reset(&self) {
        self.call_history.lock().unwrap().clear();
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn availability(&self) -> Result<(), BackendError> {
        match &self.unavailable {
            Some(reason) => Err(BackendError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }

    async fn send(&self, conversation: &Conversation) -> Result<String, BackendError> {
        let call = {
            let mut history = self.call_history.lock().unwrap();
            history.push(conversation.clone());
            history.len()
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| self.default_reply.clone())
            .unwrap_or_else(|| Err(BackendError::Transport("script exhausted".into())));

        if let Some((n, token)) = &self.cancel_after {
            if call == *n {
                token.cancel();
            }
        }

        reply
    }
}
