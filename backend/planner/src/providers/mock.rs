use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use ledgerforge_core::{ConversationTurn, ModelGateway, ModelReply, ToolSpec};

enum Scripted {
    Reply(ModelReply),
    Failure(String),
}

/// A gateway that plays back queued replies in order.
///
/// Once the script runs out it answers with a fixed text, so it also works as
/// an offline provider for local runs. Every transcript it receives is kept
/// for inspection.
pub struct ScriptedGateway {
    name: String,
    script: Mutex<VecDeque<Scripted>>,
    fallback: String,
    calls: AtomicUsize,
    seen: Mutex<Vec<Vec<ConversationTurn>>>,
}

impl Default for ScriptedGateway {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ScriptedGateway {
    pub fn new(replies: Vec<ModelReply>) -> Self {
        Self {
            name: "mock".into(),
            script: Mutex::new(replies.into_iter().map(Scripted::Reply).collect()),
            fallback: "Mock response".into(),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Queue a provider error for the next unanswered call.
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.lock_script().push_back(Scripted::Failure(message.into()));
        self
    }

    pub fn then_reply(self, reply: ModelReply) -> Self {
        self.lock_script().push_back(Scripted::Reply(reply));
        self
    }

    pub fn with_fallback(mut self, text: impl Into<String>) -> Self {
        self.fallback = text.into();
        self
    }

    /// Number of `generate` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Transcripts received, one per call.
    pub fn transcripts(&self) -> Vec<Vec<ConversationTurn>> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<Scripted>> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, transcript: &[ConversationTurn], _catalog: &[ToolSpec]) -> Result<ModelReply> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(transcript.to_vec());

        match self.lock_script().pop_front() {
            Some(Scripted::Reply(reply)) => Ok(reply),
            Some(Scripted::Failure(message)) => Err(anyhow!(message)),
            None => Ok(ModelReply::text(self.fallback.clone())),
        }
    }
}
