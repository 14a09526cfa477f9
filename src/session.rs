//! One user's chat session
//!
//! Owns the conversation history between turns. A turn is committed only when
//! it completes, so a failed turn never leaves a dangling user message behind.

use crate::conversation::Conversation;
use crate::db::{TranscriptRole, TranscriptSink};
use crate::llm::LlmService;
use crate::runtime::{AgentError, ConversationRuntime};
use crate::tools::ToolExecutor;
use std::sync::Arc;

pub struct Session<L, T>
where
    L: LlmService + 'static,
    T: ToolExecutor + 'static,
{
    id: String,
    conversation: Conversation,
    runtime: ConversationRuntime<L, T>,
    transcript: Arc<dyn TranscriptSink>,
}

impl<L, T> Session<L, T>
where
    L: LlmService + 'static,
    T: ToolExecutor + 'static,
{
    pub fn new(
        system_prompt: impl Into<String>,
        runtime: ConversationRuntime<L, T>,
        transcript: Arc<dyn TranscriptSink>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            conversation: Conversation::new(system_prompt),
            runtime,
            transcript,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Run one user turn and return the model's final answer.
    ///
    /// On error the history is left exactly as it was before the call and
    /// the question is recorded as failed, so the caller may ask again.
    pub async fn ask(&mut self, question: &str) -> Result<String, AgentError> {
        self.log(TranscriptRole::User, question);

        let mut staged = self.conversation.clone();
        staged.push_user(question);

        match self.runtime.run(&mut staged).await {
            Ok(answer) => {
                self.conversation = staged;
                self.log(TranscriptRole::Assistant, &answer);
                Ok(answer)
            }
            Err(e) => {
                tracing::warn!(session = %self.id, error = %e, "Turn failed, history unchanged");
                self.log(TranscriptRole::Failed, &e.to_string());
                Err(e)
            }
        }
    }

    fn log(&self, role: TranscriptRole, content: &str) {
        if let Err(e) = self.transcript.record(&self.id, role, content) {
            tracing::warn!(session = %self.id, role = %role, error = %e, "Transcript write failed");
        }
    }
}
