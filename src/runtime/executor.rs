//! Conversation runtime executor

use super::{AgentError, RuntimeConfig};
use crate::conversation::{Conversation, ToolCall, ToolResult};
use crate::llm::{LlmRequest, LlmResponse, LlmService, ToolDefinition};
use crate::post_process;
use crate::state_machine::{transition, ConvState, Effect, Event};
use crate::tools::{ToolExecutor, ERROR_MARKER};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

type ToolFuture = Pin<Box<dyn Future<Output = ToolResult> + Send>>;

/// Drives one conversation turn at a time through the state machine.
///
/// The runtime holds no conversation state of its own; history is owned by
/// the caller and passed in per turn.
pub struct ConversationRuntime<L, T>
where
    L: LlmService + 'static,
    T: ToolExecutor + 'static,
{
    llm_client: Arc<L>,
    tool_executor: Arc<T>,
    /// Tool set bound once, sent with every model request
    tools: Vec<ToolDefinition>,
    config: RuntimeConfig,
}

impl<L, T> ConversationRuntime<L, T>
where
    L: LlmService + 'static,
    T: ToolExecutor + 'static,
{
    pub fn new(llm_client: Arc<L>, tool_executor: Arc<T>, config: RuntimeConfig) -> Self {
        let tools = tool_executor.definitions();
        Self {
            llm_client,
            tool_executor,
            tools,
            config,
        }
    }

    pub fn model_id(&self) -> &str {
        self.llm_client.model_id()
    }

    /// Run rounds until the model answers without tool calls.
    ///
    /// Messages are appended to `conversation` as the turn progresses. On
    /// error the turn is abandoned part-way; callers that need all-or-nothing
    /// semantics run against a copy.
    pub async fn run(&self, conversation: &mut Conversation) -> Result<String, AgentError> {
        if !conversation.ready_for_model() {
            return Err(AgentError::NotReady);
        }

        let mut state = ConvState::Reasoning;
        let mut effects = VecDeque::from([Effect::RequestModel]);
        let mut in_flight: FuturesUnordered<ToolFuture> = FuturesUnordered::new();
        let mut rounds = 0usize;

        loop {
            while let Some(effect) = effects.pop_front() {
                let event = match effect {
                    Effect::AppendMessage(message) => {
                        conversation.push(message);
                        continue;
                    }
                    Effect::RequestModel => {
                        if rounds >= self.config.max_rounds {
                            tracing::warn!(rounds, "Round limit reached without a final answer");
                            return Err(AgentError::RoundLimit(rounds));
                        }
                        rounds += 1;
                        let response = self.request_model(conversation).await?;
                        Event::ModelResponded {
                            message: response.into_message(),
                        }
                    }
                    Effect::DispatchTools { calls } => {
                        tracing::info!(count = calls.len(), "Dispatching tool calls");
                        for call in calls {
                            in_flight.push(self.spawn_tool(call));
                        }
                        continue;
                    }
                    Effect::PostProcess { latest } => Event::PostProcessed {
                        summary: post_process::process(&latest),
                    },
                    Effect::Finish { answer } => {
                        tracing::debug!(messages = conversation.len(), "Turn finished");
                        return Ok(answer);
                    }
                };
                apply(&mut state, &mut effects, event)?;
            }

            // Effects drained: the only thing left to wait on is tool work.
            tracing::debug!(pending = state.pending().len(), "Waiting for tool results");
            let Some(result) = in_flight.next().await else {
                return Err(AgentError::Stalled(state.name()));
            };
            apply(&mut state, &mut effects, Event::ToolCompleted { result })?;
        }
    }

    async fn request_model(&self, conversation: &Conversation) -> Result<LlmResponse, AgentError> {
        let request = LlmRequest {
            messages: conversation.messages().to_vec(),
            tools: self.tools.clone(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };
        Ok(self.llm_client.complete(&request).await?)
    }

    /// Run a tool call on its own task so calls in the same round overlap.
    /// A panicking tool still produces a result for its id.
    fn spawn_tool(&self, call: ToolCall) -> ToolFuture {
        let executor = Arc::clone(&self.tool_executor);
        Box::pin(async move {
            let task_call = call.clone();
            let handle = tokio::spawn(async move { executor.execute(&task_call).await });
            match handle.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(tool = %call.name, id = %call.id, error = %e, "Tool task failed");
                    ToolResult::new(call.id, call.name, format!("{ERROR_MARKER} tool task failed: {e}"))
                }
            }
        })
    }
}

fn apply(state: &mut ConvState, effects: &mut VecDeque<Effect>, event: Event) -> Result<(), AgentError> {
    let event_name = event.name();
    let result = transition(state, event)?;
    tracing::debug!(
        from = state.name(),
        to = result.new_state.name(),
        event = event_name,
        "State transition"
    );
    *state = result.new_state;
    effects.extend(result.effects);
    Ok(())
}
