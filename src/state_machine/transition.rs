//! Pure state transition function

use super::{ConvState, Effect, Event};
use crate::conversation::{Message, ToolCall};
use crate::router::{route, Route};
use std::collections::HashSet;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConvState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConvState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }

    fn with_effect_first(self, effect: Effect) -> Self {
        self.with_effects_first(std::iter::once(effect))
    }

    /// Prepend effects so appends land before follow-up work
    fn with_effects_first(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        let mut head: Vec<Effect> = effects.into_iter().collect();
        head.append(&mut self.effects);
        self.effects = head;
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Turn already finished")]
    Terminal,
    #[error("Tool result for unknown or already answered call '{0}'")]
    UnexpectedToolResult(String),
    #[error("Model reused tool call id '{0}' within one message")]
    DuplicateToolCallId(String),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs; all I/O is
/// described by the returned effects.
pub fn transition(state: &ConvState, event: Event) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        (ConvState::Done, _) => Err(TransitionError::Terminal),

        // Reasoning + ModelResponded -> Done | Dispatching
        (ConvState::Reasoning, Event::ModelResponded { message }) => {
            if !matches!(message, Message::Assistant { .. }) {
                return Err(TransitionError::InvalidTransition(format!(
                    "model produced a {} message",
                    message.role()
                )));
            }

            let tool_calls = message.tool_calls();
            if tool_calls.is_empty() {
                let answer = message.content().to_string();
                return Ok(TransitionResult::new(ConvState::Done)
                    .with_effect(Effect::append(message))
                    .with_effect(Effect::Finish { answer }));
            }

            if let Some(id) = first_duplicate_id(tool_calls) {
                return Err(TransitionError::DuplicateToolCallId(id.to_string()));
            }

            let calls = tool_calls.to_vec();
            let pending = calls.iter().map(|c| c.id.clone()).collect();
            Ok(TransitionResult::new(ConvState::Dispatching { pending })
                .with_effect(Effect::append(message))
                .with_effect(Effect::dispatch(calls)))
        }

        // Dispatching + ToolCompleted -> PostProcessing | Reasoning | Dispatching
        (ConvState::Dispatching { pending }, Event::ToolCompleted { result }) => {
            let Some(pos) = pending.iter().position(|id| *id == result.tool_call_id) else {
                return Err(TransitionError::UnexpectedToolResult(result.tool_call_id));
            };
            let mut remaining = pending.clone();
            remaining.remove(pos);

            let message = Message::tool_result(result);
            match route(&message) {
                Route::PostProcess => Ok(TransitionResult::new(ConvState::PostProcessing {
                    pending: remaining,
                })
                .with_effect(Effect::append(message.clone()))
                .with_effect(Effect::PostProcess { latest: message })),
                Route::Agent => Ok(after_result(remaining).with_effect_first(Effect::append(message))),
            }
        }

        // PostProcessing + PostProcessed -> Reasoning | Dispatching
        (ConvState::PostProcessing { pending }, Event::PostProcessed { summary }) => {
            Ok(after_result(pending.clone())
                .with_effects_first(summary.into_iter().map(Effect::append)))
        }

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "{} cannot handle {}",
            state.name(),
            event.name()
        ))),
    }
}

fn first_duplicate_id(calls: &[ToolCall]) -> Option<&str> {
    let mut seen = HashSet::with_capacity(calls.len());
    calls
        .iter()
        .map(|c| c.id.as_str())
        .find(|id| !seen.insert(*id))
}

/// Back to the model once the round is complete, otherwise keep waiting
fn after_result(remaining: Vec<String>) -> TransitionResult {
    if remaining.is_empty() {
        TransitionResult::new(ConvState::Reasoning).with_effect(Effect::RequestModel)
    } else {
        TransitionResult::new(ConvState::Dispatching { pending: remaining })
    }
}
