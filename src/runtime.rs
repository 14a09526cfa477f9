//! Runtime for executing conversations
//!
//! Interprets the effects produced by the state machine: model requests,
//! concurrent tool dispatch, post-processing and history appends.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::ConversationRuntime;

use crate::llm::LlmError;
use crate::state_machine::TransitionError;
use thiserror::Error;

/// Model requests allowed in one user turn
pub const DEFAULT_MAX_ROUNDS: usize = 25;

/// Generation settings bound for the lifetime of a runtime
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuntimeConfig {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Upper bound on model requests per turn
    pub max_rounds: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            temperature: None,
            max_tokens: None,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

/// Errors that abort a user turn
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("model request failed: {0}")]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("conversation must end with a system or user message before the model is asked")]
    NotReady,
    #[error("controller stalled in state '{0}' with no work in flight")]
    Stalled(&'static str),
    #[error("no final answer after {0} model requests")]
    RoundLimit(usize),
}

impl AgentError {
    /// Whether retrying the same turn may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            AgentError::Llm(e) => e.kind.is_retryable(),
            AgentError::Transition(_)
            | AgentError::NotReady
            | AgentError::Stalled(_)
            | AgentError::RoundLimit(_) => false,
        }
    }
}
