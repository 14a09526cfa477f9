//! Effects produced by state transitions

use crate::conversation::{Message, ToolCall};

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Append a message to the conversation history
    AppendMessage(Message),

    /// Ask the model for its next message
    RequestModel,

    /// Run every call concurrently, reporting each as `ToolCompleted`
    DispatchTools { calls: Vec<ToolCall> },

    /// Run the post-processor over this tool result message
    PostProcess { latest: Message },

    /// Surface the final answer to the caller
    Finish { answer: String },
}

impl Effect {
    pub fn append(message: Message) -> Self {
        Effect::AppendMessage(message)
    }

    pub fn dispatch(calls: Vec<ToolCall>) -> Self {
        Effect::DispatchTools { calls }
    }
}
