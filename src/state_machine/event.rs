//! Events that can occur in a conversation

use crate::conversation::{Message, ToolResult};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    /// The model produced its next message
    ModelResponded { message: Message },

    /// One tool call of the round finished (successfully or not)
    ToolCompleted { result: ToolResult },

    /// The post-processor ran over the latest listing result
    PostProcessed { summary: Option<Message> },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::ModelResponded { .. } => "model_responded",
            Event::ToolCompleted { .. } => "tool_completed",
            Event::PostProcessed { .. } => "post_processed",
        }
    }
}
