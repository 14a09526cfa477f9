//! Conversation controller state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions: the
//! transition function decides, the runtime performs the effects.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::ConvState;
pub use transition::{transition, TransitionError, TransitionResult};

/// Mermaid flowchart of the controller graph
pub fn diagram() -> &'static str {
    "flowchart TD
    start([start]) --> agent
    agent[agent: Reasoning] -->|tool calls| tools[tools: Dispatching]
    agent -->|plain answer| done([Done])
    tools -->|get_activities_in_range| post_process[post_process: PostProcessing]
    tools -->|other tools, round complete| agent
    tools -->|results pending| tools
    post_process -->|round complete| agent
    post_process -->|results pending| tools"
}
