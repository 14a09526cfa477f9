//! Conversation state types

use serde::{Deserialize, Serialize};

/// Controller state for one user turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConvState {
    /// Waiting on (or about to ask) the model
    #[default]
    Reasoning,

    /// Tool calls of the current round are running
    Dispatching {
        /// Correlation ids still waiting for a result, in request order
        pending: Vec<String>,
    },

    /// A listing result was appended and is being summarized
    PostProcessing {
        /// Correlation ids of the round still waiting for a result
        pending: Vec<String>,
    },

    /// The model answered without tool calls
    Done,
}

impl ConvState {
    /// Results still outstanding in the current round
    pub fn pending(&self) -> &[String] {
        match self {
            ConvState::Dispatching { pending } | ConvState::PostProcessing { pending } => pending,
            ConvState::Reasoning | ConvState::Done => &[],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConvState::Reasoning => "reasoning",
            ConvState::Dispatching { .. } => "dispatching",
            ConvState::PostProcessing { .. } => "post_processing",
            ConvState::Done => "done",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_with_type_tag() {
        let state = ConvState::Dispatching {
            pending: vec!["a".into()],
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["type"], "dispatching");
        assert_eq!(json["pending"][0], "a");
        assert_eq!(serde_json::from_value::<ConvState>(json).unwrap(), state);
    }

    #[test]
    fn test_pending_ids() {
        assert_eq!(ConvState::default(), ConvState::Reasoning);
        assert!(ConvState::Done.pending().is_empty());
        let state = ConvState::PostProcessing {
            pending: vec!["b".into()],
        };
        assert_eq!(state.pending(), ["b".to_string()]);
    }
}
