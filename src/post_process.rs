//! Deterministic summary of activity listings
//!
//! Models miscount when asked to tally raw JSON lines. After an activity
//! listing arrives, the totals are computed here and injected into history as
//! a system message the model can rely on.

use crate::conversation::Message;
use crate::tools::{is_error_payload, GET_ACTIVITIES_IN_RANGE, NO_ACTIVITIES};
use indexmap::IndexMap;
use serde_json::Value;

const UNKNOWN_TYPE: &str = "Unknown";

/// Counts derived from an activity listing payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityTally {
    pub total: usize,
    /// Count per activity type, in first-seen order
    pub by_type: IndexMap<String, usize>,
}

impl ActivityTally {
    /// Tally one JSON record per line. Lines that are not JSON objects are
    /// skipped.
    pub fn from_payload(payload: &str) -> Self {
        let mut tally = Self::default();

        for line in payload.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let Ok(Value::Object(record)) = serde_json::from_str::<Value>(line) else {
                tracing::debug!(line = %line, "Skipping malformed activity line");
                continue;
            };

            let kind = match record.get("type") {
                Some(Value::String(s)) if !s.is_empty() => s.clone(),
                Some(Value::Null | Value::String(_)) | None => UNKNOWN_TYPE.to_string(),
                Some(other) => other.to_string(),
            };

            tally.total += 1;
            *tally.by_type.entry(kind).or_insert(0) += 1;
        }

        tally
    }

    /// `Run: 2, Ride: 1`
    pub fn breakdown(&self) -> String {
        self.by_type
            .iter()
            .map(|(kind, count)| format!("{kind}: {count}"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn to_message(&self) -> Message {
        Message::system(format!(
            "SYSTEM ANALYSIS: The tool returned {} activities. Breakdown: {}. The full list with IDs is available in the context above for specific inquiries.",
            self.total,
            self.breakdown()
        ))
    }
}

/// Whether a listing payload carries records worth summarizing
fn has_activities(payload: &str) -> bool {
    !payload.contains(NO_ACTIVITIES) && !is_error_payload(payload)
}

/// Derive the synthetic summary for `latest`, if it is an activity listing
pub fn process(latest: &Message) -> Option<Message> {
    let Message::ToolResult(result) = latest else {
        return None;
    };

    if result.tool_name != GET_ACTIVITIES_IN_RANGE || !has_activities(&result.content) {
        return None;
    }

    let tally = ActivityTally::from_payload(&result.content);
    tracing::info!(
        total = tally.total,
        breakdown = %tally.breakdown(),
        "Injecting activity analysis"
    );
    Some(tally.to_message())
}
