//! System prompt construction
//!
//! The prompt carries today's date so relative ranges ("this week", "last
//! month") resolve to concrete dates before the model calls a tool.

use chrono::NaiveDate;

/// Rules for turning tool data into a direct answer
const ANSWER_RULES: &str = r#"CRITICAL: When a tool returns data, you MUST analyze it to answer the user's specific question directly.
- If the user asks "How many", count the items in the data that match the criteria. A SYSTEM ANALYSIS message, when present, holds the exact counts.
- If the user asks for the "best", "longest", or "fastest" activity (or multiple candidates), first find the candidate(s) in the list, then fetch their full details using get_activity_information.
- Dates passed to tools use the YYYY-MM-DD format; end dates are inclusive.
- Do NOT simply summarize the data or ask the user what to do next. Just give the answer."#;

/// Build the system prompt for a conversation started on `today`
pub fn build_system_prompt(today: NaiveDate) -> String {
    format!(
        "You are a helpful assistant capable of analyzing Strava activity data.\nToday is {}.\n\n{ANSWER_RULES}\n",
        today.format("%Y-%m-%d")
    )
}

/// System prompt dated with the local calendar day
pub fn system_prompt_for_today() -> String {
    build_system_prompt(chrono::Local::now().date_naive())
}
