//! Tool result routing

use crate::conversation::Message;
use crate::tools::GET_ACTIVITIES_IN_RANGE;

/// Where control goes after a tool result is appended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Through the deterministic post-processor first
    PostProcess,
    /// Straight back to the model
    Agent,
}

/// Route on tool identity only. Error payloads from the listing tool still
/// go through post-processing, whose own guard lets them pass untouched.
pub fn route(latest: &Message) -> Route {
    match latest {
        Message::ToolResult(result) if result.tool_name == GET_ACTIVITIES_IN_RANGE => {
            Route::PostProcess
        }
        _ => Route::Agent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::ToolResult;
    use crate::tools::{GET_ACTIVITY_INFORMATION, GET_ATHLETE_STATS, NO_ACTIVITIES};
    use proptest::prelude::*;

    fn result(name: &str, content: &str) -> Message {
        Message::tool_result(ToolResult::new("1", name, content))
    }

    #[test]
    fn test_listing_routes_to_post_process() {
        assert_eq!(route(&result(GET_ACTIVITIES_IN_RANGE, "...")), Route::PostProcess);
        assert_eq!(route(&result(GET_ACTIVITIES_IN_RANGE, NO_ACTIVITIES)), Route::PostProcess);
        assert_eq!(route(&result(GET_ACTIVITIES_IN_RANGE, "Error: boom")), Route::PostProcess);
    }

    #[test]
    fn test_other_results_route_to_agent() {
        assert_eq!(route(&result(GET_ATHLETE_STATS, "...")), Route::Agent);
        assert_eq!(route(&result(GET_ACTIVITY_INFORMATION, "{}")), Route::Agent);
        assert_eq!(route(&Message::system(GET_ACTIVITIES_IN_RANGE)), Route::Agent);
    }

    proptest! {
        #[test]
        fn prop_post_process_iff_listing(name in "[a-z_]{1,30}", content in ".{0,80}") {
            let routed = route(&result(&name, &content));
            prop_assert_eq!(routed == Route::PostProcess, name == GET_ACTIVITIES_IN_RANGE);
        }
    }
}
