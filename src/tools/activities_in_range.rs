//! Activity listing by date range
//!
//! Returns one JSON object per line so the payload can be post-processed
//! line by line.

use super::{km, Tool, ToolContext, ToolOutput, GET_ACTIVITIES_IN_RANGE, NO_ACTIVITIES};
use crate::strava::Activity;
use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Deserialize)]
struct RangeInput {
    start_date: String,
    end_date: String,
}

/// Summary line emitted for each activity
#[derive(Debug, Serialize)]
struct ActivityLine<'a> {
    id: u64,
    name: &'a str,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    activity_type: Option<&'a str>,
    distance_km: f64,
    start_date: &'a str,
}

impl<'a> From<&'a Activity> for ActivityLine<'a> {
    fn from(activity: &'a Activity) -> Self {
        Self {
            id: activity.id,
            name: &activity.name,
            activity_type: activity.kind(),
            distance_km: km(activity.distance.unwrap_or_default()),
            start_date: &activity.start_date_local,
        }
    }
}

/// Unix-second bounds for an inclusive `[start, end]` day range (UTC)
fn range_bounds(input: &RangeInput) -> Result<(i64, i64), String> {
    let start = NaiveDate::parse_from_str(input.start_date.trim(), DATE_FORMAT)
        .map_err(|e| format!("invalid start_date '{}' (expected YYYY-MM-DD): {e}", input.start_date))?;
    let end = NaiveDate::parse_from_str(input.end_date.trim(), DATE_FORMAT)
        .map_err(|e| format!("invalid end_date '{}' (expected YYYY-MM-DD): {e}", input.end_date))?;

    if end < start {
        return Err(format!(
            "end_date {end} is before start_date {start}"
        ));
    }

    let day_after_end = end
        .checked_add_days(Days::new(1))
        .ok_or_else(|| format!("end_date {end} is out of range"))?;

    let after = start.and_hms_opt(0, 0, 0).map(|t| t.and_utc().timestamp());
    let before = day_after_end.and_hms_opt(0, 0, 0).map(|t| t.and_utc().timestamp());

    match (after, before) {
        (Some(after), Some(before)) => Ok((after, before)),
        _ => Err("date range could not be converted to timestamps".to_string()),
    }
}

/// Date-range activity listing
pub struct ActivitiesInRangeTool;

#[async_trait]
impl Tool for ActivitiesInRangeTool {
    fn name(&self) -> &'static str {
        GET_ACTIVITIES_IN_RANGE
    }

    fn description(&self) -> String {
        "Fetch activities between a start and end date (both inclusive). Returns one JSON object per line with id, name, type, distance_km and start_date. For detailed metrics like speed or elapsed time, call get_activity_information with the ID.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["start_date", "end_date"],
            "properties": {
                "start_date": {
                    "type": "string",
                    "description": "The start date in 'YYYY-MM-DD' format"
                },
                "end_date": {
                    "type": "string",
                    "description": "The end date in 'YYYY-MM-DD' format"
                }
            }
        })
    }

    async fn run(&self, input: Value, ctx: ToolContext) -> ToolOutput {
        let input: RangeInput = match serde_json::from_value(input) {
            Ok(i) => i,
            Err(e) => return ToolOutput::error(format!("Invalid input: {e}")),
        };

        let (after, before) = match range_bounds(&input) {
            Ok(bounds) => bounds,
            Err(e) => return ToolOutput::error(e),
        };

        let activities = match ctx.api.activities_between(after, before).await {
            Ok(a) => a,
            Err(e) => return ToolOutput::error(e),
        };

        if activities.is_empty() {
            return ToolOutput::success(NO_ACTIVITIES);
        }

        let mut lines = Vec::with_capacity(activities.len());
        for activity in &activities {
            match serde_json::to_string(&ActivityLine::from(activity)) {
                Ok(line) => lines.push(line),
                Err(e) => return ToolOutput::error(format!("Failed to encode activity {}: {e}", activity.id)),
            }
        }

        ToolOutput::success(lines.join("\n"))
    }
}
