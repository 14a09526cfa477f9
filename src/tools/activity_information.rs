//! Single-activity detail lookup
//!
//! The model commonly requests this for several ids in one round; the
//! registry's admission gate bounds how many run at once.

use super::{km, Tool, ToolContext, ToolOutput, GET_ACTIVITY_INFORMATION};
use crate::strava::Activity;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

/// m/s to km/h
const MPS_TO_KMH: f64 = 3.6;

#[derive(Debug, Deserialize)]
struct DetailInput {
    #[serde(deserialize_with = "number_or_numeric_string")]
    activity_id: u64,
}

/// Models sometimes quote large ids; accept both forms.
fn number_or_numeric_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Number(u64),
        Text(String),
    }

    match Id::deserialize(deserializer)? {
        Id::Number(n) => Ok(n),
        Id::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("activity_id '{s}' is not a number"))),
    }
}

#[derive(Debug, Serialize)]
struct ActivityDetail<'a> {
    id: u64,
    name: &'a str,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    activity_type: Option<&'a str>,
    distance_km: f64,
    start_date: &'a str,
    elapsed_time_sec: u64,
    average_speed_kmh: f64,
}

impl<'a> From<&'a Activity> for ActivityDetail<'a> {
    fn from(activity: &'a Activity) -> Self {
        Self {
            id: activity.id,
            name: &activity.name,
            activity_type: activity.kind(),
            distance_km: km(activity.distance.unwrap_or_default()),
            start_date: &activity.start_date_local,
            elapsed_time_sec: activity.elapsed_time.unwrap_or_default(),
            average_speed_kmh: activity.average_speed.unwrap_or_default() * MPS_TO_KMH,
        }
    }
}

/// Detailed activity lookup
pub struct ActivityInformationTool;

#[async_trait]
impl Tool for ActivityInformationTool {
    fn name(&self) -> &'static str {
        GET_ACTIVITY_INFORMATION
    }

    fn description(&self) -> String {
        "Fetch detailed information about a specific activity by its ID, including elapsed time and average speed in km/h. Can be called in parallel for multiple activities.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["activity_id"],
            "properties": {
                "activity_id": {
                    "type": "integer",
                    "description": "The ID of the activity to fetch"
                }
            }
        })
    }

    async fn run(&self, input: Value, ctx: ToolContext) -> ToolOutput {
        let input: DetailInput = match serde_json::from_value(input) {
            Ok(i) => i,
            Err(e) => return ToolOutput::error(format!("Invalid input: {e}")),
        };

        let activity = match ctx.api.activity(input.activity_id).await {
            Ok(a) => a,
            Err(e) => return ToolOutput::error(e),
        };

        match serde_json::to_string(&ActivityDetail::from(&activity)) {
            Ok(json) => ToolOutput::success(json),
            Err(e) => ToolOutput::error(format!("Failed to encode activity {}: {e}", activity.id)),
        }
    }
}
