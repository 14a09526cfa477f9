//! Lifetime statistics tool

use super::{km, Tool, ToolContext, ToolOutput, GET_ATHLETE_STATS};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Lifetime totals for the authenticated athlete
pub struct AthleteStatsTool;

#[async_trait]
impl Tool for AthleteStatsTool {
    fn name(&self) -> &'static str {
        GET_ATHLETE_STATS
    }

    fn description(&self) -> String {
        "Fetch the authenticated athlete's lifetime statistics. Useful for all-time totals (like total run distance) or personal records (like biggest ride). Do NOT use this for questions about specific activities or time-bound queries like 'this year' or 'last week'.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn run(&self, _input: Value, ctx: ToolContext) -> ToolOutput {
        let athlete = match ctx.api.athlete().await {
            Ok(athlete) => athlete,
            Err(e) => return ToolOutput::error(e),
        };

        match ctx.api.athlete_stats(athlete.id).await {
            // Units are converted here so the model never has to.
            Ok(stats) => ToolOutput::success(format!(
                "Biggest Ride: {:.2}km. All-time Run Distance: {:.2}km. All-time Ride Distance: {:.2}km.",
                km(stats.biggest_ride_distance.unwrap_or_default()),
                km(stats.all_run_totals.distance),
                km(stats.all_ride_totals.distance),
            )),
            Err(e) => ToolOutput::error(e),
        }
    }
}
