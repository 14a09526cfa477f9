//! Strava data tools exposed to the model
//!
//! Tools are stateless; the API handle arrives through [`ToolContext`]. Every
//! execution passes a single shared admission gate so the number of
//! concurrent upstream calls never exceeds the configured limit.

mod activities_in_range;
mod activity_information;
mod athlete_stats;

pub use activities_in_range::ActivitiesInRangeTool;
pub use activity_information::ActivityInformationTool;
pub use athlete_stats::AthleteStatsTool;

use crate::conversation::{ToolCall, ToolResult};
use crate::llm::ToolDefinition;
use crate::strava::StravaApi;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Semaphore;

pub const GET_ATHLETE_STATS: &str = "get_athlete_stats";
pub const GET_ACTIVITIES_IN_RANGE: &str = "get_activities_in_range";
pub const GET_ACTIVITY_INFORMATION: &str = "get_activity_information";

/// Prefix of every failure payload handed back to the model
pub const ERROR_MARKER: &str = "Error:";

/// Payload returned by `get_activities_in_range` for an empty result set
pub const NO_ACTIVITIES: &str = "No activities found in this range.";

/// Default number of tool executions allowed in flight at once
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Result from tool execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    pub output: String,
}

impl ToolOutput {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    /// Failure payload, always starting with [`ERROR_MARKER`]
    pub fn error(message: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            output: format!("{ERROR_MARKER} {message}"),
        }
    }
}

/// Whether a tool payload reports a failure
pub fn is_error_payload(payload: &str) -> bool {
    payload.trim_start().starts_with(ERROR_MARKER)
}

/// All context needed for a tool invocation.
#[derive(Clone)]
pub struct ToolContext {
    pub api: Arc<dyn StravaApi>,
}

impl ToolContext {
    pub fn new(api: Arc<dyn StravaApi>) -> Self {
        Self { api }
    }
}

/// Trait for tools that can be executed by the agent
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name
    fn name(&self) -> &str;

    /// Tool description for LLM
    fn description(&self) -> String;

    /// JSON schema for tool input
    fn input_schema(&self) -> Value;

    /// Validate `input` and perform the call. Failures are reported through
    /// [`ToolOutput::error`], never as a panic.
    async fn run(&self, input: Value, ctx: ToolContext) -> ToolOutput;
}

/// Executes tool calls requested by the model
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute one call, always producing exactly one result for its id
    async fn execute(&self, call: &ToolCall) -> ToolResult;

    /// Get tool definitions for LLM
    fn definitions(&self) -> Vec<ToolDefinition>;
}

#[async_trait]
impl<T: ToolExecutor + ?Sized> ToolExecutor for Arc<T> {
    async fn execute(&self, call: &ToolCall) -> ToolResult {
        (**self).execute(call).await
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        (**self).definitions()
    }
}

/// Collection of tools available to the model
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    ctx: ToolContext,
    admission: Arc<Semaphore>,
    limit: usize,
}

impl ToolRegistry {
    /// Registry with the three Strava tools
    pub fn strava(api: Arc<dyn StravaApi>, concurrency: usize) -> Self {
        Self::with_tools(
            vec![
                Arc::new(AthleteStatsTool),
                Arc::new(ActivitiesInRangeTool),
                Arc::new(ActivityInformationTool),
            ],
            ToolContext::new(api),
            concurrency,
        )
    }

    /// Registry over an explicit tool set.
    ///
    /// Later tools with an already registered name are dropped so names stay
    /// unique.
    pub fn with_tools(tools: Vec<Arc<dyn Tool>>, ctx: ToolContext, concurrency: usize) -> Self {
        let mut unique: Vec<Arc<dyn Tool>> = Vec::with_capacity(tools.len());
        for tool in tools {
            if unique.iter().any(|t| t.name() == tool.name()) {
                tracing::warn!(tool = tool.name(), "Duplicate tool name ignored");
                continue;
            }
            unique.push(tool);
        }

        let limit = concurrency.max(1);
        Self {
            tools: unique,
            ctx,
            admission: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    /// Admission limit shared by all executions
    pub fn concurrency_limit(&self) -> usize {
        self.limit
    }

    /// Look up a tool by name
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    /// Run a resolved tool once a slot in the admission gate is free
    pub async fn invoke(&self, tool: &dyn Tool, input: Value) -> ToolOutput {
        let Ok(_permit) = self.admission.acquire().await else {
            return ToolOutput::error("tool execution is shutting down");
        };
        tool.run(input, self.ctx.clone()).await
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    async fn execute(&self, call: &ToolCall) -> ToolResult {
        let output = match self.resolve(&call.name) {
            Some(tool) => self.invoke(tool.as_ref(), call.arguments.clone()).await,
            None => ToolOutput::error(format!("Tool '{}' not found", call.name)),
        };

        if output.success {
            tracing::debug!(tool = %call.name, id = %call.id, "Tool completed");
        } else {
            tracing::warn!(tool = %call.name, id = %call.id, output = %output.output, "Tool failed");
        }

        ToolResult::new(call.id.clone(), call.name.clone(), output.output)
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description(),
                input_schema: t.input_schema(),
            })
            .collect()
    }
}

/// Convert meters to kilometers
pub(crate) fn km(meters: f64) -> f64 {
    meters / 1000.0
}
