//! Callable tools exposed to the agent.

pub mod retrieval;
pub mod think;
pub mod web_search;

use crate::chat::ToolSpec;
use crate::error::ToolError;
use crate::requirements::ToolName;
use async_trait::async_trait;
use serde_json::Value;

pub use retrieval::VectorStoreSearchTool;
pub use think::ThinkTool;
pub use web_search::DuckDuckGoSearchTool;

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> ToolName;

    fn description(&self) -> &str;

    /// JSON schema of the arguments object.
    fn parameters(&self) -> Value;

    async fn call(&self, arguments: &Value) -> Result<String, ToolError>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Reads a required string field from a tool's arguments.
pub(crate) fn required_str<'a>(
    tool: ToolName,
    arguments: &'a Value,
    field: &str,
) -> Result<&'a str, ToolError> {
    arguments
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ToolError::InvalidArguments {
            tool: tool.to_string(),
            details: format!("missing string field `{field}`"),
        })
}
