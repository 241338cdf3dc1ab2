use super::{required_str, Tool};
use crate::error::ToolError;
use crate::requirements::ToolName;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Scratchpad for planning. Has no side effects.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThinkTool;

#[async_trait]
impl Tool for ThinkTool {
    fn name(&self) -> ToolName {
        ToolName::Think
    }

    fn description(&self) -> &str {
        "Use when you want to think through a problem, clarify your assumptions, or break down complex steps before acting or responding."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "thoughts": {
                    "type": "string",
                    "description": "Precisely describe what you are thinking about."
                },
                "next_step": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Describe the tools you would need to use next and why."
                }
            },
            "required": ["thoughts"]
        })
    }

    async fn call(&self, arguments: &Value) -> Result<String, ToolError> {
        required_str(self.name(), arguments, "thoughts")?;
        Ok("OK".to_string())
    }
}
