use super::{required_str, Tool};
use crate::error::ToolError;
use crate::requirements::ToolName;
use crate::store::VectorStore;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

/// Queries the knowledge base for chunks similar to the model's query.
pub struct VectorStoreSearchTool {
    store: Arc<dyn VectorStore>,
    top_k: usize,
}

impl VectorStoreSearchTool {
    pub fn new(store: Arc<dyn VectorStore>, top_k: usize) -> Self {
        Self {
            store,
            top_k: top_k.max(1),
        }
    }
}

#[async_trait]
impl Tool for VectorStoreSearchTool {
    fn name(&self) -> ToolName {
        ToolName::VectorStoreSearch
    }

    fn description(&self) -> &str {
        "Search the internal business knowledge base (vector database) for passages relevant to a query."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query used to find relevant documents."
                }
            },
            "required": ["query"]
        })
    }

    async fn call(&self, arguments: &Value) -> Result<String, ToolError> {
        let query = required_str(self.name(), arguments, "query")?;
        let hits = self.store.search(query, self.top_k).await?;

        if hits.is_empty() {
            return Ok("No relevant documents found.".to_string());
        }

        Ok(hits
            .iter()
            .enumerate()
            .map(|(index, hit)| {
                format!(
                    "[{}] source={} score={:.4}\n{}",
                    index + 1,
                    hit.source_path,
                    hit.score,
                    hit.text
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}
