use super::{required_str, Tool};
use crate::error::ToolError;
use crate::requirements::ToolName;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

pub const DEFAULT_DUCKDUCKGO_ENDPOINT: &str = "https://api.duckduckgo.com/";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    heading: String,
    #[serde(default)]
    abstract_text: String,
    #[serde(default, rename = "AbstractURL")]
    abstract_url: String,
    #[serde(default)]
    results: Vec<Topic>,
    #[serde(default)]
    related_topics: Vec<Topic>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Topic {
    #[serde(default)]
    text: String,
    #[serde(default, rename = "FirstURL")]
    first_url: String,
    #[serde(default)]
    topics: Vec<Topic>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebResult {
    pub title: String,
    pub url: String,
}

/// Web search through the DuckDuckGo instant answer API.
pub struct DuckDuckGoSearchTool {
    client: Client,
    endpoint: String,
    max_results: usize,
}

impl DuckDuckGoSearchTool {
    pub fn new(endpoint: impl Into<String>, max_results: usize) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            max_results: max_results.max(1),
        }
    }

    pub async fn search(&self, query: &str) -> Result<Vec<WebResult>, ToolError> {
        let url = Url::parse_with_params(
            &self.endpoint,
            &[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ],
        )
        .map_err(|error| ToolError::Execution {
            tool: self.name().to_string(),
            details: format!("invalid endpoint {}: {error}", self.endpoint),
        })?;

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ToolError::Execution {
                tool: self.name().to_string(),
                details: format!("search returned {}", response.status()),
            });
        }

        // The API answers with `application/x-javascript`, so decode the body by hand.
        let body = response.text().await?;
        let answer: InstantAnswer =
            serde_json::from_str(&body).map_err(|error| ToolError::Execution {
                tool: self.name().to_string(),
                details: format!("unreadable search response: {error}"),
            })?;

        Ok(collect_results(answer, self.max_results))
    }
}

fn collect_results(answer: InstantAnswer, limit: usize) -> Vec<WebResult> {
    let mut results = Vec::new();
    if !answer.abstract_text.is_empty() {
        results.push(WebResult {
            title: if answer.heading.is_empty() {
                answer.abstract_text.clone()
            } else {
                format!("{}: {}", answer.heading, answer.abstract_text)
            },
            url: answer.abstract_url.clone(),
        });
    }

    let mut pending: Vec<Topic> = answer
        .results
        .into_iter()
        .chain(answer.related_topics)
        .collect();
    pending.reverse();

    while let Some(topic) = pending.pop() {
        if results.len() >= limit {
            break;
        }
        if !topic.topics.is_empty() {
            pending.extend(topic.topics.into_iter().rev());
            continue;
        }
        if !topic.text.is_empty() {
            results.push(WebResult {
                title: topic.text,
                url: topic.first_url,
            });
        }
    }

    results.truncate(limit);
    results
}

#[async_trait]
impl Tool for DuckDuckGoSearchTool {
    fn name(&self) -> ToolName {
        ToolName::WebSearch
    }

    fn description(&self) -> &str {
        "Search for online trends, news, current events, real-time information, or research topics."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query."
                }
            },
            "required": ["query"]
        })
    }

    async fn call(&self, arguments: &Value) -> Result<String, ToolError> {
        let query = required_str(self.name(), arguments, "query")?;
        let results = self.search(query).await?;
        if results.is_empty() {
            return Ok("No results found.".to_string());
        }
        Ok(results
            .iter()
            .map(|result| format!("- {} ({})", result.title, result.url))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
