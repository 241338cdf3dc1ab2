//! Tool-gated conversational agent.
//!
//! Each call to [`RequirementAgent::run`] is one user turn. The agent asks the
//! chat model for the next action step by step, offering only the tools the
//! declared [`ToolRequirement`]s allow at that step, until the model answers
//! in text with every requirement satisfied.

use crate::chat::{ChatModel, Message, ToolSpec};
use crate::config::AgentConfig;
use crate::error::{AgentError, ConfigError};
use crate::memory::UnconstrainedMemory;
use crate::requirements::{validate_tool_policy, RequirementTracker, ToolName, ToolRequirement};
use crate::tools::Tool;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

const TRAJECTORY_TARGET: &str = "rag_agent::trajectory";

#[derive(Debug, Clone, PartialEq)]
pub struct AgentStep {
    pub step: usize,
    pub tool: ToolName,
    pub input: Value,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentResponse {
    pub text: String,
    pub steps: Vec<AgentStep>,
}

pub struct RequirementAgent {
    model: Arc<dyn ChatModel>,
    tools: Vec<Arc<dyn Tool>>,
    requirements: Vec<ToolRequirement>,
    memory: UnconstrainedMemory,
    system_prompt: String,
    max_iterations: usize,
}

impl std::fmt::Debug for RequirementAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequirementAgent")
            .field("model", &self.model.model_name())
            .field("tools", &self.enabled())
            .field("requirements", &self.requirements)
            .field("memory_len", &self.memory.len())
            .finish()
    }
}

impl RequirementAgent {
    pub fn new(
        model: Arc<dyn ChatModel>,
        tools: Vec<Arc<dyn Tool>>,
        config: &AgentConfig,
    ) -> Result<Self, ConfigError> {
        if config.max_iterations == 0 {
            return Err(ConfigError::InvalidValue {
                field: "agent.max_iterations",
                details: "must be at least 1".to_string(),
            });
        }

        let enabled: Vec<ToolName> = tools.iter().map(|tool| tool.name()).collect();
        validate_tool_policy(&enabled, &config.forbidden_tools, &config.requirements)?;

        info!(
            model = model.model_name(),
            tools = ?enabled,
            "creating agent"
        );

        Ok(Self {
            model,
            tools,
            requirements: config.requirements.clone(),
            memory: UnconstrainedMemory::default(),
            system_prompt: system_prompt(config),
            max_iterations: config.max_iterations,
        })
    }

    pub fn memory(&self) -> &UnconstrainedMemory {
        &self.memory
    }

    fn enabled(&self) -> Vec<ToolName> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }

    fn tool(&self, name: ToolName) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|tool| tool.name() == name)
    }

    /// Runs one user turn to completion. A failed turn leaves memory as it
    /// was before the turn started.
    pub async fn run(&mut self, prompt: &str) -> Result<AgentResponse, AgentError> {
        let checkpoint = self.memory.len();
        let result = self.run_turn(prompt).await;
        if let Err(error) = &result {
            debug!(%error, dropped = self.memory.len() - checkpoint, "rolling back failed turn");
            self.memory.truncate(checkpoint);
        }
        result
    }

    async fn run_turn(&mut self, prompt: &str) -> Result<AgentResponse, AgentError> {
        self.memory.add(Message::user(prompt));

        let enabled = self.enabled();
        let requirements = self.requirements.clone();
        let mut tracker = RequirementTracker::new(&requirements);
        let mut steps = Vec::new();
        let mut reminder: Option<String> = None;

        for _ in 0..self.max_iterations {
            let forced = tracker.forced(&enabled);
            let offered = match forced {
                Some(tool) => vec![tool],
                None => tracker.allowed(&enabled),
            };
            let specs: Vec<ToolSpec> = offered
                .iter()
                .filter_map(|name| self.tool(*name))
                .map(|tool| tool.spec())
                .collect();

            let mut messages = Vec::with_capacity(self.memory.len() + 2);
            messages.push(Message::system(self.system_prompt.clone()));
            messages.extend(self.memory.messages().iter().cloned());
            if let Some(tool) = forced {
                messages.push(Message::system(format!(
                    "You must call the `{tool}` tool now."
                )));
            } else if let Some(text) = reminder.take() {
                messages.push(Message::system(text));
            }

            let reply = self.model.chat(&messages, &specs).await?;

            let Some(call) = reply.tool_calls.first().cloned() else {
                if tracker.can_finish(&enabled) {
                    self.memory.add(Message::assistant(reply.content.clone()));
                    info!(steps = steps.len(), "agent turn finished");
                    return Ok(AgentResponse {
                        text: reply.content,
                        steps,
                    });
                }
                reminder = Some(unmet_reminder(&tracker));
                tracker.advance(None);
                continue;
            };

            let name: ToolName = call
                .function
                .name
                .parse()
                .map_err(|_| AgentError::UnknownTool(call.function.name.clone()))?;
            let tool = self
                .tool(name)
                .cloned()
                .ok_or_else(|| AgentError::UnknownTool(call.function.name.clone()))?;

            self.memory.add(Message {
                tool_calls: vec![call.clone()],
                ..Message::assistant(reply.content.clone())
            });

            if !offered.contains(&name) {
                debug!(target: TRAJECTORY_TARGET, step = tracker.step(), tool = %name, "tool not allowed at this step");
                self.memory.add(Message::tool_result(
                    name.as_str(),
                    format!("The `{name}` tool is not available at this step. Choose another action."),
                ));
                tracker.advance(None);
                continue;
            }

            debug!(target: TRAJECTORY_TARGET, step = tracker.step(), tool = %name, input = %call.function.arguments, "tool call");
            let output = tool.call(&call.function.arguments).await?;
            debug!(target: TRAJECTORY_TARGET, step = tracker.step(), tool = %name, output_len = output.len(), "tool result");

            self.memory.add(Message::tool_result(name.as_str(), output.clone()));
            steps.push(AgentStep {
                step: tracker.step(),
                tool: name,
                input: call.function.arguments,
                output,
            });
            tracker.advance(Some(name));
        }

        Err(AgentError::IterationsExhausted(self.max_iterations))
    }
}

fn unmet_reminder(tracker: &RequirementTracker<'_>) -> String {
    let unmet = tracker.unmet();
    if unmet.is_empty() {
        return "Complete the required tool step before answering.".to_string();
    }
    let missing = unmet
        .iter()
        .map(|(tool, count)| format!("`{tool}` ({count} more time(s))"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("Before answering you still have to call: {missing}.")
}

fn system_prompt(config: &AgentConfig) -> String {
    let mut prompt = format!("Role: {}\n\n{}", config.role, config.instructions);
    if !config.forbidden_tools.is_empty() {
        prompt.push_str("\n\nTool restrictions:");
        for tool in &config.forbidden_tools {
            prompt.push_str(&format!(
                "\n- Never use `{tool}`. All factual data must originate from the knowledge base."
            ));
        }
    }
    prompt
}

/// Something that turns one line of user text into a reply.
#[async_trait]
pub trait Respond: Send {
    async fn respond(&mut self, prompt: &str) -> Result<String, AgentError>;
}

#[async_trait]
impl Respond for RequirementAgent {
    async fn respond(&mut self, prompt: &str) -> Result<String, AgentError> {
        self.run(prompt).await.map(|response| response.text)
    }
}
