//! Tool invocation constraints and their per-turn bookkeeping.
//!
//! A [`ToolRequirement`] declares how often and when a tool may run during a
//! single agent turn. [`RequirementTracker`] answers, at every step, which
//! tools may be offered to the model, which one is forced, and whether the
//! turn is allowed to end.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolName {
    #[serde(rename = "think")]
    Think,
    #[serde(rename = "vector_store_search")]
    VectorStoreSearch,
    #[serde(rename = "duckduckgo_search")]
    WebSearch,
}

impl ToolName {
    pub const ALL: [ToolName; 3] = [
        ToolName::Think,
        ToolName::VectorStoreSearch,
        ToolName::WebSearch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::Think => "think",
            ToolName::VectorStoreSearch => "vector_store_search",
            ToolName::WebSearch => "duckduckgo_search",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|tool| tool.as_str() == value)
            .ok_or_else(|| format!("unknown tool `{value}`"))
    }
}

/// What makes a tool mandatory at the step following another invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForceAfter {
    AnyTool,
    Tool(ToolName),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRequirement {
    pub tool: ToolName,
    #[serde(default)]
    pub min_invocations: usize,
    #[serde(default)]
    pub max_invocations: Option<usize>,
    /// 1-based step at which the tool must be called.
    #[serde(default)]
    pub force_at_step: Option<usize>,
    #[serde(default)]
    pub force_after: Option<ForceAfter>,
    #[serde(default = "default_consecutive_allowed")]
    pub consecutive_allowed: bool,
}

fn default_consecutive_allowed() -> bool {
    true
}

impl ToolRequirement {
    pub fn new(tool: ToolName) -> Self {
        Self {
            tool,
            min_invocations: 0,
            max_invocations: None,
            force_at_step: None,
            force_after: None,
            consecutive_allowed: true,
        }
    }

    pub fn min_invocations(mut self, min: usize) -> Self {
        self.min_invocations = min;
        self
    }

    pub fn max_invocations(mut self, max: usize) -> Self {
        self.max_invocations = Some(max);
        self
    }

    pub fn force_at_step(mut self, step: usize) -> Self {
        self.force_at_step = Some(step);
        self
    }

    pub fn force_after(mut self, trigger: ForceAfter) -> Self {
        self.force_after = Some(trigger);
        self
    }

    pub fn consecutive_allowed(mut self, allowed: bool) -> Self {
        self.consecutive_allowed = allowed;
        self
    }
}

/// Rejects tool policies that could never be honoured at runtime.
pub fn validate_tool_policy(
    enabled: &[ToolName],
    forbidden: &[ToolName],
    requirements: &[ToolRequirement],
) -> Result<(), ConfigError> {
    for tool in enabled {
        if forbidden.contains(tool) {
            return Err(ConfigError::ContradictoryToolPolicy {
                tool: tool.to_string(),
                details: "the tool is enabled while the instructions forbid using it".to_string(),
            });
        }
    }

    for requirement in requirements {
        let tool = requirement.tool;
        if forbidden.contains(&tool) && requirement.min_invocations > 0 {
            return Err(ConfigError::ContradictoryToolPolicy {
                tool: tool.to_string(),
                details: format!(
                    "at least {} invocation(s) are required while the instructions forbid using it",
                    requirement.min_invocations
                ),
            });
        }
        if !enabled.contains(&tool) {
            return Err(ConfigError::UnknownRequirementTool(tool.to_string()));
        }
        if let Some(ForceAfter::Tool(trigger)) = requirement.force_after {
            if !enabled.contains(&trigger) {
                return Err(ConfigError::UnknownRequirementTool(trigger.to_string()));
            }
        }
        if let Some(max) = requirement.max_invocations {
            if requirement.min_invocations > max {
                return Err(ConfigError::InvalidValue {
                    field: "requirements.min_invocations",
                    details: format!(
                        "{tool}: min_invocations {} exceeds max_invocations {max}",
                        requirement.min_invocations
                    ),
                });
            }
        }
        if requirement.force_at_step == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "requirements.force_at_step",
                details: format!("{tool}: steps are numbered from 1"),
            });
        }
    }

    Ok(())
}

/// Invocation state for one agent turn.
#[derive(Debug)]
pub struct RequirementTracker<'a> {
    requirements: &'a [ToolRequirement],
    invocations: HashMap<ToolName, usize>,
    last_tool: Option<ToolName>,
    step: usize,
}

impl<'a> RequirementTracker<'a> {
    pub fn new(requirements: &'a [ToolRequirement]) -> Self {
        Self {
            requirements,
            invocations: HashMap::new(),
            last_tool: None,
            step: 1,
        }
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn invocations(&self, tool: ToolName) -> usize {
        self.invocations.get(&tool).copied().unwrap_or_default()
    }

    /// Closes the current step. `tool` is the tool run during it, if any.
    pub fn advance(&mut self, tool: Option<ToolName>) {
        if let Some(tool) = tool {
            *self.invocations.entry(tool).or_default() += 1;
        }
        self.last_tool = tool;
        self.step += 1;
    }

    fn requirement(&self, tool: ToolName) -> Option<&ToolRequirement> {
        self.requirements.iter().find(|req| req.tool == tool)
    }

    fn is_allowed(&self, tool: ToolName) -> bool {
        let Some(requirement) = self.requirement(tool) else {
            return true;
        };
        if requirement
            .max_invocations
            .is_some_and(|max| self.invocations(tool) >= max)
        {
            return false;
        }
        requirement.consecutive_allowed || self.last_tool != Some(tool)
    }

    /// Tools the model may call at the current step.
    pub fn allowed(&self, enabled: &[ToolName]) -> Vec<ToolName> {
        enabled
            .iter()
            .copied()
            .filter(|tool| self.is_allowed(*tool))
            .collect()
    }

    /// The tool the model must call at the current step. Declaration order
    /// breaks ties.
    pub fn forced(&self, enabled: &[ToolName]) -> Option<ToolName> {
        self.requirements
            .iter()
            .filter(|req| enabled.contains(&req.tool) && self.is_allowed(req.tool))
            .find(|req| {
                let at_step = req.force_at_step == Some(self.step);
                let after = match (req.force_after, self.last_tool) {
                    (Some(ForceAfter::AnyTool), Some(_)) => true,
                    (Some(ForceAfter::Tool(trigger)), Some(last)) => trigger == last,
                    _ => false,
                };
                at_step || after
            })
            .map(|req| req.tool)
    }

    /// Tools still short of their minimum, with the missing count.
    pub fn unmet(&self) -> Vec<(ToolName, usize)> {
        self.requirements
            .iter()
            .filter_map(|req| {
                let done = self.invocations(req.tool);
                (done < req.min_invocations).then(|| (req.tool, req.min_invocations - done))
            })
            .collect()
    }

    pub fn can_finish(&self, enabled: &[ToolName]) -> bool {
        self.unmet().is_empty() && self.forced(enabled).is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rag_requirements() -> Vec<ToolRequirement> {
        vec![
            ToolRequirement::new(ToolName::Think)
                .force_at_step(1)
                .force_after(ForceAfter::AnyTool)
                .consecutive_allowed(false)
                .max_invocations(3),
            ToolRequirement::new(ToolName::VectorStoreSearch)
                .min_invocations(1)
                .force_at_step(2)
                .consecutive_allowed(false)
                .max_invocations(2),
        ]
    }

    const ENABLED: [ToolName; 2] = [ToolName::Think, ToolName::VectorStoreSearch];

    #[test]
    fn think_then_retrieve_then_think_again() {
        let requirements = rag_requirements();
        let mut tracker = RequirementTracker::new(&requirements);

        assert_eq!(tracker.forced(&ENABLED), Some(ToolName::Think));
        assert!(!tracker.can_finish(&ENABLED));
        tracker.advance(Some(ToolName::Think));

        assert_eq!(tracker.step(), 2);
        assert_eq!(tracker.allowed(&ENABLED), vec![ToolName::VectorStoreSearch]);
        assert_eq!(tracker.forced(&ENABLED), Some(ToolName::VectorStoreSearch));
        tracker.advance(Some(ToolName::VectorStoreSearch));

        assert_eq!(tracker.forced(&ENABLED), Some(ToolName::Think));
        assert!(tracker.unmet().is_empty());
        tracker.advance(Some(ToolName::Think));

        assert_eq!(tracker.forced(&ENABLED), None);
        assert!(tracker.can_finish(&ENABLED));
    }

    #[test]
    fn max_invocations_remove_tool() {
        let requirements = rag_requirements();
        let mut tracker = RequirementTracker::new(&requirements);
        for tool in [
            ToolName::Think,
            ToolName::VectorStoreSearch,
            ToolName::Think,
            ToolName::VectorStoreSearch,
        ] {
            tracker.advance(Some(tool));
        }
        assert_eq!(tracker.allowed(&ENABLED), vec![ToolName::Think]);
        tracker.advance(Some(ToolName::Think));
        assert_eq!(tracker.invocations(ToolName::Think), 3);
        assert!(tracker.allowed(&ENABLED).is_empty());
        assert_eq!(tracker.forced(&ENABLED), None);
    }

    #[test]
    fn unmet_minimum_blocks_finishing() {
        let requirements = vec![ToolRequirement::new(ToolName::VectorStoreSearch).min_invocations(1)];
        let mut tracker = RequirementTracker::new(&requirements);
        tracker.advance(None);
        assert_eq!(tracker.unmet(), vec![(ToolName::VectorStoreSearch, 1)]);
        assert!(!tracker.can_finish(&ENABLED));
    }

    #[test]
    fn web_search_required_but_forbidden_is_contradictory() {
        let mut requirements = rag_requirements();
        requirements.push(
            ToolRequirement::new(ToolName::WebSearch)
                .min_invocations(1)
                .consecutive_allowed(false)
                .max_invocations(2),
        );
        let enabled = [ToolName::Think, ToolName::VectorStoreSearch, ToolName::WebSearch];

        let result = validate_tool_policy(&enabled, &[ToolName::WebSearch], &requirements);
        assert!(matches!(
            result,
            Err(ConfigError::ContradictoryToolPolicy { ref tool, .. }) if tool == "duckduckgo_search"
        ));

        let disabled = [ToolName::Think, ToolName::VectorStoreSearch];
        let result = validate_tool_policy(&disabled, &[ToolName::WebSearch], &requirements);
        assert!(matches!(result, Err(ConfigError::ContradictoryToolPolicy { .. })));

        assert!(validate_tool_policy(&enabled, &[], &requirements).is_ok());
    }

    #[test]
    fn requirement_for_disabled_tool_is_rejected() {
        let requirements = vec![ToolRequirement::new(ToolName::WebSearch).max_invocations(1)];
        let result = validate_tool_policy(&ENABLED, &[], &requirements);
        assert!(matches!(result, Err(ConfigError::UnknownRequirementTool(_))));
    }

    #[test]
    fn tool_names_round_trip_through_strings() {
        for tool in ToolName::ALL {
            assert_eq!(tool.as_str().parse::<ToolName>(), Ok(tool));
        }
        assert!("google".parse::<ToolName>().is_err());
    }
}
