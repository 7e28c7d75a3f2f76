//! Declarative agent profiles
//!
//! An [`Agent`] is data, not a loop: a name, instructions, the tools it may
//! call, the agents it may hand the conversation to, and optionally the JSON
//! shape its final answer must take. [`crate::agent::Runner`] executes it.

use crate::providers::ResponseFormat;
use crate::tools::ToolRegistry;
use std::sync::Arc;

/// Prefix of the synthetic tools that transfer control to another agent
pub const HANDOFF_PREFIX: &str = "transfer_to_";

/// Agent profile
#[derive(Debug, Clone)]
pub struct Agent {
    /// Identifier, also used to derive the handoff tool name
    pub name: String,
    /// Human readable description used for handoff and agent-tool listings
    pub description: String,
    /// System instructions
    pub instructions: String,
    /// Tools this agent may call
    pub tools: ToolRegistry,
    /// Agents this agent may hand the conversation to
    pub handoffs: Vec<Arc<Agent>>,
    /// Required shape of the final answer
    pub output: Option<ResponseFormat>,
}

impl Agent {
    /// Create an agent with no tools, handoffs, or output format
    ///
    /// # Examples
    ///
    /// ```
    /// use qiita_editor::agent::Agent;
    ///
    /// let agent = Agent::new("publisher", "Publishes reviewed articles");
    /// assert_eq!(agent.handoff_tool_name(), "transfer_to_publisher");
    /// ```
    pub fn new(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            instructions: instructions.into(),
            tools: ToolRegistry::new(),
            handoffs: Vec::new(),
            output: None,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Replace the tool registry
    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    /// Add a handoff target
    pub fn with_handoff(mut self, agent: Arc<Agent>) -> Self {
        self.handoffs.push(agent);
        self
    }

    /// Require the final answer to match a JSON schema
    pub fn with_output(mut self, format: ResponseFormat) -> Self {
        self.output = Some(format);
        self
    }

    /// Name of the tool other agents call to hand off to this one
    ///
    /// Characters outside `[A-Za-z0-9_-]` are replaced with `_` so the name
    /// is accepted by function calling APIs.
    pub fn handoff_tool_name(&self) -> String {
        let slug: String = self
            .name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("{}{}", HANDOFF_PREFIX, slug)
    }

    /// Tool definition the model sees for handing off to this agent
    pub fn handoff_definition(&self) -> serde_json::Value {
        let description = if self.description.is_empty() {
            format!("Handoff to the {} agent to handle the request.", self.name)
        } else {
            format!(
                "Handoff to the {} agent to handle the request. {}",
                self.name, self.description
            )
        };

        serde_json::json!({
            "name": self.handoff_tool_name(),
            "description": description,
            "parameters": {
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }
        })
    }

    /// Tool definitions sent on this agent's turns: its tools, then handoffs
    pub fn turn_definitions(&self) -> Vec<serde_json::Value> {
        let mut definitions = self.tools.all_definitions();
        definitions.extend(self.handoffs.iter().map(|h| h.handoff_definition()));
        definitions
    }

    /// Find the handoff target addressed by a tool name
    pub fn find_handoff(&self, tool_name: &str) -> Option<&Arc<Agent>> {
        self.handoffs
            .iter()
            .find(|h| h.handoff_tool_name() == tool_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_handoff_tool_name_is_sanitized() {
        let agent = Agent::new("Chief Editor!", "x");
        assert_eq!(agent.handoff_tool_name(), "transfer_to_chief_editor_");
    }

    #[test]
    fn test_handoff_definition_shape() {
        let agent = Agent::new("publisher", "x").with_description("Posts the article.");
        let definition = agent.handoff_definition();
        assert_eq!(definition["name"], "transfer_to_publisher");
        assert!(definition["description"]
            .as_str()
            .unwrap()
            .ends_with("Posts the article."));
        assert_eq!(definition["parameters"]["type"], "object");
    }

    #[test]
    fn test_turn_definitions_lists_tools_then_handoffs() {
        let publisher = Arc::new(Agent::new("publisher", "publish"));
        let editor = Agent::new("editor", "edit").with_handoff(publisher);
        let definitions = editor.turn_definitions();
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions[0]["name"], "transfer_to_publisher");
    }

    #[test]
    fn test_find_handoff() {
        let editor = Agent::new("editor", "edit")
            .with_handoff(Arc::new(Agent::new("publisher", "publish")));
        assert_eq!(
            editor.find_handoff("transfer_to_publisher").unwrap().name,
            "publisher"
        );
        assert!(editor.find_handoff("transfer_to_nobody").is_none());
    }

    #[test]
    fn test_with_output() {
        let agent = Agent::new("checker", "check")
            .with_output(ResponseFormat::json_schema("check_result", json!({})));
        assert_eq!(agent.output.unwrap().name, "check_result");
    }
}
