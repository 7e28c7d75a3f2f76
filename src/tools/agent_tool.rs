//! Agents exposed as tools
//!
//! The editor consults each checker by calling it like any other tool. The
//! checker runs in its own conversation; only its final answer comes back.

use crate::agent::{Agent, Runner};
use crate::editor::{CheckResult, CHECK_RESULT_SCHEMA};
use crate::error::Result;
use crate::tools::{ToolExecutor, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct AgentToolInput {
    input: String,
}

/// Tool that runs a nested agent on the given input
pub struct AgentTool {
    agent: Arc<Agent>,
    runner: Runner,
    tool_name: String,
    description: String,
}

impl AgentTool {
    /// Wrap `agent` as a tool named `tool_name`
    pub fn new(
        agent: Arc<Agent>,
        runner: Runner,
        tool_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            agent,
            runner,
            tool_name: tool_name.into(),
            description: description.into(),
        }
    }

    fn returns_check_result(&self) -> bool {
        self.agent
            .output
            .as_ref()
            .is_some_and(|format| format.name == CHECK_RESULT_SCHEMA)
    }
}

#[async_trait]
impl ToolExecutor for AgentTool {
    fn tool_definition(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.tool_name,
            "description": self.description,
            "parameters": {
                "type": "object",
                "properties": {
                    "input": {
                        "type": "string",
                        "description": "Everything the agent needs to do its job, including the full article text"
                    }
                },
                "required": ["input"],
                "additionalProperties": false
            }
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<ToolResult> {
        let input: AgentToolInput = match serde_json::from_value(args) {
            Ok(input) => input,
            Err(e) => return Ok(ToolResult::error(format!("Invalid input: {}", e))),
        };

        if input.input.trim().is_empty() {
            return Ok(ToolResult::error("input cannot be empty"));
        }

        tracing::info!("Consulting agent '{}'", self.agent.name);
        let run = self.runner.run(&self.agent, input.input).await?;

        let output = if self.returns_check_result() {
            let check = CheckResult::parse(&run.final_output)?;
            tracing::info!(
                "Agent '{}' verdict: {:?} ({})",
                self.agent.name,
                check.status,
                check.comment
            );
            serde_json::to_string(&check)?
        } else {
            run.final_output
        };

        Ok(ToolResult::success(output)
            .with_metadata("agent", self.agent.name.clone())
            .with_metadata("turns", run.turns.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;
    use crate::providers::Message;
    use crate::test_utils::MockProvider;
    use serde_json::json;

    fn checker() -> Arc<Agent> {
        Arc::new(
            Agent::new("readability_checker", "Judge readability.")
                .with_output(CheckResult::response_format()),
        )
    }

    fn tool(agent: Arc<Agent>, provider: &MockProvider) -> AgentTool {
        AgentTool::new(
            agent,
            Runner::new(Arc::new(provider.clone()), AgentConfig::default()),
            "readability_check_tool",
            "Judges readability",
        )
    }

    #[test]
    fn test_definition() {
        let provider = MockProvider::default();
        let definition = tool(checker(), &provider).tool_definition();
        assert_eq!(definition["name"], "readability_check_tool");
        assert_eq!(definition["parameters"]["required"][0], "input");
    }

    #[tokio::test]
    async fn test_runs_nested_agent_with_its_own_conversation() {
        let provider = MockProvider::new(vec![Message::assistant(
            r#"{"status":"accept","name":"readability","comment":"clear"}"#,
        )]);
        let result = tool(checker(), &provider)
            .execute(json!({"input": "# Title\nbody"}))
            .await
            .unwrap();

        assert!(result.success);
        let check = CheckResult::parse(&result.output).unwrap();
        assert!(check.accepted());
        assert_eq!(result.metadata["agent"], "readability_checker");

        let request = &provider.requests()[0];
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[1], Message::user("# Title\nbody"));
    }

    #[tokio::test]
    async fn test_invalid_check_result_is_error() {
        let provider = MockProvider::new(vec![Message::assistant(r#"{"status":"accept"}"#)]);
        let err = tool(checker(), &provider)
            .execute(json!({"input": "text"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid result"));
    }

    #[tokio::test]
    async fn test_plain_agent_output_is_passed_through() {
        let provider = MockProvider::new(vec![Message::assistant("free text")]);
        let plain = Arc::new(Agent::new("summarizer", "Summarize."));
        let result = tool(plain, &provider)
            .execute(json!({"input": "text"}))
            .await
            .unwrap();
        assert_eq!(result.output, "free text");
    }

    #[tokio::test]
    async fn test_missing_or_empty_input() {
        let provider = MockProvider::default();
        let tool = tool(checker(), &provider);

        let missing = tool.execute(json!({})).await.unwrap();
        assert!(!missing.success);

        let empty = tool.execute(json!({"input": "  "})).await.unwrap();
        assert_eq!(empty.error.as_deref(), Some("input cannot be empty"));
        assert_eq!(provider.call_count(), 0);
    }
}
