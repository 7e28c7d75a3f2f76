//! Agent run loop
//!
//! The runner drives one conversation through a chain of agents:
//! - sends the active agent's instructions, the history, and its tools
//! - executes requested tool calls and feeds results back
//! - switches the active agent when a handoff tool is called
//! - stops on a plain answer, enforcing turn and time limits

use crate::agent::{Agent, Conversation, RunTrace, TraceEvent};
use crate::config::AgentConfig;
use crate::error::{EditorError, Result};
use crate::providers::{Message, Provider, TokenUsage, ToolCall};
use crate::tools::ToolResult;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Final answer of the last active agent
    pub final_output: String,
    /// Name of the agent that produced the final answer
    pub last_agent: String,
    /// Number of model turns used
    pub turns: usize,
    /// Provider-reported token usage summed over the run
    pub usage: TokenUsage,
    /// Recorded events; empty when tracing is disabled
    pub trace: RunTrace,
    /// Full conversation history, without system instructions
    pub history: Vec<Message>,
}

/// Executes agents against a provider
///
/// Cloning is cheap; nested runs started by agent tools share the provider.
#[derive(Clone)]
pub struct Runner {
    provider: Arc<dyn Provider>,
    config: AgentConfig,
}

impl Runner {
    /// Create a runner
    pub fn new(provider: Arc<dyn Provider>, config: AgentConfig) -> Self {
        Self { provider, config }
    }

    /// The provider used for completions
    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Run limits and conversation settings
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Run `agent` on a user input until it produces a final answer
    ///
    /// # Errors
    ///
    /// - `EditorError::MaxIterationsExceeded` when `max_turns` is reached
    /// - `EditorError::Timeout` when the run exceeds `timeout_seconds`
    /// - `EditorError::Provider` for provider failures or empty responses
    ///
    /// Tool failures do not abort the run; they are reported to the model
    /// as error tool results.
    pub async fn run(&self, agent: &Agent, input: impl Into<String>) -> Result<RunResult> {
        let input = input.into();
        let limit = Duration::from_secs(self.config.timeout_seconds);

        match tokio::time::timeout(limit, self.run_until_final(agent, input)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Run of agent '{}' timed out after {} seconds",
                    agent.name, self.config.timeout_seconds
                );
                Err(EditorError::Timeout(self.config.timeout_seconds).into())
            }
        }
    }

    async fn run_until_final(&self, agent: &Agent, input: String) -> Result<RunResult> {
        let started = Instant::now();
        let mut conversation = Conversation::from_config(&self.config.conversation);
        let mut trace = RunTrace::new(self.config.trace_runs);
        let mut usage = TokenUsage::default();
        let mut current: &Agent = agent;
        let mut turn = 0;

        info!("Starting run with agent '{}'", agent.name);
        conversation.add_user_message(input);

        loop {
            turn += 1;
            if turn > self.config.max_turns {
                warn!("Maximum turns ({}) exceeded", self.config.max_turns);
                return Err(EditorError::MaxIterationsExceeded {
                    limit: self.config.max_turns,
                    message: format!("agent '{}' did not produce a final answer", current.name),
                }
                .into());
            }

            trace.record(TraceEvent::Turn {
                agent: current.name.clone(),
                turn,
            });
            debug!(
                "Turn {}/{} agent={} tokens={}/{}",
                turn,
                self.config.max_turns,
                current.name,
                conversation.token_count(),
                conversation.max_tokens()
            );

            let mut messages = Vec::with_capacity(conversation.len() + 1);
            messages.push(Message::system(current.instructions.as_str()));
            messages.extend_from_slice(conversation.messages());

            let response = self
                .provider
                .complete_with_format(
                    &messages,
                    &current.turn_definitions(),
                    current.output.as_ref(),
                )
                .await?;

            if let Some(reported) = response.usage {
                usage.add(reported);
            }

            let message = response.message;

            if message.has_tool_calls() {
                let tool_calls: Vec<ToolCall> = message.tool_calls.clone().unwrap_or_default();
                conversation.push(message);

                let mut next_agent: Option<&Agent> = None;
                for call in &tool_calls {
                    if let Some(target) = current.find_handoff(&call.function.name) {
                        if next_agent.is_some() {
                            conversation.add_tool_result(
                                &call.id,
                                "Error: only one handoff is allowed per turn; ignored",
                            );
                            continue;
                        }

                        info!("Handoff from '{}' to '{}'", current.name, target.name);
                        trace.record(TraceEvent::Handoff {
                            from: current.name.clone(),
                            to: target.name.clone(),
                        });
                        conversation.add_tool_result(
                            &call.id,
                            serde_json::json!({ "assistant": target.name }).to_string(),
                        );
                        next_agent = Some(target.as_ref());
                        continue;
                    }

                    let result = self.execute_tool_call(current, call).await;
                    trace.record(TraceEvent::ToolCall {
                        agent: current.name.clone(),
                        tool: call.function.name.clone(),
                        success: result.success,
                        metadata: result.metadata.clone(),
                    });
                    conversation.add_tool_result(&call.id, result.to_message());
                }

                if let Some(next) = next_agent {
                    current = next;
                }
                continue;
            }

            let content = match message.content.as_deref() {
                Some(content) if !content.trim().is_empty() => content.to_string(),
                _ => {
                    warn!("Provider returned neither content nor tool calls");
                    return Err(EditorError::Provider(
                        "Provider returned invalid response (no content or tool calls)"
                            .to_string(),
                    )
                    .into());
                }
            };
            conversation.push(message);

            let final_output = match &current.output {
                Some(format) => match parse_structured_output(&content) {
                    Ok(value) => value.to_string(),
                    Err(e) => {
                        warn!(
                            "Agent '{}' answered with invalid JSON for '{}': {}",
                            current.name, format.name, e
                        );
                        conversation.add_user_message(format!(
                            "Your answer was not valid JSON for the {} schema ({}). \
                             Reply again with only the JSON object.",
                            format.name, e
                        ));
                        continue;
                    }
                },
                None => content,
            };

            info!(
                "Run finished by agent '{}' in {} turns, {} ms",
                current.name,
                turn,
                started.elapsed().as_millis()
            );

            return Ok(RunResult {
                final_output,
                last_agent: current.name.clone(),
                turns: turn,
                usage,
                trace,
                history: conversation.messages().to_vec(),
            });
        }
    }

    async fn execute_tool_call(&self, agent: &Agent, call: &ToolCall) -> ToolResult {
        let name = &call.function.name;
        debug!("Executing tool: {}", name);

        let Some(executor) = agent.tools.get(name) else {
            warn!("Agent '{}' called unknown tool '{}'", agent.name, name);
            return ToolResult::error(format!("Tool not found: {}", name));
        };

        let raw_args = call.function.arguments.trim();
        let args = if raw_args.is_empty() {
            serde_json::json!({})
        } else {
            match serde_json::from_str::<serde_json::Value>(raw_args) {
                Ok(args) => args,
                Err(e) => {
                    warn!("Invalid arguments for tool '{}': {}", name, e);
                    return ToolResult::error(format!(
                        "Failed to parse tool arguments for '{}': {}",
                        name, e
                    ));
                }
            }
        };

        match executor.execute(args).await {
            Ok(result) => {
                let original_len = result.output.len();
                let result = result.truncate_if_needed(self.config.tools.max_output_size);
                if result.truncated {
                    debug!(
                        "Tool output truncated from {} to {} bytes",
                        original_len, self.config.tools.max_output_size
                    );
                }
                result
            }
            Err(e) => {
                warn!("Tool '{}' execution failed: {:#}", name, e);
                ToolResult::error(format!("Tool '{}' execution failed: {}", name, e))
            }
        }
    }
}

/// Parse a final answer that must be JSON
///
/// Tolerates surrounding whitespace and a Markdown code fence.
pub(crate) fn parse_structured_output(content: &str) -> serde_json::Result<serde_json::Value> {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);
    serde_json::from_str(unfenced.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ResponseFormat;
    use crate::test_utils::{tool_call_message, MockProvider};
    use crate::tools::{ToolExecutor, ToolRegistry};
    use async_trait::async_trait;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl ToolExecutor for Echo {
        fn tool_definition(&self) -> serde_json::Value {
            json!({
                "name": "echo",
                "description": "Echo the text",
                "parameters": {
                    "type": "object",
                    "properties": {"text": {"type": "string"}},
                    "required": ["text"]
                }
            })
        }

        async fn execute(&self, args: serde_json::Value) -> Result<ToolResult> {
            match args["text"].as_str() {
                Some(text) => Ok(ToolResult::success(text)
                    .with_metadata("chars", text.chars().count().to_string())),
                None => Err(EditorError::Tool("text is required".to_string()).into()),
            }
        }
    }

    fn echo_agent() -> Agent {
        let mut tools = ToolRegistry::new();
        tools.register_tool(Arc::new(Echo));
        Agent::new("editor", "You edit.").with_tools(tools)
    }

    fn runner(provider: MockProvider) -> Runner {
        Runner::new(Arc::new(provider), AgentConfig::default())
    }

    #[tokio::test]
    async fn test_plain_answer_ends_run() {
        let provider = MockProvider::new(vec![Message::assistant("Looks good")]);
        let result = runner(provider.clone())
            .run(&echo_agent(), "review this")
            .await
            .unwrap();

        assert_eq!(result.final_output, "Looks good");
        assert_eq!(result.last_agent, "editor");
        assert_eq!(result.turns, 1);

        let sent = provider.requests();
        assert_eq!(sent[0].messages[0], Message::system("You edit."));
        assert_eq!(sent[0].messages[1], Message::user("review this"));
        assert_eq!(sent[0].tool_names(), vec!["echo"]);
    }

    #[tokio::test]
    async fn test_tool_results_are_fed_back() {
        let provider = MockProvider::new(vec![
            tool_call_message("call_1", "echo", json!({"text": "pong"})),
            Message::assistant("done"),
        ]);
        let result = runner(provider.clone())
            .run(&echo_agent(), "ping")
            .await
            .unwrap();

        assert_eq!(result.turns, 2);
        let second = &provider.requests()[1].messages;
        let tool_msg = second.iter().find(|m| m.role == "tool").unwrap();
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(tool_msg.content.as_deref(), Some("pong"));
    }

    #[tokio::test]
    async fn test_tool_metadata_is_traced() {
        let provider = MockProvider::new(vec![
            tool_call_message("call_1", "echo", json!({"text": "記事"})),
            Message::assistant("done"),
        ]);
        let result = runner(provider).run(&echo_agent(), "ping").await.unwrap();

        assert_eq!(result.trace.tool_metadata("echo", "chars"), Some("2"));
        assert_eq!(result.trace.tool_metadata("echo", "missing"), None);
    }

    #[tokio::test]
    async fn test_unknown_tool_and_bad_arguments_do_not_abort() {
        let mut bad_args = tool_call_message("call_2", "echo", json!({}));
        if let Some(calls) = bad_args.tool_calls.as_mut() {
            calls[0].function.arguments = "{not json".to_string();
        }
        let provider = MockProvider::new(vec![
            tool_call_message("call_1", "missing_tool", json!({})),
            bad_args,
            tool_call_message("call_3", "echo", json!({})),
            Message::assistant("recovered"),
        ]);

        let result = runner(provider.clone())
            .run(&echo_agent(), "go")
            .await
            .unwrap();
        assert_eq!(result.final_output, "recovered");

        let tool_outputs: Vec<String> = result
            .history
            .iter()
            .filter(|m| m.role == "tool")
            .filter_map(|m| m.content.clone())
            .collect();
        assert_eq!(tool_outputs.len(), 3);
        assert!(tool_outputs[0].contains("Tool not found: missing_tool"));
        assert!(tool_outputs[1].contains("Failed to parse tool arguments"));
        assert!(tool_outputs[2].contains("text is required"));
    }

    #[tokio::test]
    async fn test_handoff_switches_agent_and_keeps_history() {
        let publisher = Arc::new(Agent::new("publisher", "You publish."));
        let editor = echo_agent().with_handoff(Arc::clone(&publisher));

        let provider = MockProvider::new(vec![
            tool_call_message("call_1", "transfer_to_publisher", json!({})),
            Message::assistant("published"),
        ]);
        let result = runner(provider.clone()).run(&editor, "post it").await.unwrap();

        assert_eq!(result.last_agent, "publisher");
        assert_eq!(result.final_output, "published");
        assert_eq!(result.trace.agent_path(), vec!["editor", "publisher"]);

        let requests = provider.requests();
        assert!(requests[0]
            .tool_names()
            .contains(&"transfer_to_publisher".to_string()));
        assert_eq!(requests[1].messages[0], Message::system("You publish."));
        assert_eq!(requests[1].messages[1], Message::user("post it"));
        assert!(requests[1].tool_names().is_empty());
    }

    #[tokio::test]
    async fn test_max_turns_exceeded() {
        let provider = MockProvider::repeating(tool_call_message(
            "call_loop",
            "echo",
            json!({"text": "again"}),
        ));
        let config = AgentConfig {
            max_turns: 3,
            ..Default::default()
        };
        let err = Runner::new(Arc::new(provider), config)
            .run(&echo_agent(), "loop")
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EditorError>(),
            Some(EditorError::MaxIterationsExceeded { limit: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_timeout() {
        let provider = MockProvider::new(vec![Message::assistant("late")])
            .with_delay(Duration::from_secs(5));
        let config = AgentConfig {
            timeout_seconds: 1,
            ..Default::default()
        };
        let err = Runner::new(Arc::new(provider), config)
            .run(&echo_agent(), "slow")
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EditorError>(),
            Some(EditorError::Timeout(1))
        ));
    }

    #[tokio::test]
    async fn test_structured_output_is_validated_and_retried() {
        let checker = Agent::new("checker", "Check.")
            .with_output(ResponseFormat::json_schema("check_result", json!({})));
        let provider = MockProvider::new(vec![
            Message::assistant("I think it is fine"),
            Message::assistant("```json\n{\"status\":\"accept\"}\n```"),
        ]);
        let result = runner(provider.clone()).run(&checker, "text").await.unwrap();

        assert_eq!(result.final_output, r#"{"status":"accept"}"#);
        assert_eq!(result.turns, 2);
        assert_eq!(
            provider.requests()[0].format.as_ref().map(|f| f.name.as_str()),
            Some("check_result")
        );
    }

    #[tokio::test]
    async fn test_empty_response_is_provider_error() {
        let provider = MockProvider::new(vec![Message::assistant("  ")]);
        let err = runner(provider).run(&echo_agent(), "x").await.unwrap_err();
        assert!(err.to_string().contains("no content or tool calls"));
    }

    #[tokio::test]
    async fn test_trace_disabled() {
        let provider = MockProvider::new(vec![Message::assistant("ok")]);
        let config = AgentConfig {
            trace_runs: false,
            ..Default::default()
        };
        let result = Runner::new(Arc::new(provider), config)
            .run(&echo_agent(), "x")
            .await
            .unwrap();
        assert!(result.trace.events().is_empty());
    }

    #[tokio::test]
    async fn test_usage_is_summed() {
        let provider = MockProvider::new(vec![
            tool_call_message("c1", "echo", json!({"text": "a"})),
            Message::assistant("done"),
        ])
        .with_usage(TokenUsage::new(10, 2));
        let result = runner(provider).run(&echo_agent(), "x").await.unwrap();
        assert_eq!(result.usage, TokenUsage::new(20, 4));
    }

    #[test]
    fn test_parse_structured_output() {
        assert!(parse_structured_output(" {\"a\":1} ").is_ok());
        assert!(parse_structured_output("```\n{\"a\":1}\n```").is_ok());
        assert!(parse_structured_output("not json").is_err());
    }
}
