//! Base provider trait and common types for qiita-editor
//!
//! This module defines the Provider trait that every LLM backend implements,
//! along with the conversation message types shared by the agent runner and
//! the tools.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Message structure for conversation
///
/// Represents a message in the conversation with the AI provider.
/// Messages can be from the user, assistant, system, or tool results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender (user, assistant, system, tool)
    pub role: String,
    /// Content of the message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Optional tool calls in the message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Optional tool call ID (for tool result messages)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// Creates a new user message
    ///
    /// # Examples
    ///
    /// ```
    /// use qiita_editor::providers::Message;
    ///
    /// let msg = Message::user("Please review my draft");
    /// assert_eq!(msg.role, "user");
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Creates a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Creates a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Creates a new tool result message
    ///
    /// # Arguments
    ///
    /// * `tool_call_id` - The ID of the tool call this result corresponds to
    /// * `content` - The tool execution result content
    ///
    /// # Examples
    ///
    /// ```
    /// use qiita_editor::providers::Message;
    ///
    /// let msg = Message::tool_result("call_123", "accept");
    /// assert_eq!(msg.role, "tool");
    /// assert_eq!(msg.tool_call_id, Some("call_123".to_string()));
    /// ```
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// Creates an assistant message with tool calls
    pub fn assistant_with_tools(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: None,
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        }
    }

    /// Whether this message requests at least one tool call
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls
            .as_ref()
            .map(|calls| !calls.is_empty())
            .unwrap_or(false)
    }
}

/// Function call information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Name of the function/tool to call
    pub name: String,
    /// Arguments for the function (as JSON string)
    pub arguments: String,
}

/// Tool call structure
///
/// Represents a request from the model to execute a tool with specific arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call
    pub id: String,
    /// Function call details
    pub function: FunctionCall,
}

impl ToolCall {
    /// Build a tool call from a name and a JSON argument value
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.to_string(),
            },
        }
    }
}

/// Token usage information from a completion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of tokens in the prompt
    pub prompt_tokens: usize,
    /// Number of tokens in the completion
    pub completion_tokens: usize,
    /// Total tokens used (prompt + completion)
    pub total_tokens: usize,
}

impl TokenUsage {
    /// Create a new TokenUsage instance
    ///
    /// # Examples
    ///
    /// ```
    /// use qiita_editor::providers::TokenUsage;
    ///
    /// let usage = TokenUsage::new(100, 50);
    /// assert_eq!(usage.total_tokens, 150);
    /// ```
    pub fn new(prompt_tokens: usize, completion_tokens: usize) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    /// Accumulate another usage report into this one
    pub fn add(&mut self, other: TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// Structured output request
///
/// Asks the model to answer with JSON matching `schema`. Providers that do
/// not support structured output may ignore it; the runner still validates
/// the final answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFormat {
    /// Schema name reported to the provider
    pub name: String,
    /// JSON schema of the expected object
    pub schema: serde_json::Value,
    /// Request strict schema adherence
    #[serde(default = "default_strict")]
    pub strict: bool,
}

fn default_strict() -> bool {
    true
}

impl ResponseFormat {
    /// Create a strict JSON schema format
    pub fn json_schema(name: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            schema,
            strict: true,
        }
    }
}

/// Provider-level capabilities and features
#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderCapabilities {
    /// Provider returns token usage information in responses
    pub supports_token_counts: bool,
    /// Provider honors structured output requests
    pub supports_structured_output: bool,
    /// Provider supports streaming responses
    pub supports_streaming: bool,
}

/// Completion response with message and optional token usage
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// The response message from the AI
    pub message: Message,
    /// Optional token usage information
    pub usage: Option<TokenUsage>,
}

impl CompletionResponse {
    /// Create a new CompletionResponse
    pub fn new(message: Message) -> Self {
        Self {
            message,
            usage: None,
        }
    }

    /// Create a new CompletionResponse with token usage
    ///
    /// # Examples
    ///
    /// ```
    /// use qiita_editor::providers::{CompletionResponse, Message, TokenUsage};
    ///
    /// let usage = TokenUsage::new(100, 50);
    /// let response = CompletionResponse::with_usage(Message::assistant("Hello!"), usage);
    /// assert_eq!(response.message.role, "assistant");
    /// assert!(response.usage.is_some());
    /// ```
    pub fn with_usage(message: Message, usage: TokenUsage) -> Self {
        Self {
            message,
            usage: Some(usage),
        }
    }
}

/// Provider trait for LLM backends
///
/// # Examples
///
/// ```no_run
/// use qiita_editor::providers::{Provider, Message, CompletionResponse};
/// use qiita_editor::error::Result;
/// use async_trait::async_trait;
///
/// struct MyProvider;
///
/// #[async_trait]
/// impl Provider for MyProvider {
///     async fn complete(
///         &self,
///         messages: &[Message],
///         tools: &[serde_json::Value],
///     ) -> Result<CompletionResponse> {
///         Ok(CompletionResponse::new(Message::assistant("Response")))
///     }
/// }
/// ```
#[async_trait]
pub trait Provider: Send + Sync {
    /// Completes a conversation with the given messages and available tools
    ///
    /// # Arguments
    ///
    /// * `messages` - Conversation history
    /// * `tools` - Available tools for the assistant to use (as JSON schemas)
    ///
    /// # Errors
    ///
    /// Returns error if the API call fails or response is invalid
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[serde_json::Value],
    ) -> Result<CompletionResponse>;

    /// Completes a conversation, optionally constraining the answer format
    ///
    /// The default implementation ignores `format` and delegates to
    /// [`Provider::complete`].
    async fn complete_with_format(
        &self,
        messages: &[Message],
        tools: &[serde_json::Value],
        format: Option<&ResponseFormat>,
    ) -> Result<CompletionResponse> {
        if format.is_some() {
            tracing::debug!("Provider ignores response format; relying on instructions");
        }
        self.complete(messages, tools).await
    }

    /// Get the name of the currently active model
    fn get_current_model(&self) -> Result<String> {
        Err(crate::error::EditorError::Provider(
            "Current model information is not available from this provider".to_string(),
        )
        .into())
    }

    /// Get the capabilities of this provider
    ///
    /// The default implementation reports every feature as unsupported.
    fn get_provider_capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::default()
    }
}

/// Validates message sequence and removes orphan tool messages
///
/// An orphan tool message is one without a `tool_call_id`, or whose id does
/// not match any tool call in a preceding assistant message. Such messages
/// make Chat Completions reject the whole request.
///
/// # Examples
///
/// ```
/// use qiita_editor::providers::{Message, validate_message_sequence};
///
/// let messages = vec![
///     Message::user("Do something"),
///     Message::tool_result("call_123", "Result"),
/// ];
/// let validated = validate_message_sequence(&messages);
/// assert_eq!(validated.len(), 1);
/// ```
pub fn validate_message_sequence(messages: &[Message]) -> Vec<Message> {
    use std::collections::HashSet;

    let mut seen_tool_ids: HashSet<&str> = HashSet::new();

    messages
        .iter()
        .filter(|message| {
            if message.role == "assistant" {
                if let Some(tool_calls) = &message.tool_calls {
                    seen_tool_ids.extend(tool_calls.iter().map(|tc| tc.id.as_str()));
                }
                return true;
            }

            if message.role != "tool" {
                return true;
            }

            match &message.tool_call_id {
                Some(id) if seen_tool_ids.contains(id.as_str()) => true,
                Some(id) => {
                    tracing::warn!("Dropping orphan tool message with tool_call_id: {}", id);
                    false
                }
                None => {
                    tracing::warn!("Dropping tool message without tool_call_id");
                    false
                }
            }
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_constructors() {
        assert_eq!(Message::user("a").role, "user");
        assert_eq!(Message::assistant("b").role, "assistant");
        assert_eq!(Message::system("c").role, "system");

        let tool = Message::tool_result("call_1", "done");
        assert_eq!(tool.role, "tool");
        assert_eq!(tool.tool_call_id.as_deref(), Some("call_1"));
        assert!(tool.tool_calls.is_none());
    }

    #[test]
    fn test_assistant_with_tools() {
        let msg = Message::assistant_with_tools(vec![ToolCall::new(
            "call_1",
            "confirm_to_human",
            json!({"message": "publish?"}),
        )]);
        assert!(msg.content.is_none());
        assert!(msg.has_tool_calls());
        let call = &msg.tool_calls.as_ref().unwrap()[0];
        assert_eq!(call.function.name, "confirm_to_human");
        assert_eq!(call.function.arguments, r#"{"message":"publish?"}"#);
    }

    #[test]
    fn test_has_tool_calls_empty_vec() {
        let msg = Message::assistant_with_tools(Vec::new());
        assert!(!msg.has_tool_calls());
    }

    #[test]
    fn test_message_serialization_skips_none() {
        let value = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(value, json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn test_token_usage_add() {
        let mut usage = TokenUsage::default();
        usage.add(TokenUsage::new(10, 5));
        usage.add(TokenUsage::new(1, 2));
        assert_eq!(usage, TokenUsage::new(11, 7));
    }

    #[test]
    fn test_response_format_defaults_to_strict() {
        let format: ResponseFormat =
            serde_json::from_value(json!({"name": "check", "schema": {}})).unwrap();
        assert!(format.strict);
        assert_eq!(
            ResponseFormat::json_schema("check", json!({})),
            format
        );
    }

    #[test]
    fn test_validate_drops_orphan_tool() {
        let messages = vec![
            Message::user("Do something"),
            Message::tool_result("call_x", "orphan"),
        ];
        let validated = validate_message_sequence(&messages);
        assert_eq!(validated, vec![Message::user("Do something")]);
    }

    #[test]
    fn test_validate_drops_tool_without_id() {
        let mut msg = Message::tool_result("call_1", "x");
        msg.tool_call_id = None;
        assert!(validate_message_sequence(&[msg]).is_empty());
    }

    #[test]
    fn test_validate_keeps_valid_pair() {
        let messages = vec![
            Message::user("go"),
            Message::assistant_with_tools(vec![ToolCall::new("call_1", "t", json!({}))]),
            Message::tool_result("call_1", "ok"),
            Message::assistant("done"),
        ];
        assert_eq!(validate_message_sequence(&messages).len(), 4);
    }

    #[test]
    fn test_validate_tool_before_its_call_is_orphan() {
        let messages = vec![
            Message::tool_result("call_1", "early"),
            Message::assistant_with_tools(vec![ToolCall::new("call_1", "t", json!({}))]),
        ];
        let validated = validate_message_sequence(&messages);
        assert_eq!(validated.len(), 1);
        assert_eq!(validated[0].role, "assistant");
    }

    #[tokio::test]
    async fn test_complete_with_format_default_delegates() {
        struct Echo;

        #[async_trait]
        impl Provider for Echo {
            async fn complete(
                &self,
                messages: &[Message],
                _tools: &[serde_json::Value],
            ) -> Result<CompletionResponse> {
                Ok(CompletionResponse::new(Message::assistant(format!(
                    "{} messages",
                    messages.len()
                ))))
            }
        }

        let format = ResponseFormat::json_schema("x", json!({}));
        let response = Echo
            .complete_with_format(&[Message::user("a")], &[], Some(&format))
            .await
            .unwrap();
        assert_eq!(response.message.content.as_deref(), Some("1 messages"));
        assert!(Echo.get_current_model().is_err());
        assert!(!Echo.get_provider_capabilities().supports_token_counts);
    }
}
