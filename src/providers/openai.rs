//! OpenAI Chat Completions provider
//!
//! Sends the conversation to `POST {api_base}/chat/completions` with bearer
//! authentication. Tool schemas are wrapped as `function` tools and a
//! requested response format is sent as a strict `json_schema`.

use crate::config::OpenAiConfig;
use crate::error::{EditorError, Result};
use crate::providers::{
    CompletionResponse, FunctionCall, Message, Provider, ProviderCapabilities, ResponseFormat,
    TokenUsage, ToolCall,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// OpenAI provider
///
/// # Examples
///
/// ```
/// use qiita_editor::config::OpenAiConfig;
/// use qiita_editor::providers::OpenAiProvider;
///
/// let config = OpenAiConfig {
///     api_key: Some("sk-test".to_string()),
///     ..Default::default()
/// };
/// assert!(OpenAiProvider::new(config).is_ok());
/// ```
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ChatTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ChatResponseFormat<'a>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ChatToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatTool {
    r#type: &'static str,
    function: ChatFunction,
}

#[derive(Debug, Serialize)]
struct ChatFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatToolCall {
    id: String,
    #[serde(default = "function_type")]
    r#type: String,
    function: ChatFunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ChatResponseFormat<'a> {
    r#type: &'static str,
    json_schema: &'a ResponseFormat,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

fn format_api_error(status: reqwest::StatusCode, body: &str) -> EditorError {
    let detail = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.to_string());
    EditorError::Provider(format!("OpenAI returned error {}: {}", status, detail))
}

impl OpenAiProvider {
    /// Create a new OpenAI provider
    ///
    /// A missing API key is accepted here and reported on the first
    /// completion, so the editor UI can start without credentials.
    ///
    /// # Errors
    ///
    /// Returns `EditorError::Provider` if the HTTP client cannot be built
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let api_key = config.api_key.clone().filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY is not set; reviews will fail until it is configured");
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("qiita-editor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EditorError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!("Initialized OpenAI provider: model={}", config.model);

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    /// Whether an API key is configured
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        )
    }

    fn convert_messages(&self, messages: &[Message]) -> Vec<ChatMessage> {
        crate::providers::validate_message_sequence(messages)
            .into_iter()
            .filter(|m| m.content.is_some() || m.tool_calls.is_some())
            .map(|m| ChatMessage {
                role: m.role,
                content: m.content,
                tool_calls: m.tool_calls.map(|calls| {
                    calls
                        .into_iter()
                        .map(|tc| ChatToolCall {
                            id: tc.id,
                            r#type: function_type(),
                            function: ChatFunctionCall {
                                name: tc.function.name,
                                arguments: tc.function.arguments,
                            },
                        })
                        .collect()
                }),
                tool_call_id: m.tool_call_id,
            })
            .collect()
    }

    fn convert_tools(&self, tools: &[serde_json::Value]) -> Vec<ChatTool> {
        tools
            .iter()
            .filter_map(|t| {
                let obj = t.as_object()?;
                Some(ChatTool {
                    r#type: "function",
                    function: ChatFunction {
                        name: obj.get("name")?.as_str()?.to_string(),
                        description: obj
                            .get("description")
                            .and_then(|d| d.as_str())
                            .unwrap_or_default()
                            .to_string(),
                        parameters: obj.get("parameters")?.clone(),
                    },
                })
            })
            .collect()
    }

    fn convert_response_message(&self, msg: ChatMessage) -> Message {
        match msg.tool_calls {
            Some(calls) if !calls.is_empty() => {
                let mut message = Message::assistant_with_tools(
                    calls
                        .into_iter()
                        .map(|tc| ToolCall {
                            id: tc.id,
                            function: FunctionCall {
                                name: tc.function.name,
                                arguments: tc.function.arguments,
                            },
                        })
                        .collect(),
                );
                message.content = msg.content.filter(|c| !c.is_empty());
                message
            }
            _ => Message::assistant(msg.content.unwrap_or_default()),
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[serde_json::Value],
    ) -> Result<CompletionResponse> {
        self.complete_with_format(messages, tools, None).await
    }

    async fn complete_with_format(
        &self,
        messages: &[Message],
        tools: &[serde_json::Value],
        format: Option<&ResponseFormat>,
    ) -> Result<CompletionResponse> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| EditorError::MissingCredentials("openai".to_string()))?;

        let request = ChatRequest {
            model: &self.config.model,
            messages: self.convert_messages(messages),
            tools: self.convert_tools(tools),
            response_format: format.map(|f| ChatResponseFormat {
                r#type: "json_schema",
                json_schema: f,
            }),
        };

        tracing::debug!(
            "Sending OpenAI request: {} messages, {} tools, structured={}",
            request.messages.len(),
            request.tools.len(),
            request.response_format.is_some()
        );

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("OpenAI request failed: {}", e);
                EditorError::Provider(format!("OpenAI request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("OpenAI returned error {}: {}", status, error_text);
            return Err(format_api_error(status, &error_text).into());
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse OpenAI response: {}", e);
            EditorError::Provider(format!("Failed to parse OpenAI response: {}", e))
        })?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| EditorError::Provider("No choices in OpenAI response".to_string()))?;

        let message = self.convert_response_message(choice.message);
        let usage = body
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens));

        Ok(match usage {
            Some(u) => CompletionResponse::with_usage(message, u),
            None => CompletionResponse::new(message),
        })
    }

    fn get_current_model(&self) -> Result<String> {
        Ok(self.config.model.clone())
    }

    fn get_provider_capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            supports_token_counts: true,
            supports_structured_output: true,
            supports_streaming: false,
        }
    }
}
