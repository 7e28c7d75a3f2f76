//! Test utilities for qiita-editor
//!
//! Scripted provider and message helpers shared by unit tests.

use crate::error::Result;
use crate::providers::{
    CompletionResponse, Message, Provider, ResponseFormat, TokenUsage, ToolCall,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A request captured by [`MockProvider`]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Messages sent, including the system message
    pub messages: Vec<Message>,
    /// Tool definitions sent
    pub tools: Vec<serde_json::Value>,
    /// Requested response format
    pub format: Option<ResponseFormat>,
}

impl RecordedRequest {
    /// Names of the tools offered in this request
    pub fn tool_names(&self) -> Vec<String> {
        self.tools
            .iter()
            .filter_map(|t| t["name"].as_str().map(str::to_string))
            .collect()
    }
}

#[derive(Default)]
struct MockState {
    responses: VecDeque<Message>,
    repeat: Option<Message>,
    requests: Vec<RecordedRequest>,
}

/// Provider that replays scripted responses and records every request
///
/// Once the script is exhausted it answers `"Done"`, or repeats the message
/// given to [`MockProvider::repeating`].
#[derive(Clone, Default)]
pub struct MockProvider {
    state: Arc<Mutex<MockState>>,
    delay: Option<Duration>,
    usage: Option<TokenUsage>,
}

impl MockProvider {
    /// Replay `responses` in order
    pub fn new(responses: Vec<Message>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                responses: responses.into(),
                ..Default::default()
            })),
            ..Default::default()
        }
    }

    /// Answer every request with the same message
    pub fn repeating(message: Message) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                repeat: Some(message),
                ..Default::default()
            })),
            ..Default::default()
        }
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Report the same usage on every response
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Number of completions served
    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }
}

#[async_trait]
impl Provider for MockProvider {
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
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let message = {
            let mut state = self.state.lock().unwrap();
            state.requests.push(RecordedRequest {
                messages: messages.to_vec(),
                tools: tools.to_vec(),
                format: format.cloned(),
            });
            match state.responses.pop_front() {
                Some(message) => message,
                None => state
                    .repeat
                    .clone()
                    .unwrap_or_else(|| Message::assistant("Done")),
            }
        };

        Ok(match self.usage {
            Some(usage) => CompletionResponse::with_usage(message, usage),
            None => CompletionResponse::new(message),
        })
    }
}

/// Assistant message requesting a single tool call
pub fn tool_call_message(id: &str, name: &str, args: serde_json::Value) -> Message {
    Message::assistant_with_tools(vec![ToolCall::new(id, name, args)])
}
