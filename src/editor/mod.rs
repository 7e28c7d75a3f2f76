//! Editorial workflow
//!
//! A review runs the editor agent, which consults three checker agents
//! (exposed as tools) and, when all of them accept, hands the article to
//! the publisher. The publisher asks for approval and posts to Qiita.
//!
//! The article text given to the model is informational only. What gets
//! published is the validated [`ArticleInformation`] held by the
//! publishing tool.

pub mod check;

pub use check::{CheckResult, CheckStatus, CHECK_RESULT_SCHEMA};

use crate::agent::{Agent, Runner};
use crate::article::{ArticleDraft, ArticleInformation};
use crate::config::Config;
use crate::error::{EditorError, Result};
use crate::prompts;
use crate::providers::create_provider;
use crate::qiita::QiitaClient;
use crate::tools::{AgentTool, ConfirmTool, Confirmer, PublishTool, ToolRegistry, PUBLISH_TOOL};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Name of the agent that receives the draft
pub const EDITOR_AGENT: &str = "editor";
/// Name of the agent that approves and publishes
pub const PUBLISHER_AGENT: &str = "publisher";

/// Acknowledgement shown right after the writer's request
pub const ACKNOWLEDGEMENT: &str = "はい、チェックしてから投稿しますね";
/// Placeholder shown while the agents work
pub const PLACEHOLDER: &str = "・・・";

/// Speaker of a chat-pane entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// The writer
    User,
    /// The editorial team
    Assistant,
}

/// One entry of the chat pane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who said it
    pub role: ChatRole,
    /// Text as shown to the writer
    pub content: String,
}

impl ChatMessage {
    /// Entry written by the writer
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// Entry written by the editorial team
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// First message of an empty chat pane
pub fn welcome_message() -> ChatMessage {
    ChatMessage::assistant(
        "原稿を入力したら「チェック＆投稿」ボタンを押してください。\n\
         内容に問題がなければ Qiita に投稿します。",
    )
}

fn checker(name: &str, instructions: String) -> Arc<Agent> {
    Arc::new(Agent::new(name, instructions).with_output(CheckResult::response_format()))
}

/// Assemble the editor agent and everything reachable from it
///
/// The returned editor carries the three checker tools and a single
/// handoff to the publisher, whose tools are `confirm_to_human` and
/// `publish_to_platform` bound to `article`.
pub fn build_editorial_team(
    article: Arc<ArticleInformation>,
    runner: &Runner,
    qiita: QiitaClient,
    confirmer: Arc<dyn Confirmer>,
) -> Agent {
    let mut publisher_tools = ToolRegistry::new();
    publisher_tools.register_tool(Arc::new(ConfirmTool::new(confirmer)));
    publisher_tools.register_tool(Arc::new(PublishTool::new(article, qiita)));

    let publisher = Agent::new(PUBLISHER_AGENT, prompts::PUBLISHER_INSTRUCTIONS)
        .with_description("公開の可否を最終判断し、記事を媒体に投稿します")
        .with_tools(publisher_tools);

    let checkers = [
        (
            "readability_checker",
            prompts::readability_instructions(),
            "readability_check_tool",
            "記事が読者にとって読みやすいかどうかを判定します",
        ),
        (
            "quality_checker",
            prompts::quality_instructions(),
            "quality_check_tool",
            "記事の質と正確性を判定します",
        ),
        (
            "code_format_checker",
            prompts::code_format_instructions(),
            "code_format_check_tool",
            "コードのフォーマットや読みやすさを判定します",
        ),
    ];

    let mut editor_tools = ToolRegistry::new();
    for (agent_name, instructions, tool_name, description) in checkers {
        editor_tools.register_tool(Arc::new(AgentTool::new(
            checker(agent_name, instructions),
            runner.clone(),
            tool_name,
            description,
        )));
    }

    Agent::new(EDITOR_AGENT, prompts::EDITOR_INSTRUCTIONS)
        .with_description("原稿をチェック者に確認させ、公開責任者へ引き継ぎます")
        .with_tools(editor_tools)
        .with_handoff(Arc::new(publisher))
}

/// Runs reviews for the web UI and the CLI
///
/// Cheap to clone; every review builds its own agent team.
#[derive(Clone)]
pub struct ReviewService {
    runner: Runner,
    qiita: QiitaClient,
    confirmer: Arc<dyn Confirmer>,
    max_tags: usize,
}

impl ReviewService {
    /// Create a service from its parts
    pub fn new(
        runner: Runner,
        qiita: QiitaClient,
        confirmer: Arc<dyn Confirmer>,
        max_tags: usize,
    ) -> Self {
        Self {
            runner,
            qiita,
            confirmer,
            max_tags,
        }
    }

    /// Create a service from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the provider or the Qiita client cannot be created
    pub fn from_config(config: &Config, confirmer: Arc<dyn Confirmer>) -> Result<Self> {
        let provider = create_provider(&config.provider.provider_type, &config.provider)?;
        let runner = Runner::new(provider, config.agent.clone());
        let qiita = QiitaClient::new(&config.qiita)?;
        if !qiita.has_token() {
            tracing::warn!("QIITA_API_ACCESS_TOKEN is not set; publishing will fail");
        }

        Ok(Self::new(
            runner,
            qiita,
            confirmer,
            config.editor.max_article_tags,
        ))
    }

    /// Review a draft and post it when the team approves
    ///
    /// Appends to `history` and returns it. Intermediate states are sent to
    /// `progress` when given. Failures never escape: validation messages
    /// and run errors are appended as assistant messages.
    pub async fn review_and_post(
        &self,
        draft: &ArticleDraft,
        mut history: Vec<ChatMessage>,
        progress: Option<&UnboundedSender<Vec<ChatMessage>>>,
    ) -> Vec<ChatMessage> {
        let publish = |history: &[ChatMessage]| {
            if let Some(tx) = progress {
                // A closed receiver only means nobody is watching.
                let _ = tx.send(history.to_vec());
            }
        };

        history.push(ChatMessage::user(format!(
            "「{}」を Qiita に投稿して",
            draft.title
        )));
        history.push(ChatMessage::assistant(ACKNOWLEDGEMENT));
        history.push(ChatMessage::assistant(PLACEHOLDER));
        publish(&history);

        let article = match draft.validate(self.max_tags) {
            Ok(article) => Arc::new(article),
            Err(err) => {
                let message = match err.downcast_ref::<EditorError>() {
                    Some(EditorError::Validation(message)) => message.clone(),
                    _ => err.to_string(),
                };
                tracing::info!("Draft rejected by validation: {}", message);
                history.push(ChatMessage::assistant(message));
                publish(&history);
                return history;
            }
        };

        let content = match self.run_team(article, draft.agent_input()).await {
            Ok(output) => output,
            Err(err) => {
                tracing::error!("Review failed: {:#}", err);
                format!("エラーが発生しました: {}", err)
            }
        };

        history.push(ChatMessage::assistant(content));
        publish(&history);
        history
    }

    async fn run_team(&self, article: Arc<ArticleInformation>, input: String) -> Result<String> {
        let team = build_editorial_team(
            article,
            &self.runner,
            self.qiita.clone(),
            Arc::clone(&self.confirmer),
        );

        let result = self.runner.run(&team, input).await?;
        tracing::info!(
            "Review finished by '{}' after {} turns ({} tokens)",
            result.last_agent,
            result.turns,
            result.usage.total_tokens
        );
        if result.trace.is_enabled() {
            tracing::debug!("Agent path: {}", result.trace.agent_path().join(" -> "));
        }
        if let Some(url) = result.trace.tool_metadata(PUBLISH_TOOL, "url") {
            tracing::info!("Article published at {}", url);
        }

        Ok(result.final_output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AgentConfig, QiitaConfig};
    use crate::providers::Message;
    use crate::test_utils::{tool_call_message, MockProvider};
    use crate::tools::{AutoApprove, Decision, FixedDecision};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn qiita(api_base: &str) -> QiitaClient {
        QiitaClient::new(&QiitaConfig {
            api_base: api_base.to_string(),
            access_token: Some("token".to_string()),
            ..Default::default()
        })
        .unwrap()
    }

    fn service(
        provider: &MockProvider,
        api_base: &str,
        confirmer: Arc<dyn Confirmer>,
    ) -> ReviewService {
        ReviewService::new(
            Runner::new(Arc::new(provider.clone()), AgentConfig::default()),
            qiita(api_base),
            confirmer,
            5,
        )
    }

    fn draft() -> ArticleDraft {
        ArticleDraft {
            title: "  Rust の所有権  ".to_string(),
            tags: "Rust 初心者".to_string(),
            body: "# 所有権\n\n```rust\nlet s = String::new();\n```".to_string(),
            ..Default::default()
        }
    }

    fn accept(name: &str) -> Message {
        Message::assistant(
            json!({"status": "accept", "name": name, "comment": "問題ありません"}).to_string(),
        )
    }

    #[test]
    fn test_team_shape() {
        let provider = MockProvider::default();
        let runner = Runner::new(Arc::new(provider), AgentConfig::default());
        let article = Arc::new(draft().validate(5).unwrap());
        let editor = build_editorial_team(
            article,
            &runner,
            qiita("http://localhost"),
            Arc::new(AutoApprove),
        );

        assert_eq!(editor.name, EDITOR_AGENT);
        assert_eq!(
            editor.tools.tool_names(),
            vec![
                "readability_check_tool",
                "quality_check_tool",
                "code_format_check_tool"
            ]
        );
        assert_eq!(editor.handoffs.len(), 1);

        let publisher = &editor.handoffs[0];
        assert_eq!(publisher.handoff_tool_name(), "transfer_to_publisher");
        assert_eq!(
            publisher.tools.tool_names(),
            vec!["confirm_to_human", "publish_to_platform"]
        );
    }

    #[test]
    fn test_welcome_message_is_from_assistant() {
        let welcome = welcome_message();
        assert_eq!(welcome.role, ChatRole::Assistant);
        assert!(welcome.content.contains("チェック＆投稿"));
    }

    #[tokio::test]
    async fn test_validation_failure_skips_agents() {
        let provider = MockProvider::default();
        let service = service(&provider, "http://localhost", Arc::new(AutoApprove));
        let draft = ArticleDraft {
            title: "タイトル".to_string(),
            ..Default::default()
        };

        let history = service
            .review_and_post(&draft, vec![welcome_message()], None)
            .await;

        assert_eq!(history.len(), 5);
        assert_eq!(history[1], ChatMessage::user("「タイトル」を Qiita に投稿して"));
        assert_eq!(history[2].content, ACKNOWLEDGEMENT);
        assert_eq!(history[3].content, PLACEHOLDER);
        assert_eq!(
            history[4].content,
            "本文が空です。本文を入力してください。"
        );
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_full_review_publishes_article() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/items"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "c0ffee",
                "url": "https://qiita.com/writer/items/c0ffee",
                "title": "Rust の所有権"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = MockProvider::new(vec![
            tool_call_message("c1", "readability_check_tool", json!({"input": "article"})),
            accept("readability"),
            tool_call_message("c2", "quality_check_tool", json!({"input": "article"})),
            accept("quality"),
            tool_call_message("c3", "code_format_check_tool", json!({"input": "article"})),
            accept("code_format"),
            tool_call_message("c4", "transfer_to_publisher", json!({})),
            tool_call_message("c5", "confirm_to_human", json!({"message": "公開しますか？"})),
            tool_call_message("c6", "publish_to_platform", json!({"platform": "qiita"})),
            Message::assistant(
                "accept: すべてのチェックを通過しました。https://qiita.com/writer/items/c0ffee",
            ),
        ]);
        let service = service(&provider, &server.uri(), Arc::new(AutoApprove));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let history = service
            .review_and_post(&draft(), vec![welcome_message()], Some(&tx))
            .await;

        let last = history.last().unwrap();
        assert_eq!(last.role, ChatRole::Assistant);
        assert!(last.content.contains("https://qiita.com/writer/items/c0ffee"));

        let first_update = rx.recv().await.unwrap();
        assert_eq!(first_update.last().unwrap().content, PLACEHOLDER);
        let final_update = rx.recv().await.unwrap();
        assert_eq!(final_update, history);

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["title"], "Rust の所有権");
        assert_eq!(body["tags"][1]["name"], "初心者");
        assert_eq!(body["private"], true);

        let editor_input = &provider.requests()[0].messages[1];
        let input: serde_json::Value =
            serde_json::from_str(editor_input.content.as_deref().unwrap()).unwrap();
        assert_eq!(input["platform"], "qiita");
        assert_eq!(input["tags"], "Rust 初心者");
        assert!(editor_input.content.as_deref().unwrap().contains("所有権"));
    }

    #[tokio::test]
    async fn test_rejected_confirmation_does_not_publish() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let provider = MockProvider::new(vec![
            tool_call_message("c1", "transfer_to_publisher", json!({})),
            tool_call_message("c2", "confirm_to_human", json!({"message": "公開しますか？"})),
            Message::assistant("reject: 第三者が公開を認めませんでした。"),
        ]);
        let service = service(
            &provider,
            &server.uri(),
            Arc::new(FixedDecision(Decision::Reject)),
        );

        let history = service.review_and_post(&draft(), Vec::new(), None).await;

        assert!(history.last().unwrap().content.starts_with("reject"));
        let confirm_result = provider.requests()[2]
            .messages
            .iter()
            .rev()
            .find(|m| m.role == "tool")
            .and_then(|m| m.content.clone())
            .unwrap();
        assert_eq!(confirm_result, "reject");
    }

    #[tokio::test]
    async fn test_run_error_becomes_chat_message() {
        let provider = MockProvider::repeating(tool_call_message(
            "loop",
            "readability_check_tool",
            json!({"input": ""}),
        ));
        let mut config = AgentConfig::default();
        config.max_turns = 2;
        let service = ReviewService::new(
            Runner::new(Arc::new(provider), config),
            qiita("http://localhost"),
            Arc::new(AutoApprove),
            5,
        );

        let history = service.review_and_post(&draft(), Vec::new(), None).await;

        let last = &history.last().unwrap().content;
        assert!(last.starts_with("エラーが発生しました"));
        assert!(last.contains("limit=2"));
    }
}
