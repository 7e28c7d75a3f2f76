//! `publish_to_platform` tool
//!
//! Posts the article held in the run context. The model only chooses the
//! platform; title, body and tags come from the validated draft.

use crate::article::ArticleInformation;
use crate::error::{EditorError, Result};
use crate::qiita::QiitaClient;
use crate::tools::{ToolExecutor, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

/// Platforms the tool can post to
pub const SUPPORTED_PLATFORMS: &[&str] = &["qiita"];

/// Tool name the publisher agent calls
pub const PUBLISH_TOOL: &str = "publish_to_platform";

#[derive(Debug, Deserialize)]
struct PublishInput {
    platform: String,
}

/// Publishes the context article
pub struct PublishTool {
    article: Arc<ArticleInformation>,
    qiita: QiitaClient,
}

impl PublishTool {
    /// Create the tool for one article
    pub fn new(article: Arc<ArticleInformation>, qiita: QiitaClient) -> Self {
        Self { article, qiita }
    }
}

#[async_trait]
impl ToolExecutor for PublishTool {
    fn tool_definition(&self) -> serde_json::Value {
        serde_json::json!({
            "name": PUBLISH_TOOL,
            "description": "Publish the reviewed article to the given platform. Returns the created item's id, url and title.",
            "parameters": {
                "type": "object",
                "properties": {
                    "platform": {
                        "type": "string",
                        "enum": SUPPORTED_PLATFORMS,
                        "description": "Target platform"
                    }
                },
                "required": ["platform"],
                "additionalProperties": false
            }
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<ToolResult> {
        let input: PublishInput = match serde_json::from_value(args) {
            Ok(input) => input,
            Err(e) => return Ok(ToolResult::error(format!("Invalid input: {}", e))),
        };

        if !SUPPORTED_PLATFORMS.contains(&input.platform.as_str()) {
            tracing::warn!(
                "{}",
                EditorError::UnsupportedPlatform(input.platform.clone())
            );
            return Ok(ToolResult::error(format!(
                "その媒体はサポートしていません: {}",
                input.platform
            )));
        }

        match self.qiita.create_item(&self.article).await {
            Ok(item) => {
                tracing::info!("Published '{}' at {}", item.title, item.url);
                let output = serde_json::json!({
                    "id": item.id,
                    "url": item.url,
                    "title": item.title,
                });
                Ok(ToolResult::success(output.to_string()).with_metadata("url", item.url))
            }
            Err(err) => {
                tracing::error!("Publishing failed: {}", err);
                Ok(ToolResult::error(format!("投稿に失敗しました: {}", err)))
            }
        }
    }
}
