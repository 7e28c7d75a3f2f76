//! Qiita API v2 client
//!
//! Only item creation is needed: the publisher posts a reviewed article and
//! reports the resulting URL back to the writer.

use crate::article::{ArticleInformation, ItemTag};
use crate::config::QiitaConfig;
use crate::error::{EditorError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Item returned by `POST /api/v2/items`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QiitaItem {
    /// Item id
    pub id: String,
    /// Public URL of the item
    pub url: String,
    /// Title as stored by Qiita
    pub title: String,
    /// Creation timestamp
    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::FixedOffset>>,
    /// Limited sharing flag
    #[serde(default)]
    pub private: bool,
    /// Tags as stored by Qiita
    #[serde(default)]
    pub tags: Vec<ItemTag>,
    /// Slide mode flag
    #[serde(default)]
    pub slide: bool,
}

/// Error body returned by the Qiita API
#[derive(Debug, Deserialize)]
struct QiitaErrorBody {
    message: String,
    #[serde(rename = "type")]
    kind: Option<String>,
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<QiitaErrorBody>(body) {
        Ok(QiitaErrorBody {
            message,
            kind: Some(kind),
        }) => format!("{} ({})", message, kind),
        Ok(QiitaErrorBody { message, kind: None }) => message,
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.to_string(),
    }
}

/// Client for the Qiita API
#[derive(Debug, Clone)]
pub struct QiitaClient {
    client: Client,
    api_base: String,
    access_token: Option<String>,
}

impl QiitaClient {
    /// Build a client from configuration
    ///
    /// A missing token is accepted here and reported when posting, so the
    /// editor can still review drafts without Qiita credentials.
    pub fn new(config: &QiitaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("qiita-editor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EditorError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            access_token: config
                .access_token
                .clone()
                .filter(|token| !token.trim().is_empty()),
        })
    }

    /// Whether an access token is configured
    pub fn has_token(&self) -> bool {
        self.access_token.is_some()
    }

    /// Post a new item
    ///
    /// # Errors
    ///
    /// - `EditorError::MissingCredentials` when no token is configured; no
    ///   request is sent
    /// - `EditorError::Qiita` for a non-success status
    /// - `EditorError::Http` for transport failures
    pub async fn create_item(&self, article: &ArticleInformation) -> Result<QiitaItem> {
        let token = self
            .access_token
            .as_deref()
            .ok_or_else(|| EditorError::MissingCredentials("qiita".to_string()))?;

        let url = format!("{}/api/v2/items", self.api_base);
        tracing::info!(
            "Posting '{}' to Qiita (private={}, tags={})",
            article.title,
            article.private,
            article.tags.len()
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(article)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Qiita returned error {}: {}", status, body);
            return Err(EditorError::Qiita {
                status: status.as_u16(),
                message: error_message(&body),
            }
            .into());
        }

        let item: QiitaItem = response.json().await?;
        tracing::info!("Created Qiita item {} at {}", item.id, item.url);
        Ok(item)
    }
}
