//! Article drafts and the validated publishing payload

use crate::error::{EditorError, Result};
use serde::{Deserialize, Serialize};

/// Tag attached to a Qiita article
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTag {
    /// Tag name
    pub name: String,
    /// Version constraints, always empty when posted from the editor
    #[serde(default)]
    pub versions: Vec<String>,
}

impl ItemTag {
    /// Create a tag without versions
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            versions: Vec::new(),
        }
    }
}

/// Split a space separated tag field into tags
///
/// Empty fragments from repeated or surrounding spaces are dropped.
///
/// # Examples
///
/// ```
/// use qiita_editor::article::parse_tags;
///
/// let tags = parse_tags("  rust  tokio ");
/// let names: Vec<_> = tags.iter().map(|t| t.name.as_str()).collect();
/// assert_eq!(names, ["rust", "tokio"]);
/// ```
pub fn parse_tags(raw: &str) -> Vec<ItemTag> {
    raw.split(' ')
        .filter(|fragment| !fragment.is_empty())
        .map(ItemTag::new)
        .collect()
}

/// Validated article ready to be posted
///
/// Serializes to the body of Qiita's create-item request. The model never
/// sees this value; tools receive it by reference so the text cannot be
/// altered on the way to publishing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleInformation {
    /// Trimmed article title
    pub title: String,
    /// Markdown body, verbatim
    pub body: String,
    /// Tags
    pub tags: Vec<ItemTag>,
    /// Limited sharing
    #[serde(default = "default_private")]
    pub private: bool,
    /// Announce on X when publishing
    #[serde(default)]
    pub tweet: bool,
    /// Slide mode
    #[serde(default)]
    pub slide: bool,
}

fn default_private() -> bool {
    true
}

/// Raw editor input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleDraft {
    /// Title as typed
    #[serde(default)]
    pub title: String,
    /// Space separated tags as typed
    #[serde(default)]
    pub tags: String,
    /// Markdown body
    #[serde(default)]
    pub body: String,
    /// Limited sharing
    #[serde(default = "default_private")]
    pub private: bool,
    /// Slide mode
    #[serde(default)]
    pub slide: bool,
}

impl Default for ArticleDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            tags: String::new(),
            body: String::new(),
            private: default_private(),
            slide: false,
        }
    }
}

impl ArticleDraft {
    /// Check the draft and build the publishing payload
    ///
    /// Checks run in order: empty title, empty body, too many tags. The
    /// first failure wins.
    ///
    /// # Errors
    ///
    /// Returns `EditorError::Validation` carrying the message shown to the
    /// writer.
    pub fn validate(&self, max_tags: usize) -> Result<ArticleInformation> {
        if self.title.trim().is_empty() {
            return Err(EditorError::Validation(
                "タイトルが空です。タイトルを入力してください。".to_string(),
            )
            .into());
        }

        if self.body.trim().is_empty() {
            return Err(EditorError::Validation(
                "本文が空です。本文を入力してください。".to_string(),
            )
            .into());
        }

        let tags = parse_tags(&self.tags);
        if tags.len() > max_tags {
            return Err(EditorError::Validation(format!(
                "タグが多すぎます。{} 以下にしてください。",
                max_tags
            ))
            .into());
        }

        Ok(ArticleInformation {
            title: self.title.trim().to_string(),
            body: self.body.clone(),
            tags,
            private: self.private,
            tweet: false,
            slide: self.slide,
        })
    }

    /// JSON handed to the editor agent
    ///
    /// Non-ASCII text is emitted as-is.
    pub fn agent_input(&self) -> String {
        serde_json::json!({
            "platform": "qiita",
            "title": self.title,
            "tags": self.tags,
            "body": self.body,
            "slide_flag": self.slide,
        })
        .to_string()
    }
}
