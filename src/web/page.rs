//! Editor page
//!
//! A single HTML document with the draft form on the left and the
//! message and preview tabs on the right. It talks to `/api/preview` and
//! `/api/review`.

use askama::Template;

use crate::config::UiConfig;
use crate::editor::ChatMessage;
use crate::error::Result;

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    preview_height: usize,
    editor_lines: usize,
    max_tags: usize,
    preview: String,
    history_json: String,
}

/// Render the editor page
///
/// # Errors
///
/// Returns error if the welcome message cannot be serialized or the
/// template fails to render
pub fn render_page(ui: &UiConfig, max_tags: usize, welcome: &ChatMessage) -> Result<String> {
    // Keeps "</script>" inside message text from closing the script block
    let history_json = serde_json::to_string(&[welcome])?.replace("</", "<\\/");

    let template = IndexTemplate {
        preview_height: ui.preview_height,
        editor_lines: ui.editor_lines,
        max_tags,
        preview: super::markdown::empty_preview(),
        history_json,
    };

    template.render().map_err(|e| {
        tracing::error!("Template render error: {}", e);
        anyhow::anyhow!("Template render error: {}", e)
    })
}
