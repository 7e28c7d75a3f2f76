//! Markdown preview rendering

use pulldown_cmark::{html, Event, Options, Parser};

/// Render Markdown to HTML for the preview pane
///
/// Single newlines become `<br />` like Qiita's editor. Raw HTML in the
/// source is shown as text.
///
/// # Examples
///
/// ```
/// use qiita_editor::web::render_preview;
///
/// assert_eq!(render_preview("a\nb"), "<p>a<br />\nb</p>\n");
/// ```
pub fn render_preview(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_FOOTNOTES);

    let events = Parser::new_ext(markdown, options).map(|event| match event {
        Event::SoftBreak => Event::HardBreak,
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut output = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut output, events);
    output
}

/// Placeholder shown before anything is typed
pub(crate) fn empty_preview() -> String {
    render_preview("# プレビュー\n\nここに本文のプレビューが表示されます")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_break_is_hard_break() {
        let html = render_preview("line one\nline two");
        assert!(html.contains("line one<br />"));
    }

    #[test]
    fn test_code_block_is_escaped() {
        let html = render_preview("```rust\nlet x = a < b;\n```");
        assert!(html.contains("language-rust"));
        assert!(html.contains("a &lt; b"));
    }

    #[test]
    fn test_raw_html_is_not_rendered() {
        let html = render_preview("<script>alert(1)</script>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_tables_enabled() {
        let html = render_preview("| a | b |\n|---|---|\n| 1 | 2 |");
        assert!(html.contains("<table>"));
    }

    #[test]
    fn test_empty_preview_has_heading() {
        assert!(empty_preview().contains("<h1>プレビュー</h1>"));
    }
}
