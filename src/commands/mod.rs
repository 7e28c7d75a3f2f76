/*!
Command handlers for the CLI

- `serve`  starts the web editor
- `review` reviews a draft from the terminal
- `task`   runs a project task target
*/

use crate::config::{ApprovalMode, Config};
use crate::editor::{ChatMessage, ChatRole, ReviewService};
use crate::error::{EditorError, Result};
use crate::tools::{AutoApprove, Confirmer, TerminalConfirmer};
use colored::Colorize;
use std::sync::Arc;

/// Process exit code for an error returned by a command
///
/// A failed task step exits with the step's own status; everything else
/// exits with 1.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<EditorError>() {
        Some(EditorError::TaskFailed { code: Some(code), .. }) => *code,
        _ => 1,
    }
}

fn confirmer_for(mode: ApprovalMode) -> Arc<dyn Confirmer> {
    match mode {
        ApprovalMode::Auto => Arc::new(AutoApprove),
        ApprovalMode::Interactive => Arc::new(TerminalConfirmer),
    }
}

/// Render one chat entry for the terminal
pub fn format_chat_message(message: &ChatMessage) -> String {
    match message.role {
        ChatRole::User => format!("{} {}", "writer>".green().bold(), message.content),
        ChatRole::Assistant => format!("{} {}", "editor>".cyan().bold(), message.content),
    }
}

// Web editor
pub mod serve {
    use super::*;

    /// Start the web editor
    ///
    /// `host` overrides `ui.host`.
    pub async fn run_serve(mut config: Config, host: Option<String>) -> Result<()> {
        if let Some(host) = host {
            config.ui.host = host;
        }

        let review = ReviewService::from_config(&config, confirmer_for(config.editor.approval))?;
        crate::web::serve(&config, review).await
    }
}

// Terminal review
pub mod review {
    use super::*;
    use crate::article::ArticleDraft;
    use std::path::Path;

    /// Options of `qiita-editor review`
    #[derive(Debug, Clone)]
    pub struct ReviewOptions {
        /// Article title
        pub title: String,
        /// Space separated tags
        pub tags: String,
        /// Markdown file with the body
        pub body: std::path::PathBuf,
        /// Publish publicly
        pub public: bool,
        /// Slide mode
        pub slide: bool,
        /// Ask before publishing
        pub interactive: bool,
    }

    /// Build a draft from CLI options
    ///
    /// # Errors
    ///
    /// Returns error if the body file cannot be read
    pub fn load_draft(options: &ReviewOptions) -> Result<ArticleDraft> {
        let body = read_body(&options.body)?;
        Ok(ArticleDraft {
            title: options.title.clone(),
            tags: options.tags.clone(),
            body,
            private: !options.public,
            slide: options.slide,
        })
    }

    fn read_body(path: &Path) -> Result<String> {
        std::fs::read_to_string(path).map_err(|e| {
            EditorError::Config(format!("Failed to read body {}: {}", path.display(), e)).into()
        })
    }

    /// Review a draft and print the conversation as it grows
    pub async fn run_review(config: Config, options: ReviewOptions) -> Result<()> {
        let draft = load_draft(&options)?;
        let mode = if options.interactive {
            ApprovalMode::Interactive
        } else {
            config.editor.approval
        };
        let service = ReviewService::from_config(&config, confirmer_for(mode))?;

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Vec<ChatMessage>>();
        let printer = tokio::spawn(async move {
            let mut printed = 0;
            while let Some(history) = rx.recv().await {
                for message in history.iter().skip(printed) {
                    println!("{}", format_chat_message(message));
                }
                printed = printed.max(history.len());
            }
        });

        service.review_and_post(&draft, Vec::new(), Some(&tx)).await;
        drop(tx);
        printer
            .await
            .map_err(|e| EditorError::Tool(format!("Output task failed: {}", e)))?;

        Ok(())
    }
}

// Project tasks
pub mod task {
    use super::*;
    use crate::tasks::{resolve_task, TaskRunner};

    /// Run a task target
    ///
    /// # Errors
    ///
    /// Returns `EditorError::UnknownTask` for an undefined target and
    /// `EditorError::TaskFailed` when a step fails; see [`exit_code`].
    pub async fn run_task(config: &Config, name: &str, dry_run: bool) -> Result<()> {
        let spec = resolve_task(name, &config.tasks.targets)?;
        let runner = TaskRunner::from_config(&config.tasks)?.dry_run(dry_run);
        let report = runner.run(&spec).await?;

        if report.dry_run {
            for line in &report.executed {
                println!("{}", line);
            }
        } else {
            tracing::info!(
                "Task '{}' finished ({} steps)",
                report.task,
                report.executed.len()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_from_task_failure() {
        let err: anyhow::Error = EditorError::TaskFailed {
            task: "lint".to_string(),
            step: "cargo clippy".to_string(),
            code: Some(101),
        }
        .into();
        assert_eq!(exit_code(&err), 101);
    }

    #[test]
    fn test_exit_code_defaults_to_one() {
        let signal: anyhow::Error = EditorError::TaskFailed {
            task: "run".to_string(),
            step: "cargo run".to_string(),
            code: None,
        }
        .into();
        assert_eq!(exit_code(&signal), 1);

        let other: anyhow::Error = EditorError::Config("bad".to_string()).into();
        assert_eq!(exit_code(&other), 1);
    }

    #[test]
    fn test_format_chat_message_keeps_content() {
        colored::control::set_override(false);
        let line = format_chat_message(&ChatMessage::assistant("投稿しました"));
        assert_eq!(line, "editor> 投稿しました");
    }

    #[test]
    fn test_load_draft_reads_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("draft.md");
        std::fs::write(&path, "# 本文\n").unwrap();

        let draft = review::load_draft(&review::ReviewOptions {
            title: "T".to_string(),
            tags: "rust".to_string(),
            body: path,
            public: true,
            slide: false,
            interactive: false,
        })
        .unwrap();

        assert_eq!(draft.body, "# 本文\n");
        assert!(!draft.private);
    }

    #[test]
    fn test_load_draft_missing_body() {
        let err = review::load_draft(&review::ReviewOptions {
            title: "T".to_string(),
            tags: String::new(),
            body: "/nonexistent/draft.md".into(),
            public: false,
            slide: false,
            interactive: false,
        })
        .unwrap_err();
        assert!(err.to_string().contains("Failed to read body"));
    }
}
