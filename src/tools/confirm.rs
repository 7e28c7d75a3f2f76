//! Human confirmation gate used by the publisher
//!
//! `confirm_to_human` asks a [`Confirmer`] whether the article may go out.
//! The web UI runs with [`AutoApprove`], which accepts everything; the
//! terminal review can ask interactively.

use crate::error::{EditorError, Result};
use crate::tools::{ToolExecutor, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

/// Answer of the human (or stand-in)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Publishing approved
    Accept,
    /// Publishing refused
    Reject,
}

impl Decision {
    /// Wire form returned to the model
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Reject => "reject",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of publishing decisions
#[async_trait]
pub trait Confirmer: Send + Sync {
    /// Ask whether to proceed
    async fn confirm(&self, message: &str) -> Result<Decision>;
}

/// Accepts every request without asking
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

#[async_trait]
impl Confirmer for AutoApprove {
    async fn confirm(&self, message: &str) -> Result<Decision> {
        tracing::info!("Auto-approving: {}", message);
        Ok(Decision::Accept)
    }
}

/// Always answers with a fixed decision
#[derive(Debug, Clone, Copy)]
pub struct FixedDecision(pub Decision);

#[async_trait]
impl Confirmer for FixedDecision {
    async fn confirm(&self, _message: &str) -> Result<Decision> {
        Ok(self.0)
    }
}

/// Asks on the controlling terminal
///
/// Only `y` or `yes` accepts; anything else, including Ctrl-C and EOF,
/// rejects.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalConfirmer;

#[async_trait]
impl Confirmer for TerminalConfirmer {
    async fn confirm(&self, message: &str) -> Result<Decision> {
        use colored::Colorize;
        use rustyline::error::ReadlineError;
        use rustyline::DefaultEditor;

        let question = message.to_string();
        let decision = tokio::task::spawn_blocking(move || -> Result<Decision> {
            println!("\n{}\n{}", "Publishing request".bold().yellow(), question);
            let mut rl = DefaultEditor::new()?;
            match rl.readline("Publish? [y/N] ") {
                Ok(line) => Ok(parse_answer(&line)),
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(Decision::Reject),
                Err(err) => Err(EditorError::Tool(format!("Readline error: {}", err)).into()),
            }
        })
        .await
        .map_err(|e| EditorError::Tool(format!("Confirmation prompt failed: {}", e)))??;

        Ok(decision)
    }
}

fn parse_answer(line: &str) -> Decision {
    match line.trim().to_lowercase().as_str() {
        "y" | "yes" => Decision::Accept,
        _ => Decision::Reject,
    }
}

#[derive(Debug, Deserialize)]
struct ConfirmInput {
    message: String,
}

/// `confirm_to_human` tool
pub struct ConfirmTool {
    confirmer: Arc<dyn Confirmer>,
}

impl ConfirmTool {
    /// Create the tool around a decision source
    pub fn new(confirmer: Arc<dyn Confirmer>) -> Self {
        Self { confirmer }
    }
}

#[async_trait]
impl ToolExecutor for ConfirmTool {
    fn tool_definition(&self) -> serde_json::Value {
        serde_json::json!({
            "name": "confirm_to_human",
            "description": "Ask a human whether the article may be published. Returns accept or reject.",
            "parameters": {
                "type": "object",
                "properties": {
                    "message": {
                        "type": "string",
                        "description": "Question for the human"
                    }
                },
                "required": ["message"],
                "additionalProperties": false
            }
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<ToolResult> {
        let input: ConfirmInput = match serde_json::from_value(args) {
            Ok(input) => input,
            Err(e) => return Ok(ToolResult::error(format!("Invalid input: {}", e))),
        };

        let decision = self.confirmer.confirm(&input.message).await?;
        tracing::info!("Human decision: {}", decision);
        Ok(ToolResult::success(decision.as_str()))
    }
}
