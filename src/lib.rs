//! qiita-editor - AI agents review blog drafts and publish them to Qiita
//!
//! The library is organized into the following modules:
//!
//! - `agent`: Agent profiles, the run loop with handoffs, and run tracing
//! - `providers`: LLM provider abstraction and the OpenAI implementation
//! - `tools`: Tool registry and the editorial tools (checkers, approval, publishing)
//! - `editor`: The editorial team and the review workflow
//! - `article`: Draft validation and the publishing payload
//! - `qiita`: Qiita API v2 client
//! - `web`: Web UI server
//! - `tasks`: Project task runner (`run`, `lint`)
//! - `env_file`: `.env` parsing
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use qiita_editor::article::ArticleDraft;
//! use qiita_editor::editor::ReviewService;
//! use qiita_editor::tools::AutoApprove;
//! use qiita_editor::Config;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     config.validate()?;
//!
//!     let service = ReviewService::from_config(&config, Arc::new(AutoApprove))?;
//!     let draft = ArticleDraft {
//!         title: "Hello".to_string(),
//!         tags: "rust".to_string(),
//!         body: "# Hello".to_string(),
//!         ..Default::default()
//!     };
//!     for message in service.review_and_post(&draft, Vec::new(), None).await {
//!         println!("{}", message.content);
//!     }
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod article;
pub mod cli;
pub mod commands;
pub mod config;
pub mod editor;
pub mod env_file;
pub mod error;
pub mod prompts;
pub mod providers;
pub mod qiita;
pub mod tasks;
pub mod tools;
pub mod web;

// Re-export commonly used types
pub use agent::{Agent, Runner};
pub use config::Config;
pub use error::{EditorError, Result};

#[cfg(test)]
pub mod test_utils;
