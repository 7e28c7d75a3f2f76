//! Command-line interface definition for qiita-editor
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for the web UI, one-shot reviews, and project tasks.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// qiita-editor - AI agents review your draft and post it to Qiita
#[derive(Parser, Debug, Clone)]
#[command(name = "qiita-editor")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Env file loaded at startup and re-exported to tasks
    #[arg(long, env = "QIITA_EDITOR_ENV_FILE")]
    pub env_file: Option<PathBuf>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the web editor
    Serve {
        /// Listen address override (e.g. 0.0.0.0:7860)
        #[arg(long)]
        host: Option<String>,
    },

    /// Review a draft from the terminal and publish it when every check passes
    Review {
        /// Article title
        #[arg(short, long)]
        title: String,

        /// Space separated tags
        #[arg(long, default_value = "")]
        tags: String,

        /// Markdown file holding the article body
        #[arg(short, long)]
        body: PathBuf,

        /// Publish as a public article (default is limited sharing)
        #[arg(long)]
        public: bool,

        /// Enable slide mode
        #[arg(long)]
        slide: bool,

        /// Ask on the terminal before publishing
        #[arg(short, long)]
        interactive: bool,
    },

    /// Run a project task target (run, lint)
    Task {
        /// Target name
        name: String,

        /// Print the commands without running them
        #[arg(long)]
        dry_run: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
