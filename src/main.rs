//! qiita-editor - AI agents review your draft and post it to Qiita
//!
#![doc = "Main entry point for the qiita-editor application."]

use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use qiita_editor::cli::{Cli, Commands};
use qiita_editor::commands;
use qiita_editor::config::Config;
use qiita_editor::env_file::EnvFile;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        eprintln!("{} {:#}", "error:".red().bold(), err);
        std::process::exit(commands::exit_code(&err));
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Task steps receive only the configured exports, never the whole file
    if !matches!(cli.command, Commands::Task { .. }) {
        load_env_file(cli.env_file.as_deref())?;
    }

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    match cli.command {
        Commands::Serve { host } => {
            tracing::info!("Starting web editor");
            commands::serve::run_serve(config, host).await
        }
        Commands::Review {
            title,
            tags,
            body,
            public,
            slide,
            interactive,
        } => {
            tracing::info!("Reviewing {}", body.display());
            let options = commands::review::ReviewOptions {
                title,
                tags,
                body,
                public,
                slide,
                interactive,
            };
            commands::review::run_review(config, options).await
        }
        Commands::Task { name, dry_run } => {
            tracing::debug!("Running task '{}' (dry_run={})", name, dry_run);
            commands::task::run_task(&config, &name, dry_run).await
        }
    }
}

/// Export the env file into this process; variables already set win
fn load_env_file(path: Option<&Path>) -> Result<()> {
    let env_path = path.unwrap_or_else(|| Path::new(".env"));
    match EnvFile::load_optional(env_path)? {
        Some(env) => {
            let applied = env.apply_to_process(false);
            tracing::debug!("Loaded {} variables from {}", applied, env_path.display());
        }
        None => tracing::debug!("No env file at {}", env_path.display()),
    }
    Ok(())
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so task output on stdout passes through unchanged.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "qiita_editor=debug"
    } else {
        "qiita_editor=info"
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
