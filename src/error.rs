//! Error types for qiita-editor
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for qiita-editor operations
///
/// Covers configuration loading, provider calls, agent runs, tool
/// execution, the Qiita API, and the task runner.
#[derive(Error, Debug)]
pub enum EditorError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider-related errors (API calls, malformed responses, etc.)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Tool execution errors
    #[error("Tool execution error: {0}")]
    Tool(String),

    /// Draft validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Qiita API returned a non-success status
    #[error("Qiita API error ({status}): {message}")]
    Qiita {
        /// HTTP status code returned by Qiita
        status: u16,
        /// Message extracted from the error body
        message: String,
    },

    /// Publishing was requested for a platform that is not supported
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// Missing credentials for a remote service
    #[error("Missing credentials for {0}")]
    MissingCredentials(String),

    /// Agent run exceeded the maximum turn limit
    #[error("Agent exceeded maximum iterations: limit={limit}, {message}")]
    MaxIterationsExceeded {
        /// The configured turn limit
        limit: usize,
        /// Additional context about the failure
        message: String,
    },

    /// Agent run exceeded its time budget
    #[error("Agent run timed out after {0} seconds")]
    Timeout(u64),

    /// A task step exited unsuccessfully
    #[error("Task '{task}' failed at step {step}: {}", exit_description(.code))]
    TaskFailed {
        /// Task target name
        task: String,
        /// Rendered command line of the failing step
        step: String,
        /// Exit code, `None` when terminated by a signal
        code: Option<i32>,
    },

    /// A task step could not be started
    #[error("Task step could not be started: {0}")]
    TaskSpawn(String),

    /// Task target is not defined
    #[error("Unknown task '{name}'. Known tasks: {known}")]
    UnknownTask {
        /// Requested target name
        name: String,
        /// Comma separated list of defined targets
        known: String,
    },

    /// Malformed env file
    #[error("Env file error at line {line}: {message}")]
    EnvFile {
        /// 1-based line number
        line: usize,
        /// What was wrong with the line
        message: String,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// Result type alias for qiita-editor operations
///
/// Uses `anyhow::Error` so callers can attach context while still being
/// able to downcast to [`EditorError`].
pub type Result<T> = anyhow::Result<T>;
