//! Configuration management for qiita-editor
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{EditorError, Result};
use crate::tasks::TaskStep;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// LLM provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Agent run limits and conversation settings
    #[serde(default)]
    pub agent: AgentConfig,
    /// Qiita API settings
    #[serde(default)]
    pub qiita: QiitaConfig,
    /// Editorial workflow settings
    #[serde(default)]
    pub editor: EditorConfig,
    /// Web UI settings
    #[serde(default)]
    pub ui: UiConfig,
    /// Task runner settings
    #[serde(default)]
    pub tasks: TasksConfig,
}

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Type of provider to use
    #[serde(rename = "type", default = "default_provider_type")]
    pub provider_type: String,

    /// OpenAI configuration
    #[serde(default)]
    pub openai: OpenAiConfig,
}

fn default_provider_type() -> String {
    "openai".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: default_provider_type(),
            openai: OpenAiConfig::default(),
        }
    }
}

/// OpenAI Chat Completions configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Model used by every agent
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// API base URL, overridable for tests and compatible gateways
    #[serde(default = "default_openai_base")]
    pub api_base: String,

    /// API key; normally supplied through `OPENAI_API_KEY`
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_seconds: u64,
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_request_timeout() -> u64 {
    120
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            model: default_openai_model(),
            api_base: default_openai_base(),
            api_key: None,
            timeout_seconds: default_request_timeout(),
        }
    }
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// Agent behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum number of model turns in a single run
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Timeout for an entire run (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Record per-run trace events
    #[serde(default = "default_trace_runs")]
    pub trace_runs: bool,

    /// Conversation management settings
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Tool execution settings
    #[serde(default)]
    pub tools: ToolsConfig,
}

fn default_max_turns() -> usize {
    20
}

fn default_timeout() -> u64 {
    300
}

fn default_trace_runs() -> bool {
    true
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            timeout_seconds: default_timeout(),
            trace_runs: default_trace_runs(),
            conversation: ConversationConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

/// Conversation management configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Maximum tokens allowed in conversation context
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Minimum number of user turns to retain when pruning
    #[serde(default = "default_min_retain")]
    pub min_retain_turns: usize,

    /// Fraction of `max_tokens` that triggers pruning
    #[serde(default = "default_prune_threshold")]
    pub prune_threshold: f32,
}

fn default_max_tokens() -> usize {
    100_000
}

fn default_min_retain() -> usize {
    5
}

fn default_prune_threshold() -> f32 {
    0.8
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            min_retain_turns: default_min_retain(),
            prune_threshold: default_prune_threshold(),
        }
    }
}

/// Tool execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Maximum tool output size in bytes before truncation
    #[serde(default = "default_max_output")]
    pub max_output_size: usize,
}

fn default_max_output() -> usize {
    64 * 1024
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            max_output_size: default_max_output(),
        }
    }
}

/// Qiita API configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct QiitaConfig {
    /// API base URL
    #[serde(default = "default_qiita_base")]
    pub api_base: String,

    /// Personal access token; normally supplied through `QIITA_API_ACCESS_TOKEN`
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_qiita_timeout")]
    pub timeout_seconds: u64,
}

fn default_qiita_base() -> String {
    "https://qiita.com".to_string()
}

fn default_qiita_timeout() -> u64 {
    30
}

impl Default for QiitaConfig {
    fn default() -> Self {
        Self {
            api_base: default_qiita_base(),
            access_token: None,
            timeout_seconds: default_qiita_timeout(),
        }
    }
}

impl std::fmt::Debug for QiitaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QiitaConfig")
            .field("api_base", &self.api_base)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "<redacted>"),
            )
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// How `confirm_to_human` decides
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalMode {
    /// Accept every publish request without asking
    #[default]
    Auto,
    /// Ask on the terminal
    Interactive,
}

impl std::str::FromStr for ApprovalMode {
    type Err = EditorError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "interactive" => Ok(Self::Interactive),
            other => Err(EditorError::Config(format!(
                "Invalid approval mode: {}. Must be one of: auto, interactive",
                other
            ))),
        }
    }
}

/// Editorial workflow configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Maximum number of tags on an article
    #[serde(default = "default_max_article_tags")]
    pub max_article_tags: usize,

    /// Approval behavior of the publisher
    #[serde(default)]
    pub approval: ApprovalMode,
}

fn default_max_article_tags() -> usize {
    5
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_article_tags: default_max_article_tags(),
            approval: ApprovalMode::default(),
        }
    }
}

/// Web UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Listen address
    #[serde(default = "default_host")]
    pub host: String,

    /// Visible rows of the body editor
    #[serde(default = "default_editor_lines")]
    pub editor_lines: usize,

    /// Height in pixels of the preview and message panes
    #[serde(default = "default_preview_height")]
    pub preview_height: usize,
}

fn default_host() -> String {
    "127.0.0.1:7860".to_string()
}

fn default_editor_lines() -> usize {
    30
}

fn default_preview_height() -> usize {
    600
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            editor_lines: default_editor_lines(),
            preview_height: default_preview_height(),
        }
    }
}

/// Task runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Env file whose values are re-exported to task steps
    #[serde(default = "default_env_file")]
    pub env_file: PathBuf,

    /// Keys re-exported from the env file
    #[serde(default = "default_export_keys")]
    pub export: Vec<String>,

    /// Target overrides and additions, keyed by target name
    #[serde(default)]
    pub targets: BTreeMap<String, Vec<TaskStep>>,
}

fn default_env_file() -> PathBuf {
    PathBuf::from(".env")
}

fn default_export_keys() -> Vec<String> {
    vec![
        "OPENAI_API_KEY".to_string(),
        "OPENAI_AGENTS_DISABLE_TRACING".to_string(),
        "QIITA_API_ACCESS_TOKEN".to_string(),
    ]
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            env_file: default_env_file(),
            export: default_export_keys(),
            targets: BTreeMap::new(),
        }
    }
}

/// Interpret common truthy spellings of a flag variable
pub(crate) fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file is not an error; defaults are used instead.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| EditorError::Config(format!("Failed to read config file: {}", e)))?;
        Self::from_yaml(&contents)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents)
            .map_err(|e| EditorError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        // Credentials
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.is_empty() {
                self.provider.openai.api_key = Some(key);
            }
        }

        if let Ok(token) = std::env::var("QIITA_API_ACCESS_TOKEN") {
            if !token.is_empty() {
                self.qiita.access_token = Some(token);
            }
        }

        if let Ok(flag) = std::env::var("OPENAI_AGENTS_DISABLE_TRACING") {
            if is_truthy(&flag) {
                self.agent.trace_runs = false;
                tracing::debug!("Run tracing disabled by OPENAI_AGENTS_DISABLE_TRACING");
            }
        }

        // Provider overrides
        if let Ok(provider_type) = std::env::var("QIITA_EDITOR_PROVIDER") {
            self.provider.provider_type = provider_type;
        }

        if let Ok(model) = std::env::var("QIITA_EDITOR_OPENAI_MODEL") {
            self.provider.openai.model = model;
        }

        if let Ok(base) = std::env::var("QIITA_EDITOR_OPENAI_BASE") {
            self.provider.openai.api_base = base;
        }

        if let Ok(base) = std::env::var("QIITA_EDITOR_QIITA_BASE") {
            self.qiita.api_base = base;
        }

        // Agent overrides
        apply_parsed("QIITA_EDITOR_MAX_TURNS", &mut self.agent.max_turns);
        apply_parsed(
            "QIITA_EDITOR_TIMEOUT_SECONDS",
            &mut self.agent.timeout_seconds,
        );

        // Editor and UI overrides
        apply_parsed("MAX_ARTICLE_TAGS", &mut self.editor.max_article_tags);
        apply_parsed("EDITOR_LINES", &mut self.ui.editor_lines);
        apply_parsed("PREVIEW_HEIGHT", &mut self.ui.preview_height);

        if let Ok(host) = std::env::var("QIITA_EDITOR_HOST") {
            self.ui.host = host;
        }

        if let Ok(mode) = std::env::var("QIITA_EDITOR_APPROVAL") {
            match mode.parse() {
                Ok(mode) => self.editor.approval = mode,
                Err(e) => tracing::warn!("Ignoring QIITA_EDITOR_APPROVAL: {}", e),
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let Some(env_file) = &cli.env_file {
            self.tasks.env_file = env_file.clone();
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any value is out of range
    pub fn validate(&self) -> Result<()> {
        if self.provider.provider_type.is_empty() {
            return Err(EditorError::Config("Provider type cannot be empty".to_string()).into());
        }

        let valid_providers = crate::providers::SUPPORTED_PROVIDERS;
        if !valid_providers.contains(&self.provider.provider_type.as_str()) {
            return Err(EditorError::Config(format!(
                "Invalid provider type: {}. Must be one of: {}",
                self.provider.provider_type,
                valid_providers.join(", ")
            ))
            .into());
        }

        if self.agent.max_turns == 0 {
            return Err(
                EditorError::Config("max_turns must be greater than 0".to_string()).into(),
            );
        }

        if self.agent.max_turns > 1000 {
            return Err(EditorError::Config(
                "max_turns must be less than or equal to 1000".to_string(),
            )
            .into());
        }

        if self.agent.timeout_seconds == 0 {
            return Err(
                EditorError::Config("timeout_seconds must be greater than 0".to_string()).into(),
            );
        }

        if self.agent.conversation.prune_threshold <= 0.0
            || self.agent.conversation.prune_threshold > 1.0
        {
            return Err(EditorError::Config(
                "conversation.prune_threshold must be between 0.0 and 1.0".to_string(),
            )
            .into());
        }

        if self.agent.tools.max_output_size == 0 {
            return Err(EditorError::Config(
                "tools.max_output_size must be greater than 0".to_string(),
            )
            .into());
        }

        if self.editor.max_article_tags == 0 {
            return Err(EditorError::Config(
                "editor.max_article_tags must be greater than 0".to_string(),
            )
            .into());
        }

        for (name, base) in [
            ("provider.openai.api_base", &self.provider.openai.api_base),
            ("qiita.api_base", &self.qiita.api_base),
        ] {
            let parsed = url::Url::parse(base).map_err(|e| {
                EditorError::Config(format!("{} is not a valid URL ({}): {}", name, base, e))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(EditorError::Config(format!(
                    "{} must use http or https: {}",
                    name, base
                ))
                .into());
            }
        }

        if self.ui.host.trim().is_empty() {
            return Err(EditorError::Config("ui.host cannot be empty".to_string()).into());
        }

        Ok(())
    }
}

fn apply_parsed<T: std::str::FromStr>(var: &str, target: &mut T) {
    if let Ok(raw) = std::env::var(var) {
        match raw.parse() {
            Ok(value) => {
                *target = value;
                tracing::debug!("Env override: {}", var);
            }
            Err(_) => tracing::warn!("Invalid {}: {}", var, raw),
        }
    }
}
