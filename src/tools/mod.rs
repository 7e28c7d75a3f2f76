//! Tools module for qiita-editor
//!
//! This module contains the tool executor abstraction, the registry agents
//! carry their tools in, and the editorial tools: checker agents exposed as
//! tools, the human confirmation gate, and the publisher.

pub mod agent_tool;
pub mod confirm;
pub mod publish;

pub use agent_tool::AgentTool;
pub use confirm::{AutoApprove, ConfirmTool, Confirmer, Decision, FixedDecision, TerminalConfirmer};
pub use publish::{PublishTool, PUBLISH_TOOL};

use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Tool result structure
///
/// Represents the result of a tool execution with metadata
/// and truncation support.
#[derive(Debug, Clone)]
pub struct ToolResult {
    /// Whether the tool execution succeeded
    pub success: bool,
    /// Output from the tool
    pub output: String,
    /// Error message if execution failed
    pub error: Option<String>,
    /// Whether the output was truncated
    pub truncated: bool,
    /// Additional metadata about the execution
    pub metadata: BTreeMap<String, String>,
}

impl ToolResult {
    /// Create a successful tool result
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
            truncated: false,
            metadata: BTreeMap::new(),
        }
    }

    /// Create a failed tool result
    pub fn error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error.into()),
            truncated: false,
            metadata: BTreeMap::new(),
        }
    }

    /// Add metadata to the result
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Truncate output if it exceeds the maximum size in bytes
    ///
    /// The cut is moved back to the nearest character boundary so
    /// multi-byte text stays valid.
    pub fn truncate_if_needed(mut self, max_size: usize) -> Self {
        if self.output.len() > max_size {
            let mut cut = max_size;
            while !self.output.is_char_boundary(cut) {
                cut -= 1;
            }
            self.output.truncate(cut);
            self.output.push_str("\n... (truncated)");
            self.truncated = true;
        }
        self
    }

    /// Convert to a message string for the conversation
    pub fn to_message(&self) -> String {
        if self.success {
            if self.truncated {
                format!("{}\n(Output truncated to fit context window)", self.output)
            } else {
                self.output.clone()
            }
        } else {
            format!(
                "Error: {}",
                self.error.as_deref().unwrap_or("Unknown error")
            )
        }
    }
}

/// Tool executor trait for implementing tool execution logic
///
/// # Examples
///
/// ```no_run
/// use qiita_editor::tools::{ToolExecutor, ToolResult};
/// use qiita_editor::error::Result;
/// use async_trait::async_trait;
/// use serde_json::Value;
///
/// struct Ping;
///
/// #[async_trait]
/// impl ToolExecutor for Ping {
///     fn tool_definition(&self) -> Value {
///         serde_json::json!({
///             "name": "ping",
///             "description": "Answers pong",
///             "parameters": {"type": "object", "properties": {}}
///         })
///     }
///
///     async fn execute(&self, _args: Value) -> Result<ToolResult> {
///         Ok(ToolResult::success("pong"))
///     }
/// }
/// ```
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Returns the tool definition as a JSON value
    ///
    /// The definition uses the function calling shape
    /// `{"name", "description", "parameters"}` where `parameters` is a
    /// JSON schema object.
    fn tool_definition(&self) -> serde_json::Value;

    /// Executes the tool with the given arguments
    ///
    /// # Errors
    ///
    /// Returns error if execution fails
    async fn execute(&self, args: serde_json::Value) -> Result<ToolResult>;
}

/// Tool registry for managing available tools
///
/// Tools keep their registration order so the definitions sent to the
/// model are stable between turns.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<(String, Arc<dyn ToolExecutor>)>,
}

impl ToolRegistry {
    /// Create a new empty tool registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool executor, replacing any tool with the same name
    pub fn register(&mut self, name: impl Into<String>, executor: Arc<dyn ToolExecutor>) {
        let name = name.into();
        if let Some(slot) = self.tools.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = executor;
        } else {
            self.tools.push((name, executor));
        }
    }

    /// Register a tool under the name its definition declares
    pub fn register_tool(&mut self, executor: Arc<dyn ToolExecutor>) {
        let name = executor.tool_definition()["name"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        self.register(name, executor);
    }

    /// Get a tool executor by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolExecutor>> {
        self.tools
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, executor)| Arc::clone(executor))
    }

    /// All tool definitions in registration order
    pub fn all_definitions(&self) -> Vec<serde_json::Value> {
        self.tools
            .iter()
            .map(|(_, executor)| executor.tool_definition())
            .collect()
    }

    /// Registered tool names in registration order
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tool_names())
            .finish()
    }
}
