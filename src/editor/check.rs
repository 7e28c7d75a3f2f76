//! Structured verdict returned by checker agents

use crate::error::{EditorError, Result};
use crate::providers::ResponseFormat;
use serde::{Deserialize, Serialize};

/// Schema name checker agents declare for their output
pub const CHECK_RESULT_SCHEMA: &str = "check_result";

/// Verdict of a single check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    /// The article should not be published as is
    Reject,
    /// No problems found
    Accept,
}

/// Output of a checker agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Verdict
    pub status: CheckStatus,
    /// Name of the checker
    pub name: String,
    /// Short reason for the verdict
    pub comment: String,
}

impl CheckResult {
    /// Parse and validate a checker's JSON answer
    ///
    /// # Errors
    ///
    /// Returns `EditorError::Tool` when the answer does not match the shape
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw.trim()).map_err(|e| {
            EditorError::Tool(format!("Checker returned an invalid result: {}", e)).into()
        })
    }

    /// Whether the check passed
    pub fn accepted(&self) -> bool {
        self.status == CheckStatus::Accept
    }

    /// Strict JSON schema requested from checker agents
    pub fn response_format() -> ResponseFormat {
        ResponseFormat::json_schema(
            CHECK_RESULT_SCHEMA,
            serde_json::json!({
                "type": "object",
                "properties": {
                    "status": {"type": "string", "enum": ["reject", "accept"]},
                    "name": {"type": "string"},
                    "comment": {"type": "string"}
                },
                "required": ["status", "name", "comment"],
                "additionalProperties": false
            }),
        )
    }
}
