//! Provider module for qiita-editor
//!
//! This module contains the LLM provider abstraction and the OpenAI
//! Chat Completions implementation.

pub mod base;
pub mod openai;

pub use base::{
    validate_message_sequence, CompletionResponse, FunctionCall, Message, Provider,
    ProviderCapabilities, ResponseFormat, TokenUsage, ToolCall,
};
pub use openai::OpenAiProvider;

use crate::config::ProviderConfig;
use crate::error::{EditorError, Result};
use std::sync::Arc;

/// Provider types accepted by [`create_provider`]
pub const SUPPORTED_PROVIDERS: &[&str] = &["openai"];

/// Create a provider instance based on configuration
///
/// # Arguments
///
/// * `provider_type` - Type of provider ("openai")
/// * `config` - Provider configuration
///
/// # Errors
///
/// Returns error if the provider type is unknown or initialization fails
pub fn create_provider(provider_type: &str, config: &ProviderConfig) -> Result<Arc<dyn Provider>> {
    match provider_type {
        "openai" => Ok(Arc::new(OpenAiProvider::new(config.openai.clone())?)),
        _ => Err(EditorError::Provider(format!(
            "Unknown provider type: {}. Must be one of: {}",
            provider_type,
            SUPPORTED_PROVIDERS.join(", ")
        ))
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_provider_invalid_type() {
        let result = create_provider("anthropic", &ProviderConfig::default());
        let err = result.err().unwrap();
        assert!(err.to_string().contains("Unknown provider type: anthropic"));
    }

    #[test]
    fn test_create_provider_openai_without_key_starts() {
        let provider = create_provider("openai", &ProviderConfig::default()).unwrap();
        assert_eq!(provider.get_current_model().unwrap(), "gpt-4o-mini");
    }

    #[test]
    fn test_create_provider_openai() {
        let mut config = ProviderConfig::default();
        config.openai.api_key = Some("sk-test".to_string());
        let provider = create_provider("openai", &config).unwrap();
        assert_eq!(provider.get_current_model().unwrap(), "gpt-4o-mini");
    }
}
