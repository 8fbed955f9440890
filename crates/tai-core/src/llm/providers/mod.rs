//! LLM provider implementations
//!
//! Each provider implements the common [`LLM`] trait while handling its own
//! protocol and authentication.

use crate::config::{CredentialResolver, LlmConfig, LlmProvider};
use crate::errors::AssistantError;
use crate::llm::LLM;
use std::path::PathBuf;
use std::sync::Arc;

pub mod gemini;

/// Create an LLM client based on the provider configuration
pub fn create_llm_client(
    config: &LlmConfig,
    credentials_path: Option<PathBuf>,
) -> Result<Arc<dyn LLM>, AssistantError> {
    validate_provider_config(config)?;
    let credentials = CredentialResolver::new(&config.auth, credentials_path);
    gemini::create_client(config, credentials)
}

/// Get the default model for a provider if none is specified
pub fn get_default_model(provider: &LlmProvider) -> &'static str {
    match provider {
        LlmProvider::Gemini => "gemini-1.5-pro",
        LlmProvider::Custom => "gemini-1.5-pro",
    }
}

/// Validate provider-specific configuration
pub fn validate_provider_config(config: &LlmConfig) -> Result<(), AssistantError> {
    if config.model.trim().is_empty() {
        return Err(AssistantError::ConfigError(format!(
            "llm.model must not be empty (for example '{}')",
            get_default_model(&config.provider)
        )));
    }

    if config.provider == LlmProvider::Custom {
        let has_base_url = config
            .base_url
            .as_deref()
            .map(|url| !url.trim().is_empty())
            .unwrap_or(false);
        if !has_base_url {
            return Err(AssistantError::ConfigError(
                "Custom provider requires a valid 'base_url'".to_string(),
            ));
        }
    }

    Ok(())
}
