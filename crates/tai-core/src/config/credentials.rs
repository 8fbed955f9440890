//! Backend credentials
//!
//! The settings file only names where the credentials live. The key itself is
//! resolved lazily, once per backend request, so a missing or broken
//! credentials file shows up as a failed generation rather than a crash at
//! start-up.

use crate::config::types::LlmAuth;
use crate::errors::AssistantError;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Fallback environment variable consulted after every configured source.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Contents of the JSON credentials file. Unknown fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub api_key: String,
}

/// Read and parse a credentials file.
pub async fn load_credentials<P: AsRef<Path>>(path: P) -> Result<Credentials, AssistantError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).await.map_err(|e| {
        AssistantError::CredentialsError(format!(
            "Failed to read credentials file {}: {}",
            path.display(),
            e
        ))
    })?;

    let credentials: Credentials = serde_json::from_str(&content).map_err(|e| {
        AssistantError::CredentialsError(format!(
            "Invalid JSON in credentials file {}: {}",
            path.display(),
            e
        ))
    })?;

    if credentials.api_key.trim().is_empty() {
        return Err(AssistantError::CredentialsError(format!(
            "Credentials file {} has an empty api_key",
            path.display()
        )));
    }

    Ok(credentials)
}

/// Resolves the backend API key from the configured sources.
///
/// Precedence: literal `auth.api_key`, then `auth.api_key_env`, then the
/// credentials file, then `GEMINI_API_KEY`.
#[derive(Debug, Clone, Default)]
pub struct CredentialResolver {
    api_key: Option<String>,
    api_key_env: Option<String>,
    credentials_path: Option<PathBuf>,
}

impl CredentialResolver {
    pub fn new(auth: &LlmAuth, credentials_path: Option<PathBuf>) -> Self {
        Self {
            api_key: auth.api_key.clone(),
            api_key_env: auth.api_key_env.clone(),
            credentials_path,
        }
    }

    pub fn from_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }

    pub async fn resolve(&self) -> Result<String, AssistantError> {
        if let Some(key) = &self.api_key {
            return Ok(key.clone());
        }

        if let Some(env_var) = &self.api_key_env {
            match env::var(env_var) {
                Ok(key) if !key.is_empty() => return Ok(key),
                _ => log::debug!("API key variable {} is not set", env_var),
            }
        }

        if let Some(path) = &self.credentials_path {
            if path.exists() {
                log::debug!("Loading credentials from {}", path.display());
                return load_credentials(path)
                    .await
                    .map(|credentials| credentials.api_key)
                    .map_err(|e| AssistantError::InitializationError(e.to_string()));
            }
        }

        if let Ok(key) = env::var(GEMINI_API_KEY_ENV) {
            if !key.is_empty() {
                return Ok(key);
            }
        }

        let location = self
            .credentials_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<not configured>".to_string());
        Err(AssistantError::InitializationError(format!(
            "no API key found: credentials file {} does not exist and {} is not set",
            location, GEMINI_API_KEY_ENV
        )))
    }
}
