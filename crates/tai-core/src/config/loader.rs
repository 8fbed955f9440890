//! Configuration loader for the YAML settings file
//!
//! This module finds the settings file, writes a default one on first run,
//! parses it, expands `~/` paths and resolves environment-provided values.

use crate::config::types::*;
use crate::errors::AssistantError;
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Name of the settings file inside the configuration directory.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Configuration loader with environment resolution
pub struct ConfigLoader;

impl ConfigLoader {
    /// `~/.config/termux_ai_assistant`
    pub fn default_config_dir() -> Result<PathBuf, AssistantError> {
        let home = dirs::home_dir().ok_or_else(|| {
            AssistantError::ConfigError("Could not determine the home directory".to_string())
        })?;
        Ok(home.join(".config").join(CONFIG_DIR_NAME))
    }

    /// `~/.config/termux_ai_assistant/config.yaml`
    pub fn default_config_path() -> Result<PathBuf, AssistantError> {
        Ok(Self::default_config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load the settings file, creating it with defaults when it does not exist.
    pub async fn load_or_create<P: AsRef<Path>>(path: P) -> Result<AssistantConfig, AssistantError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("No configuration at {}, writing defaults", path.display());
            Self::write_default(path).await?;
        }

        Self::from_file(path).await
    }

    /// Write a default settings file, creating parent directories as needed.
    pub async fn write_default<P: AsRef<Path>>(path: P) -> Result<(), AssistantError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AssistantError::ConfigError(format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let mut config = AssistantConfig::default();
        Self::resolve_paths(&mut config);

        let content = serde_yaml::to_string(&config).map_err(|e| {
            AssistantError::ConfigError(format!("Failed to serialize default config: {}", e))
        })?;

        fs::write(path, content).await.map_err(|e| {
            AssistantError::ConfigError(format!(
                "Failed to write config file {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<AssistantConfig, AssistantError> {
        let path = path.as_ref();

        let content = fs::read_to_string(path).await.map_err(|e| {
            AssistantError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_str(content: &str) -> Result<AssistantConfig, AssistantError> {
        let mut config: AssistantConfig = if content.trim().is_empty() {
            AssistantConfig::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| {
                AssistantError::ConfigError(format!("Failed to parse YAML config: {}", e))
            })?
        };

        Self::resolve_paths(&mut config);
        Self::resolve_llm_auth(&mut config.llm.auth);

        config.validate()?;

        Ok(config)
    }

    fn resolve_paths(config: &mut AssistantConfig) {
        config.credentials_path = expand_home(&config.credentials_path);
        config.execution.workspace = expand_home(&config.execution.workspace);
        if let Some(interpreter) = &config.execution.interpreter {
            config.execution.interpreter = Some(expand_home(interpreter));
        }
        if let Some(file) = &config.logging.file {
            config.logging.file = Some(expand_home(file));
        }
    }

    /// Resolve LLM authentication from environment
    fn resolve_llm_auth(auth: &mut LlmAuth) {
        if let Some(env_var) = &auth.api_key_env {
            if let Ok(api_key) = env::var(env_var) {
                auth.api_key = Some(api_key);
            }
        }
    }
}

/// Expand a leading `~` to the home directory. Other paths are returned as is.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };

    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => {
            log::warn!("Home directory unknown, leaving {} unexpanded", path.display());
            path.to_path_buf()
        }
    }
}
