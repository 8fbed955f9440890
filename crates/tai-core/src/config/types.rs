//! Configuration type definitions for the assistant
//!
//! Every section has defaults, so an empty settings file is a valid
//! configuration. Paths may be written with a leading `~/`; the loader expands
//! them against the user's home directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Directory name used under `~/.config` for settings, credentials and logs.
pub const CONFIG_DIR_NAME: &str = "termux_ai_assistant";

/// Default workspace for scratch files, relative to the home directory.
pub const DEFAULT_WORKSPACE: &str = "~/.termux_ai_assistant";

/// Default wall-clock limit for a single execution.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    #[serde(default = "default_model")]
    pub model: String,
    /// Endpoint override; required for the `custom` provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default)]
    pub parameters: ModelParameters,
    #[serde(default)]
    pub auth: LlmAuth,
}

/// LLM provider types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Gemini,
    /// A Gemini-compatible endpoint such as a proxy, reached through `base_url`.
    Custom,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelParameters {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop_sequences: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_settings: Option<serde_json::Value>,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            system_message: None,
            stop_sequences: Vec::new(),
            safety_settings: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmAuth {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

/// Sandboxed execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default = "default_workspace")]
    pub workspace: PathBuf,
    /// Seconds before a running script is killed.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Interpreter used to run scripts. Resolved on `PATH` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub isolate_environment: bool,
    /// Variables passed through to the child when the environment is isolated.
    #[serde(default = "default_inherit_env")]
    pub inherit_env: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_file")]
    pub file: Option<PathBuf>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            credentials_path: default_credentials_path(),
            llm: LlmConfig::default(),
            execution: ExecutionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: default_model(),
            base_url: None,
            parameters: ModelParameters::default(),
            auth: LlmAuth::default(),
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            workspace: default_workspace(),
            timeout: default_timeout(),
            interpreter: None,
            isolate_environment: true,
            inherit_env: default_inherit_env(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

// Default value functions
fn default_credentials_path() -> PathBuf {
    PathBuf::from(format!("~/.config/{}/credentials.json", CONFIG_DIR_NAME))
}
fn default_model() -> String { "gemini-1.5-pro".to_string() }
fn default_temperature() -> f32 { 0.7 }
fn default_max_tokens() -> u32 { 4096 }
fn default_top_p() -> f32 { 0.9 }
fn default_workspace() -> PathBuf { PathBuf::from(DEFAULT_WORKSPACE) }
fn default_timeout() -> u64 { DEFAULT_TIMEOUT_SECS }
fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_log_file() -> Option<PathBuf> {
    Some(PathBuf::from(format!("~/.config/{}/tai.log", CONFIG_DIR_NAME)))
}

fn default_inherit_env() -> Vec<String> {
    [
        "PATH",
        "HOME",
        "LANG",
        "LC_ALL",
        "TERM",
        "TMPDIR",
        "PREFIX",
        "LD_LIBRARY_PATH",
        // termux-exec, needed for `#!/usr/bin/env` shebangs
        "LD_PRELOAD",
        // Android runtime, needed by `am` and termux-api
        "ANDROID_ROOT",
        "ANDROID_DATA",
        "ANDROID_ART_ROOT",
        "ANDROID_I18N_ROOT",
        "ANDROID_TZDATA_ROOT",
        "BOOTCLASSPATH",
        "EXTERNAL_STORAGE",
    ]
    .iter()
    .map(|name| name.to_string())
    .collect()
}
