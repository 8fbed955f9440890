//! Error types for the generation side of the assistant.
//!
//! Execution never fails from the caller's point of view (see
//! [`crate::executors::ExecutionResult`]), so everything here belongs to
//! configuration, credentials and the generation backend.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum AssistantError {
    #[error("LLM interaction failed: {0}")]
    LLMError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Credentials error: {0}")]
    CredentialsError(String),
    #[error("Failed to initialize AI client: {0}")]
    InitializationError(String),
    #[error("Parsing error: {0}")]
    ParsingError(String),
    #[error("I/O error: {0}")]
    IoError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<std::io::Error> for AssistantError {
    fn from(err: std::io::Error) -> Self {
        AssistantError::IoError(err.to_string())
    }
}

impl From<reqwest::Error> for AssistantError {
    fn from(err: reqwest::Error) -> Self {
        AssistantError::LLMError(err.to_string())
    }
}

/// The single failure path of [`crate::CodeGenerator::generate_code`].
#[derive(Error, Debug, Clone)]
#[error("Code generation failed: {0}")]
pub struct GenerationError(#[from] pub AssistantError);

impl GenerationError {
    /// The backend error this generation failure wraps.
    pub fn backend_error(&self) -> &AssistantError {
        &self.0
    }
}

// Runner-internal failures. These never reach callers of
// `execute_code`; they are folded into a `LaunchFailed` result.
#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("Failed to prepare workspace {path}: {source}")]
    Workspace {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write scratch file: {0}")]
    ScratchFile(std::io::Error),
    #[error("No Python interpreter found (tried {0})")]
    InterpreterNotFound(String),
    #[error("Failed to launch {interpreter}: {source}")]
    Spawn {
        interpreter: String,
        source: std::io::Error,
    },
    #[error("Failed while waiting for the child process: {0}")]
    Wait(std::io::Error),
}
