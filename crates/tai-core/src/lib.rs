//! Core library for the Termux AI Assistant.
//!
//! The assistant turns a natural-language request into Python code through a
//! remote generation backend and optionally runs that code as a child process.
//! This crate holds the two stages and the infrastructure they sit on:
//!
//! - **Generation**: the [`CodeGenerator`] mediator wraps the user's request in a
//!   fixed instruction template and asks an [`LLM`] backend for code
//! - **Execution**: the [`SandboxedRunner`] writes code to a scratch file in a
//!   workspace directory, runs it under a wall-clock timeout and always reports
//!   a structured [`ExecutionResult`]
//! - **Configuration**: YAML settings bootstrapped on first run, plus a
//!   credentials file for the backend

pub mod config;
pub mod core_types;
pub mod errors;
pub mod executors;
pub mod generator;
pub mod llm;

pub use config::*;
pub use core_types::{GeneratedCode, GenerationRequest};
pub use errors::{AssistantError, GenerationError};
pub use executors::{
    CodeExecutor, ExecutionOutcome, ExecutionResult, SandboxConfig, SandboxedRunner,
};
pub use generator::CodeGenerator;
pub use llm::LLM;

#[cfg(test)]
pub mod test_utils;
