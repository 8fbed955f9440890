//! Execution of generated code.
//!
//! Running code never fails from the caller's point of view: every launch
//! problem, timeout or non-zero exit is reported through an
//! [`ExecutionResult`], so the interactive loop can always print something
//! and move on.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

pub use crate::config::DEFAULT_TIMEOUT_SECS;

pub mod sandbox;

pub use sandbox::{SandboxConfig, SandboxedRunner};

/// Message placed in `stderr` when the time limit expires.
pub const TIMEOUT_MESSAGE: &str = "Execution timed out";

/// `exit_status` reported when the runner itself gave up on the child.
pub const RUNNER_FAILURE_STATUS: i32 = -1;

/// How a run ended, independent of the child's own exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// The interpreter ran and exited on its own (successfully or not).
    Completed,
    /// The wall-clock limit expired and the child was killed.
    TimedOut,
    /// The child could not be started, or the runner failed around it.
    LaunchFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_status: i32,
    pub outcome: ExecutionOutcome,
}

impl ExecutionResult {
    pub fn completed(stdout: String, stderr: String, exit_status: i32) -> Self {
        Self {
            stdout,
            stderr,
            exit_status,
            outcome: ExecutionOutcome::Completed,
        }
    }

    pub fn timed_out() -> Self {
        Self {
            stdout: String::new(),
            stderr: TIMEOUT_MESSAGE.to_string(),
            exit_status: RUNNER_FAILURE_STATUS,
            outcome: ExecutionOutcome::TimedOut,
        }
    }

    /// A failure before or around the child, described by `reason`.
    pub fn launch_failed(reason: impl std::fmt::Display) -> Self {
        Self {
            stdout: String::new(),
            stderr: reason.to_string(),
            exit_status: RUNNER_FAILURE_STATUS,
            outcome: ExecutionOutcome::LaunchFailed,
        }
    }
}

#[async_trait]
pub trait CodeExecutor: Send + Sync {
    /// Run `code` under a wall-clock `timeout`. Never panics, never errors.
    async fn execute_code(&self, code: &str, timeout: Duration) -> ExecutionResult;

    fn default_timeout(&self) -> Duration {
        Duration::from_secs(DEFAULT_TIMEOUT_SECS)
    }

    /// Run `code` under [`CodeExecutor::default_timeout`].
    async fn execute_code_default(&self, code: &str) -> ExecutionResult {
        self.execute_code(code, self.default_timeout()).await
    }
}
