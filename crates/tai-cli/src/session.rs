//! The read-generate-confirm-execute loop.

use crate::frontend::Frontend;
use anyhow::Result;
use std::sync::Arc;
use tai_core::{CodeExecutor, CodeGenerator, ExecutionResult, GenerationRequest};

/// One line of user input, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCommand {
    Exit,
    Help,
    Empty,
    Prompt(String),
}

impl InputCommand {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return InputCommand::Empty;
        }
        match trimmed.to_lowercase().as_str() {
            "exit" | "quit" => InputCommand::Exit,
            "help" => InputCommand::Help,
            _ => InputCommand::Prompt(trimmed.to_string()),
        }
    }
}

/// How a single request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    GenerationFailed,
    Declined,
    Executed(ExecutionResult),
}

pub struct Session<F: Frontend> {
    frontend: F,
    generator: CodeGenerator,
    executor: Arc<dyn CodeExecutor>,
    auto_confirm: bool,
}

impl<F: Frontend> Session<F> {
    /// Code runs under the executor's own default timeout.
    pub fn new(frontend: F, generator: CodeGenerator, executor: Arc<dyn CodeExecutor>) -> Self {
        Self {
            frontend,
            generator,
            executor,
            auto_confirm: false,
        }
    }

    /// Run generated code without asking first.
    pub fn with_auto_confirm(mut self, auto_confirm: bool) -> Self {
        self.auto_confirm = auto_confirm;
        self
    }

    pub fn frontend(&self) -> &F {
        &self.frontend
    }

    /// Interactive loop. Returns on `exit`, `quit` or end of input; a failed
    /// turn only prints an error.
    pub async fn run(&mut self) -> Result<()> {
        self.frontend.show_banner();

        loop {
            let line = match self.frontend.read_prompt()? {
                Some(line) => line,
                None => {
                    log::info!("End of input, leaving session");
                    break;
                }
            };

            match InputCommand::parse(&line) {
                InputCommand::Exit => break,
                InputCommand::Help => self.frontend.show_help(),
                InputCommand::Empty => continue,
                InputCommand::Prompt(prompt) => {
                    self.handle_prompt(&prompt).await;
                }
            }
        }

        Ok(())
    }

    /// Generate, show, confirm and run the code for one request.
    pub async fn handle_prompt(&mut self, prompt: &str) -> TurnOutcome {
        log::info!("Handling request: {}", prompt);
        self.frontend.show_status("Generating code...");

        let code = match self
            .generator
            .generate_code(&GenerationRequest::new(prompt))
            .await
        {
            Ok(code) => code,
            Err(e) => {
                self.frontend.show_error(&e.to_string());
                return TurnOutcome::GenerationFailed;
            }
        };

        self.frontend.show_code(code.as_str());

        if !self.auto_confirm {
            match self.frontend.confirm_execution() {
                Ok(true) => {}
                Ok(false) => return TurnOutcome::Declined,
                Err(e) => {
                    log::warn!("Confirmation failed, not executing: {}", e);
                    return TurnOutcome::Declined;
                }
            }
        }

        self.frontend.show_status("Executing code...");
        let result = self.executor.execute_code_default(code.as_str()).await;
        self.frontend.show_result(&result);
        TurnOutcome::Executed(result)
    }

    /// Single-shot mode: one request, then a process exit code.
    pub async fn run_task(&mut self, prompt: &str) -> i32 {
        match self.handle_prompt(prompt).await {
            TurnOutcome::GenerationFailed => 1,
            TurnOutcome::Declined => 0,
            TurnOutcome::Executed(result) => process_exit_code(&result),
        }
    }
}

/// Map an execution result onto a process exit code.
pub fn process_exit_code(result: &ExecutionResult) -> i32 {
    match result.exit_status {
        code @ 0..=255 => code,
        _ => 1,
    }
}
