//! Terminal I/O for the interactive session.
//!
//! [`Frontend`] is everything the session loop needs from the user's
//! terminal. [`ConsoleFrontend`] is the real implementation: dialoguer for
//! the prompt and the execute confirmation, crossterm for colours and syntect
//! for highlighting the generated Python.

use anyhow::Result;
use crossterm::style::Stylize;
use dialoguer::theme::{ColorfulTheme, Theme};
use dialoguer::{Confirm, Input};
use std::fmt;
use std::io::{BufRead, ErrorKind, IsTerminal, Write};
use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;
use syntect::util::{as_24_bit_terminal_escaped, LinesWithEndings};
use tai_core::ExecutionResult;

pub const PROMPT_LABEL: &str = "TAI";
pub const CONFIRM_PROMPT: &str = "Do you want to execute this code?";

const HIGHLIGHT_THEME: &str = "base16-ocean.dark";

pub const HELP_TEXT: &str = "\
Commands:
  help       Show this help message
  exit/quit  Exit the application

Usage:
  Type a code generation request in natural language.
  The generated Python is shown first and only runs if you confirm.";

/// What to print after an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultView<'a> {
    Output(&'a str),
    Error(&'a str),
}

impl<'a> ResultView<'a> {
    /// Zero exit status shows stdout; anything else, timeouts and launch
    /// failures included, shows stderr.
    pub fn of(result: &'a ExecutionResult) -> Self {
        if result.exit_status == 0 {
            ResultView::Output(&result.stdout)
        } else {
            ResultView::Error(&result.stderr)
        }
    }
}

pub trait Frontend {
    /// Next line from the user, or `None` at end of input.
    fn read_prompt(&mut self) -> Result<Option<String>>;
    fn show_banner(&mut self);
    fn show_help(&mut self);
    fn show_status(&mut self, message: &str);
    fn show_code(&mut self, code: &str);
    fn confirm_execution(&mut self) -> Result<bool>;
    fn show_result(&mut self, result: &ExecutionResult);
    fn show_error(&mut self, message: &str);
}

// Renders the input prompt as `TAI> `.
struct PromptTheme;

impl Theme for PromptTheme {
    fn format_input_prompt(
        &self,
        f: &mut dyn fmt::Write,
        prompt: &str,
        _default: Option<&str>,
    ) -> fmt::Result {
        write!(f, "{}> ", prompt)
    }

    fn format_input_prompt_selection(
        &self,
        f: &mut dyn fmt::Write,
        prompt: &str,
        sel: &str,
    ) -> fmt::Result {
        write!(f, "{}> {}", prompt, sel)
    }
}

pub const NOT_A_TERMINAL_NOTICE: &str =
    "Not executing: input is not a terminal. Re-run with --yes to execute generated code.";

/// Map a dialoguer prompt result onto the [`Frontend::read_prompt`] contract.
/// End of input ends the session; Ctrl-C discards the line and prompts again.
fn prompt_line(result: dialoguer::Result<String>) -> Result<Option<String>> {
    match result {
        Ok(line) => Ok(Some(line)),
        Err(dialoguer::Error::IO(e)) if e.kind() == ErrorKind::UnexpectedEof => Ok(None),
        Err(dialoguer::Error::IO(e)) if e.kind() == ErrorKind::Interrupted => {
            Ok(Some(String::new()))
        }
        Err(e) => Err(e.into()),
    }
}

pub struct ConsoleFrontend {
    syntaxes: SyntaxSet,
    themes: ThemeSet,
    interactive: bool,
    color: bool,
    out: Box<dyn Write + Send>,
}

impl ConsoleFrontend {
    pub fn new() -> Self {
        Self::with_output(
            Box::new(std::io::stdout()),
            std::io::stdin().is_terminal(),
            std::io::stdout().is_terminal(),
        )
    }

    /// Write to `out` instead of stdout. `interactive` decides between
    /// dialoguer prompts and plain line reading; `color` enables styling.
    pub fn with_output(out: Box<dyn Write + Send>, interactive: bool, color: bool) -> Self {
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            themes: ThemeSet::load_defaults(),
            interactive,
            color,
            out,
        }
    }

    fn highlight(&self, code: &str) -> Option<String> {
        let syntax = self.syntaxes.find_syntax_by_extension("py")?;
        let theme = self
            .themes
            .themes
            .get(HIGHLIGHT_THEME)
            .or_else(|| self.themes.themes.values().next())?;
        let mut highlighter = HighlightLines::new(syntax, theme);

        let mut out = String::with_capacity(code.len() * 2);
        for line in LinesWithEndings::from(code) {
            let ranges = highlighter.highlight_line(line, &self.syntaxes).ok()?;
            out.push_str(&as_24_bit_terminal_escaped(&ranges[..], false));
        }
        out.push_str("\x1b[0m");
        Some(out)
    }

    fn emit(&mut self, text: impl fmt::Display) {
        if let Err(e) = writeln!(self.out, "{}", text).and_then(|_| self.out.flush()) {
            log::warn!("Failed to write to terminal: {}", e);
        }
    }

    fn heading(&mut self, text: &str, paint: fn(&str) -> String) {
        let text = if self.color { paint(text) } else { text.to_string() };
        self.emit(format_args!("\n{}", text));
    }

    fn read_piped_line(&mut self) -> Result<Option<String>> {
        write!(self.out, "{}> ", PROMPT_LABEL)?;
        self.out.flush()?;
        let mut line = String::new();
        if std::io::stdin().lock().read_line(&mut line)? == 0 {
            self.emit("");
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

impl Default for ConsoleFrontend {
    fn default() -> Self {
        Self::new()
    }
}

impl Frontend for ConsoleFrontend {
    fn read_prompt(&mut self) -> Result<Option<String>> {
        if !self.interactive {
            return self.read_piped_line();
        }

        prompt_line(
            Input::<String>::with_theme(&PromptTheme)
                .with_prompt(PROMPT_LABEL)
                .allow_empty(true)
                .interact_text(),
        )
    }

    fn show_banner(&mut self) {
        let title = if self.color {
            "Termux AI Assistant".blue().bold().to_string()
        } else {
            "Termux AI Assistant".to_string()
        };
        self.emit(title);
        self.emit("Type 'exit' to quit, 'help' for commands\n");
    }

    fn show_help(&mut self) {
        self.emit(format_args!("\n{}\n", HELP_TEXT));
    }

    fn show_status(&mut self, message: &str) {
        self.heading(message, |s| s.yellow().to_string());
    }

    fn show_code(&mut self, code: &str) {
        self.heading("Generated Code:", |s| s.green().to_string());
        let rendered = if self.color { self.highlight(code) } else { None };
        match rendered {
            Some(highlighted) => self.emit(highlighted),
            None => self.emit(code),
        }
    }

    fn confirm_execution(&mut self) -> Result<bool> {
        if !self.interactive {
            log::info!("Input is not a terminal, skipping execution");
            self.heading(NOT_A_TERMINAL_NOTICE, |s| s.yellow().to_string());
            return Ok(false);
        }
        Ok(Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(CONFIRM_PROMPT)
            .default(false)
            .interact()?)
    }

    fn show_result(&mut self, result: &ExecutionResult) {
        match ResultView::of(result) {
            ResultView::Output(stdout) => {
                self.heading("Output:", |s| s.green().to_string());
                self.emit(stdout);
            }
            ResultView::Error(stderr) => {
                self.heading("Error:", |s| s.red().to_string());
                self.emit(stderr);
            }
        }
    }

    fn show_error(&mut self, message: &str) {
        self.heading(&format!("Error: {}", message), |s| s.red().to_string());
    }
}
