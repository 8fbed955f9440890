//! Local Python runner.
//!
//! Each call writes the code to a fresh `tai-*.py` file inside the workspace,
//! runs it with a Python interpreter under a wall-clock limit and removes the
//! file again before returning. Calls share nothing but the workspace
//! directory, so concurrent runs are safe.

use super::{CodeExecutor, ExecutionResult, DEFAULT_TIMEOUT_SECS};
use crate::config::{expand_home, ExecutionConfig};
use crate::errors::SandboxError;
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tempfile::{Builder, TempPath};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

pub const SCRIPT_PREFIX: &str = "tai-";
pub const SCRIPT_SUFFIX: &str = ".py";

const INTERPRETER_CANDIDATES: [&str; 2] = ["python3", "python"];

#[derive(Debug, Clone)]
pub struct SandboxConfig {
    pub workspace: PathBuf,
    /// Explicit interpreter path or bare command name; `None` searches `PATH`.
    pub interpreter: Option<PathBuf>,
    pub default_timeout: Duration,
    pub isolate_environment: bool,
    /// Variables passed through when the environment is isolated.
    pub inherit_env: Vec<String>,
}

impl SandboxConfig {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            ..Self::from(&ExecutionConfig::default())
        }
    }

    pub fn with_interpreter(mut self, interpreter: impl Into<PathBuf>) -> Self {
        self.interpreter = Some(interpreter.into());
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_isolated_environment(mut self, isolate: bool) -> Self {
        self.isolate_environment = isolate;
        self
    }
}

impl From<&ExecutionConfig> for SandboxConfig {
    fn from(config: &ExecutionConfig) -> Self {
        let timeout_secs = if config.timeout == 0 {
            DEFAULT_TIMEOUT_SECS
        } else {
            config.timeout
        };
        Self {
            workspace: expand_home(&config.workspace),
            interpreter: config.interpreter.clone(),
            default_timeout: Duration::from_secs(timeout_secs),
            isolate_environment: config.isolate_environment,
            inherit_env: config.inherit_env.clone(),
        }
    }
}

pub struct SandboxedRunner {
    config: SandboxConfig,
}

impl SandboxedRunner {
    pub fn new(config: SandboxConfig) -> Self {
        log::debug!(
            "Sandboxed runner using workspace {}",
            config.workspace.display()
        );
        Self { config }
    }

    pub fn workspace(&self) -> &Path {
        &self.config.workspace
    }

    async fn run(&self, code: &str, timeout: Duration) -> Result<ExecutionResult, SandboxError> {
        let workspace = self.prepare_workspace().await?;
        let interpreter = self.resolve_interpreter()?;
        let script = write_script(&workspace, code)?;

        log::debug!(
            "Running {} with {} (timeout {:?})",
            script.display(),
            interpreter.display(),
            timeout
        );

        let mut child = self
            .build_command(&interpreter, &script, &workspace)
            .spawn()
            .map_err(|source| SandboxError::Spawn {
                interpreter: interpreter.display().to_string(),
                source,
            })?;

        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();

        let waited = tokio::time::timeout(timeout, async {
            tokio::try_join!(
                child.wait(),
                read_stream(stdout_pipe.as_mut()),
                read_stream(stderr_pipe.as_mut()),
            )
        })
        .await;

        let result = match waited {
            Ok(Ok((status, stdout, stderr))) => ExecutionResult::completed(
                String::from_utf8_lossy(&stdout).into_owned(),
                String::from_utf8_lossy(&stderr).into_owned(),
                exit_code(status),
            ),
            Ok(Err(e)) => {
                if let Err(kill_err) = child.start_kill() {
                    log::debug!("Kill after wait failure: {}", kill_err);
                }
                return Err(SandboxError::Wait(e));
            }
            Err(_) => {
                log::warn!("Execution exceeded {:?}, killing child", timeout);
                // `kill` also reaps, so no zombie outlives the call.
                if let Err(e) = child.kill().await {
                    log::warn!("Failed to kill timed-out child: {}", e);
                }
                ExecutionResult::timed_out()
            }
        };

        if let Err(e) = script.close() {
            log::warn!("Failed to remove scratch file: {}", e);
        }
        Ok(result)
    }

    async fn prepare_workspace(&self) -> Result<PathBuf, SandboxError> {
        let workspace = &self.config.workspace;
        let to_error = |source| SandboxError::Workspace {
            path: workspace.clone(),
            source,
        };
        tokio::fs::create_dir_all(workspace).await.map_err(to_error)?;
        // The child runs inside the workspace, so the script path must not be
        // relative to the caller's directory.
        tokio::fs::canonicalize(workspace).await.map_err(to_error)
    }

    fn resolve_interpreter(&self) -> Result<PathBuf, SandboxError> {
        match &self.config.interpreter {
            Some(configured) if configured.components().count() > 1 => Ok(configured.clone()),
            Some(configured) => which::which(configured).map_err(|_| {
                SandboxError::InterpreterNotFound(configured.display().to_string())
            }),
            None => INTERPRETER_CANDIDATES
                .iter()
                .find_map(|name| which::which(name).ok())
                .ok_or_else(|| SandboxError::InterpreterNotFound(INTERPRETER_CANDIDATES.join(", "))),
        }
    }

    fn build_command(&self, interpreter: &Path, script: &Path, workspace: &Path) -> Command {
        let mut cmd = Command::new(interpreter);
        cmd.arg(script)
            .current_dir(workspace)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if self.config.isolate_environment {
            cmd.env_clear();
            for name in &self.config.inherit_env {
                if let Some(value) = std::env::var_os(name) {
                    cmd.env(name, value);
                }
            }
        }

        cmd.env("PYTHONIOENCODING", "utf-8")
            .env("PYTHONDONTWRITEBYTECODE", "1");
        cmd
    }
}

#[async_trait]
impl CodeExecutor for SandboxedRunner {
    async fn execute_code(&self, code: &str, timeout: Duration) -> ExecutionResult {
        match self.run(code, timeout).await {
            Ok(result) => {
                log::info!(
                    "Execution finished: {:?}, exit status {}",
                    result.outcome,
                    result.exit_status
                );
                result
            }
            Err(e) => {
                log::error!("Execution failed: {}", e);
                ExecutionResult::launch_failed(e)
            }
        }
    }

    fn default_timeout(&self) -> Duration {
        self.config.default_timeout
    }
}

fn write_script(workspace: &Path, code: &str) -> Result<TempPath, SandboxError> {
    let mut file = Builder::new()
        .prefix(SCRIPT_PREFIX)
        .suffix(SCRIPT_SUFFIX)
        .tempfile_in(workspace)
        .map_err(SandboxError::ScratchFile)?;
    file.write_all(code.as_bytes())
        .and_then(|_| file.flush())
        .map_err(SandboxError::ScratchFile)?;
    // Drop the handle but keep the path guard; the file is removed when the
    // guard is closed or dropped.
    Ok(file.into_temp_path())
}

async fn read_stream<R: AsyncRead + Unpin>(stream: Option<&mut R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(stream) = stream {
        stream.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    super::RUNNER_FAILURE_STATUS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executors::ExecutionOutcome;
    use serial_test::serial;
    use std::sync::Arc;
    use std::time::Instant;
    use tempfile::TempDir;

    fn python_available() -> bool {
        INTERPRETER_CANDIDATES
            .iter()
            .any(|name| which::which(name).is_ok())
    }

    fn runner_in(dir: &TempDir) -> SandboxedRunner {
        SandboxedRunner::new(SandboxConfig::new(dir.path().join("workspace")))
    }

    fn workspace_entries(runner: &SandboxedRunner) -> Vec<PathBuf> {
        match std::fs::read_dir(runner.workspace()) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_prints_to_stdout() {
        if !python_available() {
            eprintln!("skipping: no python interpreter on PATH");
            return;
        }
        let dir = TempDir::new().unwrap();
        let runner = runner_in(&dir);

        let result = runner
            .execute_code("print('hello')", Duration::from_secs(10))
            .await;

        assert_eq!(result.outcome, ExecutionOutcome::Completed);
        assert_eq!(result.exit_status, 0);
        assert_eq!(result.stdout.trim_end(), "hello");
        assert_eq!(result.stderr, "");
        assert!(workspace_entries(&runner).is_empty());
    }

    #[tokio::test]
    async fn test_child_exit_code_is_reported() {
        if !python_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let runner = runner_in(&dir);

        let result = runner
            .execute_code("import sys\nsys.exit(3)", Duration::from_secs(10))
            .await;

        assert_eq!(result.outcome, ExecutionOutcome::Completed);
        assert_eq!(result.exit_status, 3);
    }

    #[tokio::test]
    async fn test_syntax_error_goes_to_stderr() {
        if !python_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let runner = runner_in(&dir);

        let result = runner
            .execute_code("def broken(:\n    pass\n", Duration::from_secs(10))
            .await;

        assert_eq!(result.outcome, ExecutionOutcome::Completed);
        assert_ne!(result.exit_status, 0);
        assert!(result.stderr.contains("SyntaxError"), "stderr: {}", result.stderr);
        assert!(workspace_entries(&runner).is_empty());
    }

    #[tokio::test]
    async fn test_timeout_kills_child() {
        if !python_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let runner = runner_in(&dir);

        let started = Instant::now();
        let result = runner
            .execute_code(
                "import time\nprint('started', flush=True)\ntime.sleep(30)",
                Duration::from_millis(500),
            )
            .await;

        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(result.outcome, ExecutionOutcome::TimedOut);
        assert_eq!(result.stdout, "");
        assert_eq!(result.stderr, "Execution timed out");
        assert_eq!(result.exit_status, -1);
        assert!(workspace_entries(&runner).is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_signal_death_maps_to_128_plus_signal() {
        if !python_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let runner = runner_in(&dir);

        let result = runner
            .execute_code(
                "import os, signal\nos.kill(os.getpid(), signal.SIGKILL)",
                Duration::from_secs(10),
            )
            .await;

        assert_eq!(result.outcome, ExecutionOutcome::Completed);
        assert_eq!(result.exit_status, 128 + 9);
    }

    #[tokio::test]
    async fn test_runs_inside_workspace() {
        if !python_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let runner = runner_in(&dir);

        let result = runner
            .execute_code("import os\nprint(os.getcwd())", Duration::from_secs(10))
            .await;

        let expected = std::fs::canonicalize(runner.workspace()).unwrap();
        assert_eq!(PathBuf::from(result.stdout.trim_end()), expected);
    }

    #[tokio::test]
    async fn test_concurrent_runs_do_not_collide() {
        if !python_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let runner = Arc::new(runner_in(&dir));

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..8 {
            let runner = runner.clone();
            tasks.spawn(async move {
                let result = runner
                    .execute_code(&format!("print({})", i), Duration::from_secs(20))
                    .await;
                (i, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (i, result) = joined.unwrap();
            assert_eq!(result.exit_status, 0, "stderr: {}", result.stderr);
            assert_eq!(result.stdout.trim_end(), i.to_string());
        }
        assert!(workspace_entries(&runner).is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn test_isolated_environment_hides_parent_variables() {
        if !python_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        std::env::set_var("TAI_SANDBOX_SECRET", "hunter2");
        let code = "import os\nprint(os.environ.get('TAI_SANDBOX_SECRET', 'absent'))";

        let isolated = runner_in(&dir);
        let result = isolated.execute_code(code, Duration::from_secs(10)).await;
        assert_eq!(result.stdout.trim_end(), "absent");

        let open = SandboxedRunner::new(
            SandboxConfig::new(dir.path().join("open")).with_isolated_environment(false),
        );
        let result = open.execute_code(code, Duration::from_secs(10)).await;
        assert_eq!(result.stdout.trim_end(), "hunter2");

        std::env::remove_var("TAI_SANDBOX_SECRET");
    }

    #[tokio::test]
    #[serial]
    async fn test_isolated_environment_keeps_android_runtime() {
        if !python_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let previous = std::env::var_os("EXTERNAL_STORAGE");
        std::env::set_var("EXTERNAL_STORAGE", "/sdcard");

        let runner = runner_in(&dir);
        let result = runner
            .execute_code(
                "import os\nprint(os.environ.get('EXTERNAL_STORAGE', 'absent'))",
                Duration::from_secs(10),
            )
            .await;

        match previous {
            Some(value) => std::env::set_var("EXTERNAL_STORAGE", value),
            None => std::env::remove_var("EXTERNAL_STORAGE"),
        }
        assert_eq!(result.stdout.trim_end(), "/sdcard");
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_launch_failure() {
        let dir = TempDir::new().unwrap();
        let runner = SandboxedRunner::new(
            SandboxConfig::new(dir.path().join("workspace"))
                .with_interpreter("/nonexistent/bin/python3"),
        );

        let result = runner.execute_code("print(1)", Duration::from_secs(5)).await;

        assert_eq!(result.outcome, ExecutionOutcome::LaunchFailed);
        assert_eq!(result.exit_status, -1);
        assert_eq!(result.stdout, "");
        assert!(result.stderr.contains("/nonexistent/bin/python3"));
        assert!(workspace_entries(&runner).is_empty());
    }

    #[tokio::test]
    async fn test_unknown_interpreter_name_is_launch_failure() {
        let dir = TempDir::new().unwrap();
        let runner = SandboxedRunner::new(
            SandboxConfig::new(dir.path().join("workspace"))
                .with_interpreter("tai-no-such-python-interpreter"),
        );

        let result = runner.execute_code("print(1)", Duration::from_secs(5)).await;

        assert_eq!(result.outcome, ExecutionOutcome::LaunchFailed);
        assert!(result.stderr.contains("No Python interpreter found"));
    }

    #[tokio::test]
    async fn test_unusable_workspace_is_launch_failure() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "not a directory").unwrap();
        let runner = SandboxedRunner::new(SandboxConfig::new(blocker.join("workspace")));

        let result = runner.execute_code("print(1)", Duration::from_secs(5)).await;

        assert_eq!(result.outcome, ExecutionOutcome::LaunchFailed);
        assert_eq!(result.exit_status, -1);
        assert!(result.stderr.starts_with("Failed to prepare workspace"));
    }

    #[tokio::test]
    async fn test_nested_workspace_is_created() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b").join("c");
        let runner = SandboxedRunner::new(
            SandboxConfig::new(&nested).with_interpreter("/nonexistent/bin/python3"),
        );

        runner.execute_code("print(1)", Duration::from_secs(5)).await;
        assert!(nested.is_dir());
    }

    #[test]
    fn test_config_from_execution_settings() {
        let execution = ExecutionConfig {
            workspace: PathBuf::from("/tmp/tai-workspace"),
            timeout: 12,
            interpreter: Some(PathBuf::from("python3")),
            isolate_environment: false,
            inherit_env: vec!["PATH".to_string()],
        };
        let config = SandboxConfig::from(&execution);
        assert_eq!(config.workspace, PathBuf::from("/tmp/tai-workspace"));
        assert_eq!(config.default_timeout, Duration::from_secs(12));
        assert_eq!(config.interpreter, Some(PathBuf::from("python3")));
        assert!(!config.isolate_environment);
        assert_eq!(config.inherit_env, vec!["PATH".to_string()]);
    }

    #[test]
    fn test_default_timeout_is_thirty_seconds() {
        let runner = SandboxedRunner::new(SandboxConfig::new("/tmp/unused"));
        assert_eq!(runner.default_timeout(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_execute_code_default_runs_code() {
        if !python_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let runner = runner_in(&dir);

        let result = runner.execute_code_default("print('hello')").await;

        assert_eq!(result.outcome, ExecutionOutcome::Completed);
        assert_eq!(result.stdout.trim_end(), "hello");
        assert!(workspace_entries(&runner).is_empty());
    }

    #[tokio::test]
    async fn test_execute_code_default_uses_configured_timeout() {
        if !python_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let runner = SandboxedRunner::new(
            SandboxConfig::new(dir.path().join("workspace"))
                .with_default_timeout(Duration::from_millis(500)),
        );

        let started = Instant::now();
        let result = runner
            .execute_code_default("import time\ntime.sleep(30)")
            .await;

        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(result.outcome, ExecutionOutcome::TimedOut);
        assert_eq!(result.stderr, "Execution timed out");
        assert!(workspace_entries(&runner).is_empty());
    }
}
