use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tai_cli::{ConsoleFrontend, Session};
use tai_core::config::{expand_home, AssistantConfig, ConfigLoader};
use tai_core::{llm, CodeGenerator, SandboxConfig, SandboxedRunner};

#[derive(Parser, Debug)]
#[clap(
    name = "tai",
    author,
    version,
    about = "Turn natural-language requests into Python and run them in a sandbox"
)]
struct Cli {
    #[clap(
        long,
        short,
        help = "Settings file (default: ~/.config/termux_ai_assistant/config.yaml)"
    )]
    config: Option<PathBuf>,

    #[clap(long, short, help = "Log level (default: the configured level)")]
    log_level: Option<String>,

    #[clap(long, help = "Directory scratch scripts are written to and run in")]
    workspace: Option<PathBuf>,

    #[clap(
        long,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Seconds before a running script is killed"
    )]
    timeout: Option<u64>,

    #[clap(long, help = "Handle a single request and exit")]
    task: Option<String>,

    #[clap(long, short, help = "Run generated code without asking for confirmation")]
    yes: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    std::panic::set_hook(Box::new(|panic_info| {
        // dialoguer hides the cursor while a prompt is active.
        let _ = crossterm::execute!(std::io::stdout(), crossterm::cursor::Show);
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));

    let config_path = match &cli.config {
        Some(path) => expand_home(path),
        None => ConfigLoader::default_config_path()?,
    };
    let mut config = ConfigLoader::load_or_create(&config_path)
        .await
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;
    apply_overrides(&mut config, &cli);

    init_logging(&config, cli.log_level.as_deref())?;
    log::info!("Configuration loaded from {}", config_path.display());

    let backend = llm::create_llm_client(&config.llm, Some(config.credentials_path.clone()))?;
    let generator = CodeGenerator::new(backend);
    let runner = Arc::new(SandboxedRunner::new(SandboxConfig::from(&config.execution)));

    let mut session =
        Session::new(ConsoleFrontend::new(), generator, runner).with_auto_confirm(cli.yes);

    if let Some(prompt) = cli.task.as_deref() {
        log::info!("Running single task");
        let code = session.run_task(prompt).await;
        return Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)));
    }

    session.run().await?;
    log::info!("Session ended");
    Ok(ExitCode::SUCCESS)
}

fn apply_overrides(config: &mut AssistantConfig, cli: &Cli) {
    if let Some(workspace) = &cli.workspace {
        config.execution.workspace = expand_home(workspace);
    }
    if let Some(timeout) = cli.timeout {
        config.execution.timeout = timeout;
    }
}

/// Logs go to the configured file so they never interleave with prompts.
fn init_logging(config: &AssistantConfig, cli_level: Option<&str>) -> Result<()> {
    let level = cli_level.unwrap_or(&config.logging.level);
    let log_level_filter = level.parse().unwrap_or(LevelFilter::Info);

    let mut builder = env_logger::Builder::new();
    builder.filter_level(log_level_filter);

    if let Some(path) = &config.logging.file {
        builder.target(env_logger::Target::Pipe(Box::new(open_log_file(path)?)));
    }

    builder.init();
    Ok(())
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}
