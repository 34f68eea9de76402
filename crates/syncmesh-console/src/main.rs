use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use syncmesh_console::config::{default_log_path, ConsoleConfig};
use syncmesh_console::oneshot::{self, Command};
use syncmesh_console::operator_console::run_operator_console;

const DEFAULT_LOG_FILTER: &str = "syncmesh_console=info";

/// Operator console for a SyncMesh node.
///
/// Without a subcommand, opens the interactive console.
#[derive(Parser, Debug)]
#[command(name = "syncmesh-console", version, about)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base URL of the node's admin API.
    #[arg(long)]
    base_url: Option<String>,

    /// Initial guess for this node's id.
    #[arg(long)]
    node_id: Option<String>,

    /// Delay before re-checking the leader after an election, in ms.
    #[arg(long)]
    election_delay_ms: Option<u64>,

    /// Write interactive-mode logs here.
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    fn apply_overrides(&self, config: &mut ConsoleConfig) {
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        if let Some(id) = &self.node_id {
            config.node_id = Some(id.clone());
        }
        if let Some(ms) = self.election_delay_ms {
            config.election_recheck_delay_ms = ms;
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// One-shot mode logs to stderr so stdout stays clean for the report.
fn init_stderr_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .try_init();
}

/// The TUI owns the terminal, so logs go to a file or nowhere.
fn init_file_logging(path: Option<PathBuf>) -> anyhow::Result<()> {
    let Some(path) = path.or_else(default_log_path) else {
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .try_init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = ConsoleConfig::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);

    match &cli.command {
        Some(command) => {
            init_stderr_logging();
            let mut controller = syncmesh_console::controller_from_config(&config)?;
            let report = oneshot::run(&mut controller, command).await;
            for line in &report.lines {
                println!("{}", line);
            }
            Ok(if report.failed {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        None => {
            init_file_logging(cli.log_file.clone())?;
            tracing::info!(base_url = %config.base_url, "Starting operator console");
            let controller = syncmesh_console::controller_from_config(&config)?;
            run_operator_console(controller, config.tick_rate()).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
