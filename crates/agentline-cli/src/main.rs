//! agentline - terminal client for a streaming agent chat server.

use agentline_cli::config::Config;
use agentline_cli::logging::{self, LogConfig, LogFormat};
use agentline_cli::repl::Repl;
use agentline_core::{HttpBackend, SessionController};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;

/// Chat with an agent server from the terminal.
#[derive(Parser, Debug)]
#[command(name = "agentline")]
#[command(about = "Terminal client for a streaming agent chat server")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the agent server URL from config
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Load a stored session on start
    #[arg(short, long, value_name = "ID")]
    session: Option<String>,

    /// Enable verbose logging (backend calls and stream lifecycle)
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace logging (every frame and chunk)
    #[arg(long)]
    trace: bool,

    /// Quiet mode (WARN and ERROR only)
    #[arg(short, long)]
    quiet: bool,

    /// Set log level for specific targets (e.g. "stream=trace").
    /// Can be repeated. Targets are prefixed with "agentline::" automatically.
    #[arg(long = "log", value_name = "TARGET=LEVEL")]
    log_overrides: Vec<String>,

    /// Log output format
    #[arg(long = "log-format", value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&LogConfig::from_cli(
        cli.verbose,
        cli.debug,
        cli.trace,
        cli.quiet,
        &cli.log_overrides,
        cli.log_format,
    ))?;

    let mut config = Config::resolve(cli.config.as_deref())?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    tracing::info!(
        target: "agentline::startup",
        "Using agent server at {}",
        config.base_url
    );

    let backend = Arc::new(HttpBackend::new(config.backend_config())?);
    let mut controller = SessionController::new(backend, config.controller_config());

    if let Some(session_id) = &cli.session {
        controller
            .load_session(session_id)
            .await
            .with_context(|| format!("Failed to load session {}", session_id))?;
    }

    let mut repl = Repl::new(controller, config.download_dir.clone(), std::io::stdout());
    repl.greet()?;
    repl.run(BufReader::new(tokio::io::stdin())).await?;

    tracing::info!(target: "agentline::startup", "Goodbye");
    Ok(())
}
