//! Turnover Planner - daily assignment and routing engine for cleaning crews
//!
//! Reads a plan request (dates, task pools, rosters) as JSON, plans every
//! date, and writes the aggregated report as JSON.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Command};
use turnover_planner::{PlanRequest, Planner, PlannerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs directory - use LOGS_DIR env var or default to ./logs
    let logs_dir = std::env::var("LOGS_DIR").unwrap_or_else(|_| "logs".to_string());
    std::fs::create_dir_all(&logs_dir).ok();

    // File appender for persistent logs (daily rotation)
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &logs_dir, "planner.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Initialize logging - both stderr and file; stdout stays clean for the report
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,turnover_planner=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    let args = Cli::parse();
    match args.command {
        Some(Command::CheckConfig { config }) => {
            PlannerConfig::load(config.as_deref())?;
            info!("configuration ok");
            Ok(())
        }
        Some(Command::Plan { input, output, config }) => plan(input, output, config).await,
        None => plan(None, None, None).await,
    }
}

async fn plan(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
) -> Result<()> {
    let config = PlannerConfig::load(config.as_deref())?;
    info!("configuration loaded");

    let raw = match &input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read plan request {}", path.display()))?,
        None => std::io::read_to_string(std::io::stdin()).context("failed to read stdin")?,
    };
    let request: PlanRequest = serde_json::from_str(&raw).context("invalid plan request")?;
    info!("planning {} dates", request.days.len());

    // Ctrl-C flips the token; each date returns its best partial result.
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing with partial results");
            interrupt.cancel();
        }
    });

    let planner = Planner::new(config)?;
    let report = planner.run_with_cancel(request, cancel).await?;

    let json = serde_json::to_string_pretty(&report).context("failed to serialize report")?;
    match &output {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("failed to write report {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}
