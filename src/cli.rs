//! CLI argument parsing for the turnover-planner binary.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "turnover-planner", about = "Daily assignment and routing for cleaning crews")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Plan the request on stdin or in a file (default if no subcommand given)
    Plan {
        /// Plan request JSON; stdin when absent
        #[arg(long)]
        input: Option<PathBuf>,
        /// Report destination; stdout when absent
        #[arg(long)]
        output: Option<PathBuf>,
        /// Planner config JSON; PLANNER_CONFIG or defaults when absent
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Validate a planner config file and exit
    CheckConfig {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}
