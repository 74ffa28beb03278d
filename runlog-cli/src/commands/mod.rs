//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod cancel;
mod logs;
mod run;

pub use run::RunCommands;

use anyhow::Result;
use clap::Subcommand;
use std::time::Duration;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run management
    Run {
        #[command(subcommand)]
        command: RunCommands,
    },
    /// Show a run's logs
    Logs {
        /// Run ID, unambiguous prefix, or "latest"
        run: String,

        /// Skip entries before this position
        #[arg(short, long, default_value_t = 0)]
        cursor: usize,

        /// Keep polling for new entries until the run finishes
        #[arg(short, long)]
        follow: bool,

        /// Poll interval in milliseconds when following
        #[arg(long, default_value_t = 1000)]
        interval: u64,
    },
    /// Show logs of the newest run
    Latest {
        #[arg(short, long, default_value_t = 0)]
        cursor: usize,
    },
    /// Write a run's full log as JSON Lines
    Export {
        /// Run ID, unambiguous prefix, or "latest"
        run: String,

        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<std::path::PathBuf>,
    },
    /// Cancel an in-progress run
    Cancel {
        /// Run ID, unambiguous prefix, or "latest"
        run: String,

        #[arg(short, long)]
        reason: Option<String>,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Run { command } => run::handle_run_command(command, config).await,
        Commands::Logs {
            run,
            cursor,
            follow,
            interval,
        } => {
            let interval = Duration::from_millis(interval.max(1));
            logs::show_logs(config, &run, cursor, follow, interval).await
        }
        Commands::Latest { cursor } => logs::show_latest(config, cursor).await,
        Commands::Export { run, output } => logs::export(config, &run, output).await,
        Commands::Cancel { run, reason } => cancel::cancel_run(config, &run, reason).await,
    }
}
