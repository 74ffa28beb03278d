//! Run command handlers
//!
//! Handles run registration, listing and completion.

use anyhow::Result;
use clap::{Subcommand, ValueEnum};
use colored::*;
use runlog_client::RunlogClient;
use runlog_core::domain::run::{RunRecord, RunStatus, RunSummary};
use runlog_core::dto::run::StartRun;

use crate::config::Config;
use crate::id_resolver::resolve_run_id;
use crate::types::RunRef;

/// Run subcommands
#[derive(Subcommand)]
pub enum RunCommands {
    /// Register a new run; it becomes the latest
    Start {
        /// Run ID; generated when omitted
        #[arg(long)]
        id: Option<String>,

        /// Human-readable name
        #[arg(short, long)]
        name: Option<String>,
    },
    /// List runs, newest first
    List,
    /// Get run details
    Get {
        /// Run ID, unambiguous prefix, or "latest"
        run: String,
    },
    /// Record a run's final status
    Complete {
        /// Run ID, unambiguous prefix, or "latest"
        run: String,

        #[arg(short, long, value_enum, default_value_t = FinalStatus::Completed)]
        status: FinalStatus,
    },
}

/// Statuses a run can be completed with
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FinalStatus {
    Completed,
    Failed,
    Cancelled,
}

impl From<FinalStatus> for RunStatus {
    fn from(status: FinalStatus) -> Self {
        match status {
            FinalStatus::Completed => RunStatus::Completed,
            FinalStatus::Failed => RunStatus::Failed,
            FinalStatus::Cancelled => RunStatus::Cancelled,
        }
    }
}

/// Handle run commands
pub async fn handle_run_command(command: RunCommands, config: &Config) -> Result<()> {
    let client = RunlogClient::new(&config.server_url);

    match command {
        RunCommands::Start { id, name } => start_run(&client, id, name).await,
        RunCommands::List => list_runs(&client).await,
        RunCommands::Get { run } => get_run(&client, &run).await,
        RunCommands::Complete { run, status } => complete_run(&client, &run, status).await,
    }
}

async fn start_run(client: &RunlogClient, run_id: Option<String>, name: Option<String>) -> Result<()> {
    let record = client.start_run(StartRun { run_id, name }).await?;

    println!("{} Started run {}", "✓".green(), record.run_id.cyan());

    Ok(())
}

async fn list_runs(client: &RunlogClient) -> Result<()> {
    let runs = client.list_runs().await?;

    if runs.is_empty() {
        println!("{}", "No runs found.".yellow());
    } else {
        println!("{}", format!("Found {} run(s):", runs.len()).bold());
        println!();
        for run in runs {
            print_run_summary(&run);
        }
    }

    Ok(())
}

async fn get_run(client: &RunlogClient, run: &str) -> Result<()> {
    let run_id = resolve_run_id(client, &RunRef::parse(run)).await?;
    let record = client.get_run(&run_id).await?;

    print_run_details(&record);

    Ok(())
}

async fn complete_run(client: &RunlogClient, run: &str, status: FinalStatus) -> Result<()> {
    let run_id = resolve_run_id(client, &RunRef::parse(run)).await?;
    let record = client.complete_run(&run_id, status.into()).await?;

    println!(
        "{} Run {} is now {}",
        "✓".green(),
        record.run_id.cyan(),
        colorize_status(&record.status)
    );

    Ok(())
}

fn print_run_summary(run: &RunSummary) {
    println!("  {} Run {}", "▸".cyan(), run.run_id.dimmed());
    if let Some(name) = &run.name {
        println!("    Name:     {}", name);
    }
    println!(
        "    Started:  {}",
        run.started_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!();
}

fn print_run_details(run: &RunRecord) {
    println!("{}", "Run Details:".bold());
    println!("  ID:          {}", run.run_id.cyan());
    if let Some(name) = &run.name {
        println!("  Name:        {}", name);
    }
    println!("  Status:      {}", colorize_status(&run.status));
    println!("  Started:     {}", run.started_at.format("%Y-%m-%d %H:%M:%S"));

    if let Some(completed) = run.completed_at {
        println!("  Completed:   {}", completed.format("%Y-%m-%d %H:%M:%S"));

        let seconds = completed.signed_duration_since(run.started_at).num_seconds();
        println!("  Duration:    {}s", seconds);
    }

    if let Some(reason) = &run.cancel_reason {
        println!("  Reason:      {}", reason.yellow());
    }
}

/// Colorize run status for display
pub fn colorize_status(status: &RunStatus) -> ColoredString {
    let status_str = format!("{:?}", status);
    match status {
        RunStatus::Running => status_str.cyan(),
        RunStatus::Completed => status_str.green(),
        RunStatus::Failed => status_str.red(),
        RunStatus::Cancelled => status_str.dimmed(),
    }
}
