//! Log command handlers
//!
//! Cursor reads, follow mode, latest-run view and JSONL export.

use anyhow::{Context, Result};
use colored::*;
use runlog_client::RunlogClient;
use runlog_core::domain::log::{LogEntry, LogLevel};
use runlog_core::dto::log::LogPage;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;
use crate::id_resolver::resolve_run_id;
use crate::types::RunRef;

/// Print a run's logs, optionally polling for new ones
pub async fn show_logs(
    config: &Config,
    run: &str,
    cursor: usize,
    follow: bool,
    interval: Duration,
) -> Result<()> {
    let client = RunlogClient::new(&config.server_url);
    let run_id = resolve_run_id(&client, &RunRef::parse(run)).await?;

    if !follow {
        let page = client.get_logs(&run_id, cursor).await?;

        if page.logs.is_empty() {
            println!("{}", "No logs found for this run.".yellow());
        } else {
            println!("{}", format!("Logs for run {}:", run_id).bold());
            println!("{}", "─".repeat(80).dimmed());
            for log in &page.logs {
                print_log_entry(log);
            }
            println!("{}", "─".repeat(80).dimmed());
            println!("{}", format!("next cursor: {}", page.next_cursor).dimmed());
        }

        return Ok(());
    }

    follow_logs(&client, &run_id, cursor, interval).await
}

/// Poll a run until it has finished and a final read returns nothing new
async fn follow_logs(
    client: &RunlogClient,
    run_id: &str,
    mut cursor: usize,
    interval: Duration,
) -> Result<()> {
    println!("{}", format!("Following run {} (ctrl-c to stop)", run_id).bold());
    println!("{}", "─".repeat(80).dimmed());

    let mut finished = false;
    loop {
        let page = fetch_page(client, run_id, cursor).await?;
        for log in &page.logs {
            print_log_entry(log);
        }
        cursor = page.next_cursor;

        if page.logs.is_empty() {
            if finished {
                break;
            }
            // One more read after the run ends picks up its last flush
            finished = run_finished(client, run_id).await?;
        }

        if !finished || !page.logs.is_empty() {
            tokio::time::sleep(interval).await;
        }
    }

    println!("{}", "─".repeat(80).dimmed());
    let record = client.get_run(run_id).await?;
    println!(
        "Run finished: {}",
        super::run::colorize_status(&record.status)
    );

    Ok(())
}

/// Runs that were never registered are treated as still running
async fn run_finished(client: &RunlogClient, run_id: &str) -> Result<bool> {
    match client.get_run(run_id).await {
        Ok(record) => Ok(record.status.is_terminal()),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// A run with no entries yet reads as an empty page
async fn fetch_page(client: &RunlogClient, run_id: &str, cursor: usize) -> Result<LogPage> {
    match client.get_logs(run_id, cursor).await {
        Ok(page) => Ok(page),
        Err(e) if e.is_not_found() => Ok(LogPage {
            logs: Vec::new(),
            next_cursor: cursor,
        }),
        Err(e) => Err(e.into()),
    }
}

/// Print the newest run's logs
pub async fn show_latest(config: &Config, cursor: usize) -> Result<()> {
    let client = RunlogClient::new(&config.server_url);
    let page = client.get_latest_logs(cursor).await?;

    let Some(run_id) = page.run_id else {
        println!("{}", "No runs found.".yellow());
        return Ok(());
    };

    println!("{}", format!("Logs for latest run {}:", run_id).bold());
    println!("{}", "─".repeat(80).dimmed());
    for log in &page.logs {
        print_log_entry(log);
    }
    println!("{}", "─".repeat(80).dimmed());
    println!("{}", format!("next cursor: {}", page.next_cursor).dimmed());

    Ok(())
}

/// Write a run's full log as JSON Lines to a file or stdout
pub async fn export(config: &Config, run: &str, output: Option<PathBuf>) -> Result<()> {
    let client = RunlogClient::new(&config.server_url);
    let run_id = resolve_run_id(&client, &RunRef::parse(run)).await?;

    let jsonl = client.export_logs(&run_id).await?;

    match output {
        Some(path) => {
            let mut contents = jsonl;
            if !contents.is_empty() {
                contents.push('\n');
            }
            tokio::fs::write(&path, contents)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "{} Exported run {} to {}",
                "✓".green(),
                run_id.cyan(),
                path.display()
            );
        }
        None => println!("{}", jsonl),
    }

    Ok(())
}

/// Print a log entry
fn print_log_entry(log: &LogEntry) {
    let level_colored = match log.level {
        LogLevel::Debug => log.level.as_str().dimmed(),
        LogLevel::Info => log.level.as_str().cyan(),
        LogLevel::Warn => log.level.as_str().yellow(),
        LogLevel::Error => log.level.as_str().red(),
    };

    let agent = log
        .agent
        .as_deref()
        .map(|a| format!("{} ", a.magenta()))
        .unwrap_or_default();

    println!(
        "{} [{}] {}{}",
        log.timestamp.format("%H:%M:%S").to_string().dimmed(),
        level_colored,
        agent,
        log.message
    );

    if let Some(data) = &log.data {
        let rendered = serde_json::to_string(data).unwrap_or_else(|_| data.to_string());
        println!("         {}", rendered.dimmed());
    }
}
