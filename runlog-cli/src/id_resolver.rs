//! ID resolver module
//!
//! Resolves `latest` and run ID prefixes to full run IDs by querying the API.
//! This allows users to specify short, unambiguous prefixes instead of full IDs.

use anyhow::{Context, Result, anyhow};
use runlog_client::RunlogClient;
use runlog_core::domain::run::RunSummary;

use crate::types::RunRef;

/// Resolve a run reference to a full run ID
///
/// # Errors
/// Returns an error if:
/// - There are no runs (for `latest`)
/// - No run matches the prefix
/// - Multiple runs match the prefix (ambiguous)
/// - API call fails
pub async fn resolve_run_id(client: &RunlogClient, run_ref: &RunRef) -> Result<String> {
    let prefix = match run_ref {
        RunRef::Latest => {
            return match client.latest_run().await {
                Ok(run) => Ok(run.run_id),
                Err(e) if e.is_not_found() => Err(anyhow!("No runs found")),
                Err(e) => Err(e).context("Failed to fetch the latest run"),
            };
        }
        RunRef::Id(prefix) => prefix,
    };

    let runs = client
        .list_runs()
        .await
        .context("Failed to fetch runs for ID resolution")?;

    match_run_id(&runs, prefix)
}

/// Find the single run whose ID equals or starts with `prefix`
fn match_run_id(runs: &[RunSummary], prefix: &str) -> Result<String> {
    if runs.iter().any(|r| r.run_id == prefix) {
        return Ok(prefix.to_string());
    }

    let matches: Vec<&str> = runs
        .iter()
        .map(|r| r.run_id.as_str())
        .filter(|id| id.starts_with(prefix))
        .collect();

    match matches.as_slice() {
        // Unindexed runs can still be addressed by their full ID
        [] => Ok(prefix.to_string()),
        [id] => Ok(id.to_string()),
        ids => Err(anyhow!(
            "Ambiguous prefix '{}' matches multiple runs: {}",
            prefix,
            ids.join(", ")
        )),
    }
}
