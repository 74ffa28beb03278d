//! Cancel command handler

use anyhow::{Result, bail};
use colored::*;
use runlog_client::RunlogClient;

use crate::config::Config;
use crate::id_resolver::resolve_run_id;
use crate::types::RunRef;

pub async fn cancel_run(config: &Config, run: &str, reason: Option<String>) -> Result<()> {
    let client = RunlogClient::new(&config.server_url);
    let run_id = resolve_run_id(&client, &RunRef::parse(run)).await?;

    match client.cancel_run(&run_id, reason).await {
        Ok(_) => {
            println!("{} Cancellation requested for run {}", "✓".green(), run_id.cyan());
            Ok(())
        }
        Err(e) if e.is_not_found() => {
            bail!("Run {} does not exist or has already finished", run_id)
        }
        Err(e) => Err(e.into()),
    }
}
