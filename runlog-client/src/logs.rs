//! Log endpoints

use crate::RunlogClient;
use crate::error::Result;
use runlog_core::dto::log::{FlushResponse, IngestResponse, LatestLogPage, LogPage, NewLogEntry};

impl RunlogClient {
    /// Send a batch of log entries for a run
    ///
    /// Entries are buffered by the server and become durable on the next flush.
    pub async fn add_logs(&self, run_id: &str, entries: &[NewLogEntry]) -> Result<usize> {
        let url = self.url(&format!("/runs/{}/logs", run_id));
        let response = self.client.post(&url).json(entries).send().await?;

        let accepted: IngestResponse = self.handle_response(response).await?;
        Ok(accepted.accepted)
    }

    /// Force the server to persist a run's buffered entries
    pub async fn flush_logs(&self, run_id: &str) -> Result<usize> {
        let url = self.url(&format!("/runs/{}/logs/flush", run_id));
        let response = self.client.post(&url).send().await?;

        let flushed: FlushResponse = self.handle_response(response).await?;
        Ok(flushed.flushed)
    }

    /// Get a run's entries starting at `cursor`
    pub async fn get_logs(&self, run_id: &str, cursor: usize) -> Result<LogPage> {
        let url = self.url(&format!("/runs/{}/logs", run_id));
        let response = self
            .client
            .get(&url)
            .query(&[("cursor", cursor)])
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Get entries of whichever run is newest
    pub async fn get_latest_logs(&self, cursor: usize) -> Result<LatestLogPage> {
        let response = self
            .client
            .get(self.url("/logs/latest"))
            .query(&[("cursor", cursor)])
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Download a run's whole log as JSON Lines
    pub async fn export_logs(&self, run_id: &str) -> Result<String> {
        let url = self.url(&format!("/runs/{}/logs/export", run_id));
        let response = self.client.get(&url).send().await?;

        self.handle_text_response(response).await
    }
}
