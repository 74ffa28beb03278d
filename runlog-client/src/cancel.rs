//! Cancellation endpoints

use crate::RunlogClient;
use crate::error::Result;
use runlog_core::dto::run::{CancelRunRequest, CancelRunResponse, CancelStatus};

impl RunlogClient {
    /// Cancel an in-progress run
    ///
    /// Fails with a 404 error when the run is unknown or already finished.
    pub async fn cancel_run(&self, run_id: &str, reason: Option<String>) -> Result<bool> {
        let url = self.url(&format!("/runs/{}/cancel", run_id));
        let response = self
            .client
            .post(&url)
            .json(&CancelRunRequest { reason })
            .send()
            .await?;

        let result: CancelRunResponse = self.handle_response(response).await?;
        Ok(result.cancelled)
    }

    /// Whether cancellation was requested for a run, from any instance
    pub async fn is_cancel_requested(&self, run_id: &str) -> Result<bool> {
        let url = self.url(&format!("/runs/{}/cancel", run_id));
        let response = self.client.get(&url).send().await?;

        let status: CancelStatus = self.handle_response(response).await?;
        Ok(status.cancel_requested)
    }

    /// Tell the server the producer has stopped
    pub async fn acknowledge_cancel(&self, run_id: &str) -> Result<()> {
        let url = self.url(&format!("/runs/{}/cancel/ack", run_id));
        let response = self.client.post(&url).send().await?;

        self.handle_empty_response(response).await
    }
}
