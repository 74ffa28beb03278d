//! Run endpoints

use crate::RunlogClient;
use crate::error::Result;
use runlog_core::domain::run::{RunRecord, RunStatus, RunSummary};
use runlog_core::dto::run::{CompleteRun, StartRun};

impl RunlogClient {
    /// Register a run; the server generates an ID when none is given
    pub async fn start_run(&self, req: StartRun) -> Result<RunRecord> {
        let response = self.client.post(self.url("/runs")).json(&req).send().await?;

        self.handle_response(response).await
    }

    pub async fn get_run(&self, run_id: &str) -> Result<RunRecord> {
        let url = self.url(&format!("/runs/{}", run_id));
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// The most recently started run
    pub async fn latest_run(&self) -> Result<RunRecord> {
        let response = self.client.get(self.url("/runs/latest")).send().await?;

        self.handle_response(response).await
    }

    /// List runs, newest first
    pub async fn list_runs(&self) -> Result<Vec<RunSummary>> {
        let response = self.client.get(self.url("/runs")).send().await?;

        self.handle_response(response).await
    }

    /// Record a run's terminal status
    pub async fn complete_run(&self, run_id: &str, status: RunStatus) -> Result<RunRecord> {
        let url = self.url(&format!("/runs/{}/complete", run_id));
        let response = self
            .client
            .post(&url)
            .json(&CompleteRun { status })
            .send()
            .await?;

        self.handle_response(response).await
    }
}
