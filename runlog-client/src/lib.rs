//! Runlog HTTP Client
//!
//! A simple, type-safe HTTP client for the Runlog server API, shared by the
//! CLI and by producers that report logs over HTTP.
//!
//! # Example
//!
//! ```no_run
//! use runlog_client::RunlogClient;
//! use runlog_core::dto::run::StartRun;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = RunlogClient::new("http://localhost:8080");
//!
//!     let run = client.start_run(StartRun::default()).await?;
//!     let page = client.get_logs(&run.run_id, 0).await?;
//!
//!     println!("{} entries, next cursor {}", page.logs.len(), page.next_cursor);
//!     Ok(())
//! }
//! ```

pub mod error;
mod cancel;
mod logs;
mod runs;

// Re-export commonly used types
pub use error::{ClientError, Result};

use reqwest::Client;
use serde::de::DeserializeOwned;

/// HTTP client for the Runlog server API
///
/// Methods are organized into logical groups:
/// - Runs (start, get, list, complete)
/// - Logs (ingest, flush, cursor reads, latest, export)
/// - Cancellation (request, poll, acknowledge)
#[derive(Debug, Clone)]
pub struct RunlogClient {
    /// Base URL of the server (e.g., "http://localhost:8080")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl RunlogClient {
    /// Create a new client
    ///
    /// # Example
    /// ```
    /// use runlog_client::RunlogClient;
    ///
    /// let client = RunlogClient::new("http://localhost:8080");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Check the status code, then deserialize the JSON body
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let response = Self::check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Check the status code, then return the body as text
    async fn handle_text_response(&self, response: reqwest::Response) -> Result<String> {
        let response = Self::check_status(response).await?;

        Ok(response.text().await?)
    }

    /// Check the status code of a response whose body is ignored
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        Self::check_status(response).await?;
        Ok(())
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        tracing::debug!("Request failed with status {}: {}", status, body);

        Err(ClientError::api_error(status.as_u16(), error_message(body)))
    }
}

/// Pull the message out of a `{"error": "..."}` body, falling back to the raw text
fn error_message(body: String) -> String {
    serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = RunlogClient::new("http://localhost:8080");
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = RunlogClient::new("http://localhost:8080/");
        assert_eq!(client.url("/runs"), "http://localhost:8080/runs");
    }

    #[test]
    fn test_client_with_custom_client() {
        let http_client = Client::new();
        let client = RunlogClient::with_client("http://localhost:8080", http_client);
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"error":"Run r1 not found"}"#.to_string()),
            "Run r1 not found"
        );
        assert_eq!(error_message("Bad Gateway".to_string()), "Bad Gateway");
    }
}
