//! HTTP client for network-based API calls

use crate::{ClientConfig, ClientError, ClientResult};
use serde::de::DeserializeOwned;
use shared::{DbStatus, ErrorBody, HealthResponse};

/// HTTP client for making network requests to the Movie Hunt server
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpClient {
    /// Create a new HTTP client from configuration
    pub fn new(config: &ClientConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: config.base_url.clone(),
        }
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let response = self.client.get(&url).send().await?;
        Self::handle_response(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let response = self.client.post(&url).json(body).send().await?;
        Self::handle_response(response).await
    }

    /// Handle the HTTP response
    ///
    /// Non-success responses keep the structured error body (when the
    /// server sent one) so callers can classify database-unavailable
    /// errors without string matching.
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await?;
            let body = serde_json::from_str::<ErrorBody>(&text).ok();
            return Err(ClientError::Api { status, body, text });
        }

        response.json().await.map_err(Into::into)
    }

    // ========== Status API ==========

    /// Fetch the database connection status document
    pub async fn db_status(&self) -> ClientResult<DbStatus> {
        self.get("/api/db-status").await
    }

    /// Fetch the server health document
    pub async fn health(&self) -> ClientResult<HealthResponse> {
        self.get("/api/health").await
    }
}
