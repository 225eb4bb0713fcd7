use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AgentError, Result};

/// Per-request timeout. In-flight exchanges are never aborted from outside;
/// this timeout is their only bound.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of one request/response exchange with the controller.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Authenticated request/response exchanges against controller endpoints.
///
/// Implementations return `AgentError::Network` for transport-level failures
/// (unreachable, timeout). HTTP status interpretation is left to callers,
/// which know the per-endpoint contract.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, path: &str) -> Result<TransportResponse>;
    async fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<TransportResponse>;
}

/// Production transport: HTTPS with mandatory certificate validation, bearer
/// token and `X-Agent-ID` header on every request.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    auth_token: String,
    agent_id: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, auth_token: &str, agent_id: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AgentError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: auth_token.to_string(),
            agent_id: agent_id.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn into_response(response: reqwest::Response) -> Result<TransportResponse> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(TransportResponse { status, body })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str) -> Result<TransportResponse> {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.auth_token)
            .header("X-Agent-ID", &self.agent_id)
            .header("Accept", "application/json")
            .send()
            .await?;
        Self::into_response(response).await
    }

    async fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<TransportResponse> {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.auth_token)
            .header("X-Agent-ID", &self.agent_id)
            .json(body)
            .send()
            .await?;
        Self::into_response(response).await
    }
}
