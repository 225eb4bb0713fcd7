use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::identity::AgentIdentity;
use crate::transport::Transport;
use crate::AGENT_VERSION;

pub const HEARTBEAT_ENDPOINT: &str = "/api/v1/agents/heartbeat";

/// Body of `POST /api/v1/agents/heartbeat`.
#[derive(Debug, Clone, Serialize)]
pub struct HeartbeatRequest {
    pub agent_id: String,
    pub hostname: String,
    pub connection_status: String,
    pub ip_addresses: Vec<String>,
    pub agent_version: String,
    pub operating_system: String,
    pub architecture: String,
}

impl HeartbeatRequest {
    pub fn from_identity(identity: &AgentIdentity) -> Self {
        Self {
            agent_id: identity.agent_id.clone(),
            hostname: identity.hostname.clone(),
            connection_status: "active".to_string(),
            ip_addresses: identity.ip_addresses.clone(),
            agent_version: AGENT_VERSION.to_string(),
            operating_system: identity.operating_system.clone(),
            architecture: identity.architecture.clone(),
        }
    }
}

/// Controller's heartbeat response body.
#[derive(Debug, Clone, Deserialize)]
struct HeartbeatResponse {
    status: String,
    #[serde(default)]
    config_updated: bool,
    #[serde(default)]
    next_heartbeat_in_seconds: Option<u64>,
    authorized: bool,
}

/// Result of one accepted heartbeat exchange.
#[derive(Debug, Clone)]
pub struct HeartbeatOutcome {
    pub accepted: bool,
    pub authorized: bool,
    /// Advisory only; the configured interval stays authoritative
    pub next_heartbeat_in_seconds: Option<u64>,
    pub config_updated: bool,
}

/// Builds heartbeat requests from the agent identity and interprets the
/// controller's responses.
pub struct HeartbeatClient {
    transport: Arc<dyn Transport>,
    identity: AgentIdentity,
}

impl HeartbeatClient {
    pub fn new(transport: Arc<dyn Transport>, identity: AgentIdentity) -> Self {
        Self {
            transport,
            identity,
        }
    }

    /// Perform exactly one heartbeat exchange.
    ///
    /// # Errors
    ///
    /// - `Network`: transport failure
    /// - `Auth`: HTTP 401, never retried by the retry policy
    /// - `Server`: any other non-200 status
    /// - `Protocol`: a 200 response whose body lacks the expected fields
    pub async fn send(&self) -> Result<HeartbeatOutcome> {
        let request = HeartbeatRequest::from_identity(&self.identity);
        let body = serde_json::to_value(&request)
            .map_err(|e| AgentError::Protocol(format!("failed to encode heartbeat: {}", e)))?;

        tracing::debug!(endpoint = HEARTBEAT_ENDPOINT, "Sending heartbeat");
        let response = self.transport.post_json(HEARTBEAT_ENDPOINT, &body).await?;

        if response.status == 401 {
            return Err(AgentError::Auth {
                status: response.status,
            });
        }
        if response.status != 200 {
            return Err(AgentError::Server {
                status: response.status,
                message: response.body,
            });
        }

        let parsed: HeartbeatResponse = serde_json::from_str(&response.body)
            .map_err(|e| AgentError::Protocol(format!("invalid heartbeat response: {}", e)))?;

        let outcome = HeartbeatOutcome {
            accepted: parsed.status == "accepted",
            authorized: parsed.authorized,
            next_heartbeat_in_seconds: parsed.next_heartbeat_in_seconds,
            config_updated: parsed.config_updated,
        };

        tracing::info!(
            accepted = outcome.accepted,
            authorized = outcome.authorized,
            "Heartbeat acknowledged"
        );

        Ok(outcome)
    }
}
