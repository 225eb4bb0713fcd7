use std::net::UdpSocket;

use uuid::Uuid;

use crate::config::AgentConfig;

/// Immutable identity of this agent process, reported in every heartbeat.
#[derive(Debug, Clone)]
pub struct AgentIdentity {
    /// Stable opaque identifier; from config or generated on first run
    pub agent_id: String,
    pub hostname: String,
    pub operating_system: String,
    pub architecture: String,
    /// Non-loopback addresses; contains only the loopback address when
    /// nothing else is discoverable. Never empty.
    pub ip_addresses: Vec<String>,
}

impl AgentIdentity {
    /// Build the identity from config overrides, filling in anything missing
    /// from the host environment.
    pub fn establish(config: &AgentConfig) -> Self {
        let agent_id = match &config.agent.agent_id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => {
                let id = Uuid::new_v4().to_string();
                tracing::info!(agent_id = %id, "Generated new agent UUID");
                id
            }
        };

        let hostname = match &config.agent.hostname {
            Some(name) if !name.is_empty() => name.clone(),
            _ => detect_hostname(),
        };

        Self {
            agent_id,
            hostname,
            operating_system: std::env::consts::OS.to_string(),
            architecture: std::env::consts::ARCH.to_string(),
            ip_addresses: discover_ip_addresses(),
        }
    }
}

fn detect_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Discover the host's outbound IPv4 address via a route probe. Connecting a
/// UDP socket selects a source address without sending any packets.
fn discover_ip_addresses() -> Vec<String> {
    let mut addresses = Vec::new();

    if let Ok(socket) = UdpSocket::bind("0.0.0.0:0") {
        if socket.connect("198.51.100.1:53").is_ok() {
            if let Ok(local) = socket.local_addr() {
                if !local.ip().is_loopback() {
                    addresses.push(local.ip().to_string());
                }
            }
        }
    }

    if addresses.is_empty() {
        addresses.push("127.0.0.1".to_string());
    }

    addresses
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;

    fn config_with_agent(agent_id: Option<&str>, hostname: Option<&str>) -> AgentConfig {
        let mut config = AgentConfig::default();
        config.controller.url = "https://controller.example.com".to_string();
        config.controller.auth_token = "secret".to_string();
        config.agent.agent_id = agent_id.map(String::from);
        config.agent.hostname = hostname.map(String::from);
        config
    }

    #[test]
    fn config_overrides_win() {
        let config = config_with_agent(Some("agent-42"), Some("host-42"));
        let identity = AgentIdentity::establish(&config);
        assert_eq!(identity.agent_id, "agent-42");
        assert_eq!(identity.hostname, "host-42");
    }

    #[test]
    fn missing_agent_id_generates_uuid() {
        let config = config_with_agent(None, Some("host-42"));
        let identity = AgentIdentity::establish(&config);
        assert!(Uuid::parse_str(&identity.agent_id).is_ok());
    }

    #[test]
    fn empty_agent_id_generates_uuid() {
        let config = config_with_agent(Some(""), None);
        let identity = AgentIdentity::establish(&config);
        assert!(Uuid::parse_str(&identity.agent_id).is_ok());
    }

    #[test]
    fn ip_addresses_never_empty() {
        let config = config_with_agent(None, None);
        let identity = AgentIdentity::establish(&config);
        assert!(!identity.ip_addresses.is_empty());
    }

    #[test]
    fn os_and_arch_populated() {
        let config = config_with_agent(None, None);
        let identity = AgentIdentity::establish(&config);
        assert!(!identity.operating_system.is_empty());
        assert!(!identity.architecture.is_empty());
    }
}
