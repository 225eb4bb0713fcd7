use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AgentError, Result};

/// Minimum allowed heartbeat interval. Shorter intervals would hammer the
/// controller across a large fleet.
const MIN_HEARTBEAT_INTERVAL_SECS: u64 = 60;

/// Agent identity overrides. Both fields are optional; missing values are
/// filled in at startup (generated UUID, detected hostname).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentSection {
    pub agent_id: Option<String>,
    pub hostname: Option<String>,
}

/// Controller connection settings. Both fields are required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ControllerSection {
    /// Base URL of the controller, e.g. "https://controller.example.com"
    #[serde(default)]
    pub url: String,
    /// Bearer token sent on every request
    #[serde(default)]
    pub auth_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeartbeatSection {
    /// Seconds between heartbeat cycles (minimum 60)
    #[serde(default = "default_heartbeat_interval")]
    pub interval_in_seconds: u64,
}

impl Default for HeartbeatSection {
    fn default() -> Self {
        Self {
            interval_in_seconds: default_heartbeat_interval(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrySection {
    /// Heartbeat attempts per cycle before giving up (minimum 1)
    #[serde(default = "default_retry_attempts")]
    pub attempts: u32,
    /// Base backoff delay; doubles after every failed attempt
    #[serde(default = "default_retry_delay")]
    pub delay_in_seconds: u64,
    /// Upper bound of the uniform random jitter added to each delay
    #[serde(default = "default_max_jitter")]
    pub max_jitter_in_seconds: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            attempts: default_retry_attempts(),
            delay_in_seconds: default_retry_delay(),
            max_jitter_in_seconds: default_max_jitter(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScannerSection {
    /// Executable the job executor invokes to run vulnerability checks
    #[serde(default = "default_scanner_command")]
    pub command: String,
}

impl Default for ScannerSection {
    fn default() -> Self {
        Self {
            command: default_scanner_command(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_heartbeat_interval() -> u64 {
    600
}

fn default_retry_attempts() -> u32 {
    5
}

fn default_retry_delay() -> u64 {
    60
}

fn default_max_jitter() -> u64 {
    30
}

fn default_scanner_command() -> String {
    "openvas-nasl".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Agent configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub controller: ControllerSection,
    #[serde(default)]
    pub heartbeat: HeartbeatSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub scanner: ScannerSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl AgentConfig {
    /// Default configuration file location.
    pub fn default_path() -> &'static str {
        "/etc/vigil-agent/agent.toml"
    }

    /// Load and validate configuration from a file. A missing or unreadable
    /// file is a configuration error; there is no built-in fallback config.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AgentError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: AgentConfig = toml::from_str(contents)
            .map_err(|e| AgentError::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate required fields and bounds. All failures here are fatal at
    /// startup and never retried.
    pub fn validate(&self) -> Result<()> {
        if self.controller.url.is_empty() {
            return Err(AgentError::Config(
                "missing required field: controller.url".to_string(),
            ));
        }
        if self.controller.auth_token.is_empty() {
            return Err(AgentError::Config(
                "missing required field: controller.auth_token".to_string(),
            ));
        }
        if self.heartbeat.interval_in_seconds < MIN_HEARTBEAT_INTERVAL_SECS {
            return Err(AgentError::Config(format!(
                "heartbeat.interval_in_seconds is {} (must be >= {})",
                self.heartbeat.interval_in_seconds, MIN_HEARTBEAT_INTERVAL_SECS
            )));
        }
        if self.retry.attempts < 1 {
            return Err(AgentError::Config(
                "retry.attempts must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat.interval_in_seconds)
    }
}
