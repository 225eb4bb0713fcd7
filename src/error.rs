use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network unreachable: {0}")]
    Network(String),

    #[error("Authentication rejected (HTTP {status})")]
    Auth { status: u16 },

    #[error("Controller error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    #[error("Malformed controller response: {0}")]
    Protocol(String),

    #[error("Job execution failed: {0}")]
    Execution(String),
}

impl AgentError {
    /// Whether the heartbeat retry policy may attempt again after this error.
    /// Authentication rejections are not transient. Unparseable responses
    /// retry like server errors.
    pub fn is_retryable(&self) -> bool {
        match self {
            AgentError::Network(_) => true,
            AgentError::Server { .. } => true,
            AgentError::Protocol(_) => true,
            AgentError::Auth { .. } => false,
            AgentError::Config(_) => false,
            AgentError::Execution(_) => false,
        }
    }
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        AgentError::Network(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;
