pub mod agent;
pub mod config;
pub mod error;
pub mod heartbeat;
pub mod identity;
pub mod jobs;
pub mod retry;
pub mod shutdown;
pub mod transport;

/// Version reported to the controller in every heartbeat.
pub const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");
