use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::heartbeat::{HeartbeatClient, HeartbeatOutcome};
use crate::identity::AgentIdentity;
use crate::jobs::executor::JobExecutor;
use crate::jobs::JobPipeline;
use crate::retry::RetryPolicy;
use crate::transport::Transport;

/// Lifecycle state of the agent process.
///
/// `Shutdown` is the clean-exit terminal. Authentication failures degrade to
/// `Unauthorized`, never to `Error`; an operator is expected to grant
/// authorization later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Initializing,
    Registering,
    Active,
    Unauthorized,
    Error,
    Shutdown,
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentState::Initializing => write!(f, "initializing"),
            AgentState::Registering => write!(f, "registering"),
            AgentState::Active => write!(f, "active"),
            AgentState::Unauthorized => write!(f, "unauthorized"),
            AgentState::Error => write!(f, "error"),
            AgentState::Shutdown => write!(f, "shutdown"),
        }
    }
}

impl AgentState {
    /// State after a heartbeat cycle completed with the given authorization.
    /// Authorization is re-evaluated every cycle; promotion and demotion are
    /// both always possible, regardless of the prior state.
    pub fn on_heartbeat(self, authorized: bool) -> AgentState {
        if authorized {
            AgentState::Active
        } else {
            AgentState::Unauthorized
        }
    }

    /// Job polling is gated strictly on the active state.
    pub fn allows_job_polling(self) -> bool {
        self == AgentState::Active
    }
}

/// The agent control loop: heartbeat with retry, state evaluation, job
/// pipeline, sleep. Strictly sequential, one cycle at a time.
pub struct Agent {
    identity: AgentIdentity,
    state: AgentState,
    last_heartbeat: Option<DateTime<Utc>>,
    /// Cycles in a row whose heartbeat exhausted all retries; logging only
    consecutive_failures: u32,
    heartbeat: HeartbeatClient,
    retry: RetryPolicy,
    pipeline: JobPipeline,
    interval: Duration,
}

impl Agent {
    /// Wire up the agent. Identity and configuration are established by the
    /// time this returns, so the agent comes out in the registering state.
    pub fn new(
        config: &AgentConfig,
        identity: AgentIdentity,
        transport: Arc<dyn Transport>,
        executor: Arc<dyn JobExecutor>,
    ) -> Self {
        let heartbeat = HeartbeatClient::new(transport.clone(), identity.clone());
        let pipeline = JobPipeline::new(transport, executor, identity.agent_id.clone());

        Self {
            identity,
            state: AgentState::Registering,
            last_heartbeat: None,
            consecutive_failures: 0,
            heartbeat,
            retry: RetryPolicy::from_config(&config.retry),
            pipeline,
            interval: config.heartbeat_interval(),
        }
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn identity(&self) -> &AgentIdentity {
        &self.identity
    }

    pub fn last_heartbeat(&self) -> Option<DateTime<Utc>> {
        self.last_heartbeat
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Run the loop until a shutdown request is observed. The loop never
    /// exits on its own; steady-state errors are absorbed per cycle.
    pub async fn run(mut self, shutdown: CancellationToken) {
        tracing::info!(
            agent_id = %self.identity.agent_id,
            hostname = %self.identity.hostname,
            state = %self.state,
            "Starting agent main loop"
        );

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            self.cycle(&shutdown).await;

            tracing::debug!(
                seconds = self.interval.as_secs(),
                "Sleeping until next heartbeat"
            );
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        self.transition(AgentState::Shutdown);
        tracing::info!("Agent shutdown complete");
    }

    /// One loop iteration minus the sleep: retry-wrapped heartbeat, state
    /// transition, and (only when active) the job pipeline.
    pub async fn cycle(&mut self, shutdown: &CancellationToken) {
        match self.retry.run(&self.heartbeat).await {
            Ok(outcome) => {
                self.consecutive_failures = 0;
                self.last_heartbeat = Some(Utc::now());
                self.apply_outcome(&outcome);
            }
            Err(AgentError::Auth { status }) => {
                tracing::error!(
                    status,
                    "Heartbeat authentication rejected; waiting for operator authorization"
                );
                self.transition(AgentState::Unauthorized);
                return;
            }
            Err(err) => {
                self.consecutive_failures += 1;
                tracing::error!(
                    error = %err,
                    consecutive_failures = self.consecutive_failures,
                    "Heartbeat cycle failed; will retry at next interval"
                );
                // State is left unchanged and job polling is skipped
                return;
            }
        }

        if !self.state.allows_job_polling() {
            return;
        }

        match self.pipeline.run_cycle(shutdown).await {
            Ok(summary) => {
                if summary.polled > 0 {
                    tracing::info!(
                        polled = summary.polled,
                        executed = summary.executed,
                        submitted = summary.submitted,
                        failed = summary.failed,
                        "Job cycle finished"
                    );
                }
            }
            Err(AgentError::Auth { status }) => {
                tracing::error!(status, "Job pipeline authentication rejected");
                self.transition(AgentState::Unauthorized);
            }
            Err(err) => {
                tracing::error!(error = %err, "Job cycle failed; continuing");
            }
        }
    }

    fn apply_outcome(&mut self, outcome: &HeartbeatOutcome) {
        if !outcome.accepted {
            tracing::warn!("Controller did not accept the heartbeat");
        }
        if self.state == AgentState::Registering && !outcome.authorized {
            tracing::info!("Agent registered but not yet authorized; waiting for operator");
        }

        self.transition(self.state.on_heartbeat(outcome.authorized));

        if let Some(advised) = outcome.next_heartbeat_in_seconds {
            if advised != self.interval.as_secs() {
                // Advisory only; the configured interval stays authoritative
                tracing::debug!(
                    advised,
                    configured = self.interval.as_secs(),
                    "Controller advised a different heartbeat interval"
                );
            }
        }
        if outcome.config_updated {
            tracing::info!("Controller reports updated agent configuration");
        }
    }

    fn transition(&mut self, next: AgentState) {
        if next != self.state {
            tracing::info!(from = %self.state, to = %next, "Agent state changed");
            self.state = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heartbeat_outcome_drives_state() {
        assert_eq!(
            AgentState::Registering.on_heartbeat(true),
            AgentState::Active
        );
        assert_eq!(
            AgentState::Registering.on_heartbeat(false),
            AgentState::Unauthorized
        );
        assert_eq!(
            AgentState::Unauthorized.on_heartbeat(true),
            AgentState::Active
        );
        assert_eq!(
            AgentState::Active.on_heartbeat(false),
            AgentState::Unauthorized
        );
        assert_eq!(AgentState::Active.on_heartbeat(true), AgentState::Active);
    }

    #[test]
    fn only_active_polls_jobs() {
        assert!(AgentState::Active.allows_job_polling());
        assert!(!AgentState::Initializing.allows_job_polling());
        assert!(!AgentState::Registering.allows_job_polling());
        assert!(!AgentState::Unauthorized.allows_job_polling());
        assert!(!AgentState::Error.allows_job_polling());
        assert!(!AgentState::Shutdown.allows_job_polling());
    }
}
