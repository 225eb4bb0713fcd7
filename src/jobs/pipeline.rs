use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::error::{AgentError, Result};
use crate::jobs::executor::JobExecutor;
use crate::jobs::job::{Job, JobListResponse, JobResult, JobStatus};
use crate::transport::Transport;

pub const JOBS_ENDPOINT: &str = "/api/v1/agents/jobs";

fn results_endpoint(job_id: &str) -> String {
    format!("/api/v1/agents/jobs/{}/results", job_id)
}

/// Counters for one poll-execute-submit cycle, for logging only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub polled: usize,
    pub executed: usize,
    pub submitted: usize,
    pub failed: usize,
}

/// Polls the controller for assigned jobs, executes each through the
/// execution collaborator, and submits results.
///
/// Jobs are processed strictly in the order received. A job that fails to
/// execute or whose result fails to submit is dropped; the controller
/// reissues it on a future poll. The agent holds no memory of jobs it has
/// seen.
pub struct JobPipeline {
    transport: Arc<dyn Transport>,
    executor: Arc<dyn JobExecutor>,
    agent_id: String,
}

impl JobPipeline {
    pub fn new(
        transport: Arc<dyn Transport>,
        executor: Arc<dyn JobExecutor>,
        agent_id: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            executor,
            agent_id: agent_id.into(),
        }
    }

    /// Fetch the jobs currently assigned to this agent. An empty list is a
    /// normal result, not an error.
    pub async fn poll(&self) -> Result<Vec<Job>> {
        tracing::debug!(endpoint = JOBS_ENDPOINT, "Polling for jobs");
        let response = self.transport.get(JOBS_ENDPOINT).await?;

        if response.status == 401 {
            return Err(AgentError::Auth {
                status: response.status,
            });
        }
        if !response.is_success() {
            return Err(AgentError::Server {
                status: response.status,
                message: response.body,
            });
        }

        let parsed: JobListResponse = serde_json::from_str(&response.body)
            .map_err(|e| AgentError::Protocol(format!("invalid job list: {}", e)))?;
        Ok(parsed.jobs)
    }

    /// One full cycle: poll, then execute and submit each job in order.
    ///
    /// Execution failures and non-auth submission failures are absorbed at
    /// job granularity; processing always continues with the next job. An
    /// authentication rejection on poll or submit propagates to the caller.
    /// The cancellation token is checked before each job so no new work
    /// starts after a shutdown request.
    pub async fn run_cycle(&self, shutdown: &CancellationToken) -> Result<CycleSummary> {
        let jobs = self.poll().await?;
        let mut summary = CycleSummary {
            polled: jobs.len(),
            ..Default::default()
        };

        if jobs.is_empty() {
            tracing::debug!("No jobs assigned");
            return Ok(summary);
        }

        tracing::info!(count = jobs.len(), "Received jobs");

        for job in jobs {
            if shutdown.is_cancelled() {
                tracing::warn!(
                    job_id = %job.job_id,
                    "Shutdown requested, skipping remaining jobs"
                );
                break;
            }

            let started_at = Utc::now();
            tracing::info!(job_id = %job.job_id, job_type = %job.job_type, "Executing job");

            let findings = match self.executor.execute(&job).await {
                Ok(findings) => findings,
                Err(err) => {
                    // Dropped without a submission; the controller reissues it
                    tracing::error!(job_id = %job.job_id, error = %err, "Job execution failed");
                    summary.failed += 1;
                    continue;
                }
            };
            summary.executed += 1;

            let result = JobResult {
                job_id: job.job_id.clone(),
                scan_id: job.scan_id.clone(),
                agent_id: self.agent_id.clone(),
                status: JobStatus::Completed,
                started_at,
                completed_at: Utc::now(),
                results: findings,
            };

            match self.submit(&result).await {
                Ok(()) => {
                    summary.submitted += 1;
                    tracing::info!(job_id = %result.job_id, "Results submitted");
                }
                Err(err @ AgentError::Auth { .. }) => return Err(err),
                Err(err) => {
                    tracing::error!(
                        job_id = %result.job_id,
                        error = %err,
                        "Result submission failed"
                    );
                }
            }
        }

        Ok(summary)
    }

    /// Submit one job result. Success is any 2xx status (the controller
    /// answers 202).
    async fn submit(&self, result: &JobResult) -> Result<()> {
        let body = serde_json::to_value(result)
            .map_err(|e| AgentError::Protocol(format!("failed to encode job result: {}", e)))?;
        let response = self
            .transport
            .post_json(&results_endpoint(&result.job_id), &body)
            .await?;

        if response.status == 401 {
            return Err(AgentError::Auth {
                status: response.status,
            });
        }
        if !response.is_success() {
            return Err(AgentError::Server {
                status: response.status,
                message: response.body,
            });
        }
        Ok(())
    }
}
