//! Scripted stub collaborators shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use vigil_agent::config::AgentConfig;
use vigil_agent::error::{AgentError, Result};
use vigil_agent::identity::AgentIdentity;
use vigil_agent::jobs::{Finding, Job, JobExecutor, Nvt};
use vigil_agent::transport::{Transport, TransportResponse};

/// One recorded exchange.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: &'static str,
    pub path: String,
    pub body: Option<serde_json::Value>,
}

/// Transport that pops one scripted reply per exchange and records every
/// call in order. Running out of scripted replies is a test bug and fails
/// loudly with a network error.
#[derive(Default)]
pub struct StubTransport {
    replies: Mutex<VecDeque<Result<TransportResponse>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, status: u16, body: &str) {
        self.replies.lock().unwrap().push_back(Ok(TransportResponse {
            status,
            body: body.to_string(),
        }));
    }

    pub fn push_err(&self, err: AgentError) {
        self.replies.lock().unwrap().push_back(Err(err));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn next_reply(&self) -> Result<TransportResponse> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AgentError::Network("no scripted reply left".to_string())))
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn get(&self, path: &str) -> Result<TransportResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: "GET",
            path: path.to_string(),
            body: None,
        });
        self.next_reply()
    }

    async fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<TransportResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: "POST",
            path: path.to_string(),
            body: Some(body.clone()),
        });
        self.next_reply()
    }
}

/// Executor that records execution order and fails the configured job ids.
#[derive(Default)]
pub struct StubExecutor {
    fail_jobs: HashSet<String>,
    executed: Mutex<Vec<String>>,
}

impl StubExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing<I: IntoIterator<Item = S>, S: Into<String>>(job_ids: I) -> Self {
        Self {
            fail_jobs: job_ids.into_iter().map(Into::into).collect(),
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobExecutor for StubExecutor {
    async fn execute(&self, job: &Job) -> Result<Vec<Finding>> {
        self.executed.lock().unwrap().push(job.job_id.clone());
        if self.fail_jobs.contains(&job.job_id) {
            return Err(AgentError::Execution(format!(
                "stubbed failure for {}",
                job.job_id
            )));
        }
        Ok(vec![sample_finding()])
    }
}

pub fn sample_finding() -> Finding {
    Finding {
        nvt: Nvt {
            oid: "1.3.6.1.4.1.25623.1.0.12345".to_string(),
            name: "OpenSSH Version Detection".to_string(),
            severity: 5.0,
            cvss_base_vector: "AV:N/AC:L/Au:N/C:N/I:N/A:N".to_string(),
        },
        host: "localhost".to_string(),
        port: "22/tcp".to_string(),
        threat: "Medium".to_string(),
        description: "SSH service detected".to_string(),
        qod: 80,
    }
}

pub fn test_identity() -> AgentIdentity {
    AgentIdentity {
        agent_id: "agent-1".to_string(),
        hostname: "scan-host-01".to_string(),
        operating_system: "linux".to_string(),
        architecture: "x86_64".to_string(),
        ip_addresses: vec!["192.0.2.10".to_string()],
    }
}

/// Config with instant retries so tests never sleep.
pub fn test_config(retry_attempts: u32) -> AgentConfig {
    let mut config = AgentConfig::default();
    config.controller.url = "https://controller.example.com".to_string();
    config.controller.auth_token = "secret".to_string();
    config.retry.attempts = retry_attempts;
    config.retry.delay_in_seconds = 0;
    config.retry.max_jitter_in_seconds = 0;
    config
}

/// Well-formed heartbeat response body.
pub fn heartbeat_body(authorized: bool) -> String {
    format!(
        r#"{{"status": "accepted", "config_updated": false, "next_heartbeat_in_seconds": 600, "authorized": {}}}"#,
        authorized
    )
}

/// Job list body with the given job ids.
pub fn jobs_body(job_ids: &[&str]) -> String {
    let jobs: Vec<String> = job_ids
        .iter()
        .map(|id| {
            format!(
                r#"{{
                    "job_id": "{id}",
                    "scan_id": "scan-1",
                    "job_type": "vulnerability_scan",
                    "priority": "normal",
                    "created_at": "2025-01-15T10:30:45Z",
                    "config": {{"target": "localhost"}}
                }}"#
            )
        })
        .collect();
    format!(r#"{{"jobs": [{}]}}"#, jobs.join(","))
}
