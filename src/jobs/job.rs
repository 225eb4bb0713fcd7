use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Terminal status of one executed job, as reported to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Completed,
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A work item assigned by the controller. Immutable once received; lives for
/// one poll-execute-submit cycle and is dropped afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub scan_id: String,
    pub job_type: String,
    pub priority: String,
    pub created_at: DateTime<Utc>,
    /// Opaque job-specific payload, interpreted only by the executor
    #[serde(default)]
    pub config: serde_json::Value,
}

/// Body of `GET /api/v1/agents/jobs`. An empty list is a valid response.
#[derive(Debug, Clone, Deserialize)]
pub struct JobListResponse {
    #[serde(default)]
    pub jobs: Vec<Job>,
}

/// Vulnerability test metadata attached to a finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nvt {
    pub oid: String,
    pub name: String,
    pub severity: f64,
    pub cvss_base_vector: String,
}

/// One detection record produced by executing a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub nvt: Nvt,
    pub host: String,
    pub port: String,
    pub threat: String,
    pub description: String,
    /// Quality of detection, 0-100
    pub qod: u8,
}

/// Body of `POST /api/v1/agents/jobs/{job_id}/results`.
#[derive(Debug, Clone, Serialize)]
pub struct JobResult {
    pub job_id: String,
    pub scan_id: String,
    pub agent_id: String,
    pub status: JobStatus,
    #[serde(with = "iso8601")]
    pub started_at: DateTime<Utc>,
    #[serde(with = "iso8601")]
    pub completed_at: DateTime<Utc>,
    pub results: Vec<Finding>,
}

/// Second-precision ISO-8601 UTC (`YYYY-MM-DDTHH:MM:SSZ`), the exact form
/// the controller expects.
pub mod iso8601 {
    use chrono::{DateTime, Utc};
    use serde::Serializer;

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }
}
