use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use crate::error::{AgentError, Result};
use crate::jobs::job::{Finding, Job, Nvt};

/// Executes one job and produces its findings.
///
/// Check execution internals (NASL interpreters, port probes) live behind
/// this seam; the pipeline only sees findings or an execution error.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    async fn execute(&self, job: &Job) -> Result<Vec<Finding>>;
}

/// Production executor that delegates to an external scanner command.
///
/// The scanner receives the job type and the opaque job config as arguments
/// and prints a JSON array of findings on stdout. A non-zero exit or
/// unparseable output is an execution failure for that job only.
pub struct ScannerExecutor {
    command: String,
}

impl ScannerExecutor {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl JobExecutor for ScannerExecutor {
    async fn execute(&self, job: &Job) -> Result<Vec<Finding>> {
        let config_json = serde_json::to_string(&job.config)
            .map_err(|e| AgentError::Execution(format!("failed to encode job config: {}", e)))?;

        tracing::info!(
            job_id = %job.job_id,
            job_type = %job.job_type,
            command = %self.command,
            "Running scanner"
        );

        let output = Command::new(&self.command)
            .arg("--job-type")
            .arg(&job.job_type)
            .arg("--config")
            .arg(&config_json)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                AgentError::Execution(format!("failed to spawn {}: {}", self.command, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AgentError::Execution(format!(
                "{} exited with {:?}: {}",
                self.command,
                output.status.code(),
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let trimmed = stdout.trim();
        if trimmed.is_empty() {
            // Scan found nothing; that is a clean result
            return Ok(Vec::new());
        }

        let raw: Vec<ScannerFinding> = serde_json::from_str(trimmed).map_err(|e| {
            AgentError::Execution(format!("invalid scanner output for {}: {}", job.job_id, e))
        })?;

        Ok(raw.into_iter().map(ScannerFinding::into_finding).collect())
    }
}

/// Severity bucket the controller displays. Thresholds follow the scanner
/// convention: 7.0+ High, 4.0+ Medium, below Low.
pub fn threat_for_severity(severity: f64) -> &'static str {
    if severity >= 7.0 {
        "High"
    } else if severity >= 4.0 {
        "Medium"
    } else {
        "Low"
    }
}

fn default_qod() -> u8 {
    70
}

fn default_cvss_base_vector() -> String {
    "AV:N/AC:L/Au:N/C:N/I:N/A:N".to_string()
}

/// One finding as the scanner prints it. The threat bucket is derived here,
/// not trusted from the scanner.
#[derive(Debug, Deserialize)]
struct ScannerFinding {
    oid: String,
    name: String,
    severity: f64,
    #[serde(default = "default_cvss_base_vector")]
    cvss_base_vector: String,
    host: String,
    port: String,
    description: String,
    #[serde(default = "default_qod")]
    qod: u8,
}

impl ScannerFinding {
    fn into_finding(self) -> Finding {
        let threat = threat_for_severity(self.severity).to_string();
        Finding {
            nvt: Nvt {
                oid: self.oid,
                name: self.name,
                severity: self.severity,
                cvss_base_vector: self.cvss_base_vector,
            },
            host: self.host,
            port: self.port,
            threat,
            description: self.description,
            qod: self.qod,
        }
    }
}
