//! Job pipeline: poll for assigned jobs, execute each through the
//! [`JobExecutor`] collaborator, submit results to the controller.
//!
//! Jobs are fetched, executed, and reported within one loop iteration; there
//! is no durable local queue and no retry of individual jobs.

pub mod executor;
pub mod job;
pub mod pipeline;

pub use executor::{JobExecutor, ScannerExecutor};
pub use job::{Finding, Job, JobResult, JobStatus, Nvt};
pub use pipeline::{CycleSummary, JobPipeline};
