use chrono::{DateTime, Utc};

use crate::error::ServiceError;
use crate::runtime::contract::{JobArguments, PipelineSubmission};

#[derive(Debug, Clone, PartialEq)]
pub struct JobRunDetail {
    pub job_name: String,
    pub job_run_id: String,
    pub state: Option<String>,
    pub arguments: JobArguments,
    pub error_message: Option<String>,
    pub started_on: Option<DateTime<Utc>>,
    pub completed_on: Option<DateTime<Utc>>,
    pub last_modified_on: Option<DateTime<Utc>>,
}

pub trait JobEngine {
    /// Starts a run and returns its run id.
    fn start_job_run(&self, submission: &PipelineSubmission) -> Result<String, ServiceError>;

    fn get_job_run(&self, job_name: &str, job_run_id: &str) -> Result<JobRunDetail, ServiceError>;
}
