use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error code reported to the workflow engine when a job ends in a failure state.
pub const JOB_FAILED_ERROR_CODE: &str = "GlueJobFailedError";
/// Error code reported when an activity task carries input that can never be served.
pub const INVALID_TASK_INPUT_ERROR_CODE: &str = "InvalidTaskInput";
/// Error reported when the execution engine refuses to start a job.
pub const START_FAILURE_ERROR: &str =
    "Failed to start Glue job. Check Glue Runner logs for more details.";
/// Run ids in human-facing messages are cut to this many characters.
pub const SHORT_RUN_ID_LEN: usize = 8;

/// Arguments forwarded verbatim to the execution engine.
pub type JobArguments = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobRunState {
    Starting,
    Running,
    Stopping,
    Succeeded,
    Failed,
    Stopped,
    Timeout,
}

impl JobRunState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "STARTING",
            Self::Running => "RUNNING",
            Self::Stopping => "STOPPING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Stopped => "STOPPED",
            Self::Timeout => "TIMEOUT",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::Stopped | Self::Timeout
        )
    }
}

impl FromStr for JobRunState {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "STARTING" => Ok(Self::Starting),
            "RUNNING" => Ok(Self::Running),
            "STOPPING" => Ok(Self::Stopping),
            "SUCCEEDED" => Ok(Self::Succeeded),
            "FAILED" => Ok(Self::Failed),
            "STOPPED" => Ok(Self::Stopped),
            "TIMEOUT" => Ok(Self::Timeout),
            other => Err(ValidationError::new(format!(
                "unrecognized job run state '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for JobRunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a reported job state should be handled by a resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateClass {
    Pending(JobRunState),
    Succeeded,
    Failed(JobRunState),
    Unknown(String),
}

pub fn classify_state(raw: Option<&str>) -> StateClass {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return StateClass::Unknown(String::new());
    };

    match raw.parse::<JobRunState>() {
        Ok(JobRunState::Succeeded) => StateClass::Succeeded,
        Ok(state) if state.is_terminal() => StateClass::Failed(state),
        Ok(state) => StateClass::Pending(state),
        Err(_) => StateClass::Unknown(raw.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationKey {
    pub scope_id: String,
    pub job_run_id: String,
}

impl CorrelationKey {
    pub fn new(scope_id: impl Into<String>, job_run_id: impl Into<String>) -> Self {
        Self {
            scope_id: scope_id.into(),
            job_run_id: job_run_id.into(),
        }
    }
}

/// Links a started job run back to the activity scope (and optionally the
/// workflow resume token) that must be told about its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationRecord {
    pub scope_id: String,
    pub job_run_id: String,
    pub job_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_token: Option<String>,
}

impl CorrelationRecord {
    pub fn key(&self) -> CorrelationKey {
        CorrelationKey::new(self.scope_id.clone(), self.job_run_id.clone())
    }
}

/// A job lifecycle notification, either pushed by the engine or built from a
/// status poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobLifecycleEvent {
    pub job_name: String,
    pub job_run_id: String,
    pub state: Option<String>,
    pub message: Option<String>,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSubmission {
    pub job_name: String,
    pub arguments: JobArguments,
    pub capacity: f64,
}

/// Cause payload attached to a task failure report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureCause {
    pub glue_job_name: String,
    pub glue_job_run_id: String,
    pub glue_job_run_state: String,
    pub glue_job_run_error_msg: String,
}

impl FailureCause {
    pub fn new(
        job_name: &str,
        job_run_id: &str,
        state: JobRunState,
        error_message: Option<&str>,
    ) -> Self {
        Self {
            glue_job_name: job_name.to_string(),
            glue_job_run_id: job_run_id.to_string(),
            glue_job_run_state: state.as_str().to_string(),
            glue_job_run_error_msg: error_message.unwrap_or_default().to_string(),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Glue job {} run with Run Id {} failed. Last state: {}. Error message: {}",
            self.glue_job_name,
            short_run_id(&self.glue_job_run_id),
            self.glue_job_run_state,
            self.glue_job_run_error_msg,
        )
    }
}

/// Success output for an event-driven resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTaskOutput {
    #[serde(rename = "GlueJobName")]
    pub job_name: String,
    #[serde(rename = "GlueJobRunId")]
    pub job_run_id: String,
    #[serde(rename = "GlueJobRunState")]
    pub state: String,
    #[serde(rename = "GlueJobTime")]
    pub time: String,
}

/// Success output for a polled resolution, carrying the run timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolledTaskOutput {
    #[serde(rename = "GlueJobName")]
    pub job_name: String,
    #[serde(rename = "GlueJobRunId")]
    pub job_run_id: String,
    #[serde(rename = "GlueJobRunState")]
    pub state: String,
    #[serde(rename = "GlueJobStartedOn")]
    pub started_on: String,
    #[serde(rename = "GlueJobCompletedOn")]
    pub completed_on: String,
    #[serde(rename = "GlueJobLastModifiedOn")]
    pub last_modified_on: String,
}

/// Status code plus plain body returned by synchronous invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl InvocationResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status_code: 200,
            body: body.into(),
        }
    }

    pub fn bad_request(body: impl Into<String>) -> Self {
        Self {
            status_code: 400,
            body: body.into(),
        }
    }

    pub fn server_error(body: impl Into<String>) -> Self {
        Self {
            status_code: 500,
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Prefix of a run id for log lines. Store keys and API calls always use the
/// full id.
pub fn short_run_id(job_run_id: &str) -> &str {
    match job_run_id.char_indices().nth(SHORT_RUN_ID_LEN) {
        Some((index, _)) => &job_run_id[..index],
        None => job_run_id,
    }
}
