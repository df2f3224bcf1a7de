use crate::runtime::contract::ValidationError;

/// Failure reported by one of the managed-service adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conditional check failed: {0}")]
    ConditionFailed(String),
    #[error("{0}")]
    Service(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    #[error("{0} must be configured")]
    Configuration(String),

    #[error("invalid value for {name}: {message}")]
    InvalidConfiguration { name: String, message: String },

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("failed to start job {job_name}: {source}")]
    Submission {
        job_name: String,
        source: ServiceError,
    },

    #[error(
        "job {job_name} run {job_run_id} started but its correlation record was not stored: {source}"
    )]
    OrphanedJob {
        job_name: String,
        job_run_id: String,
        source: ServiceError,
    },

    #[error("correlation lookup failed for run {job_run_id}: {source}")]
    CorrelationLookup {
        job_run_id: String,
        source: ServiceError,
    },

    #[error("failed to query correlation records of scope {scope_id}: {source}")]
    ScopeQuery {
        scope_id: String,
        source: ServiceError,
    },

    #[error("failed to delete correlation record for run {job_run_id}: {source}")]
    CorrelationDelete {
        job_run_id: String,
        source: ServiceError,
    },

    #[error("workflow engine rejected {operation}: {source}")]
    Reporting {
        operation: &'static str,
        source: ServiceError,
    },

    #[error("failed to read status of job {job_name} run {job_run_id}: {source}")]
    JobStatus {
        job_name: String,
        job_run_id: String,
        source: ServiceError,
    },

    #[error("failed to fetch activity task: {0}")]
    TaskFetch(ServiceError),
}
