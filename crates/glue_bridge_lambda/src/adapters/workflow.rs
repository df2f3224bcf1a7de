use crate::error::ServiceError;

/// An activity task handed out by the workflow engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityTask {
    pub resume_token: String,
    pub input: String,
}

pub trait WorkflowEngine {
    /// Long-polls for the next task of the activity. `None` means no work is waiting.
    fn next_activity_task(
        &self,
        activity_arn: &str,
        worker_name: &str,
    ) -> Result<Option<ActivityTask>, ServiceError>;

    fn report_success(&self, resume_token: &str, output: &str) -> Result<(), ServiceError>;

    fn report_failure(
        &self,
        resume_token: &str,
        error_code: &str,
        cause: &str,
    ) -> Result<(), ServiceError>;

    fn report_heartbeat(&self, resume_token: &str) -> Result<(), ServiceError>;
}

pub trait WorkflowLauncher {
    /// Starts a state machine execution and returns its execution ARN.
    fn start_execution(&self, name: &str, input: &str) -> Result<String, ServiceError>;
}
