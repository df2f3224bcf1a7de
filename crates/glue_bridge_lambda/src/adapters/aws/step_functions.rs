use std::time::Duration;

use aws_smithy_types::timeout::TimeoutConfig;

use super::{block_on, service_error};
use crate::adapters::workflow::{ActivityTask, WorkflowEngine, WorkflowLauncher};
use crate::error::ServiceError;

/// Builds a Step Functions client whose read timeout outlasts the
/// `GetActivityTask` long poll (60 seconds).
pub fn long_poll_client(
    sdk_config: &aws_config::SdkConfig,
    connect_timeout: Duration,
    read_timeout: Duration,
) -> aws_sdk_sfn::Client {
    let config = aws_sdk_sfn::config::Builder::from(sdk_config)
        .timeout_config(
            TimeoutConfig::builder()
                .connect_timeout(connect_timeout)
                .read_timeout(read_timeout)
                .build(),
        )
        .build();
    aws_sdk_sfn::Client::from_conf(config)
}

pub struct StepFunctionsWorkflow {
    client: aws_sdk_sfn::Client,
}

impl StepFunctionsWorkflow {
    pub fn new(client: aws_sdk_sfn::Client) -> Self {
        Self { client }
    }
}

impl WorkflowEngine for StepFunctionsWorkflow {
    fn next_activity_task(
        &self,
        activity_arn: &str,
        worker_name: &str,
    ) -> Result<Option<ActivityTask>, ServiceError> {
        let output = block_on(
            self.client
                .get_activity_task()
                .activity_arn(activity_arn)
                .worker_name(worker_name)
                .send(),
        )
        .map_err(|error| service_error("GetActivityTask", error))?;

        Ok(output
            .task_token()
            .filter(|token| !token.is_empty())
            .map(|token| ActivityTask {
                resume_token: token.to_string(),
                input: output.input().unwrap_or_default().to_string(),
            }))
    }

    fn report_success(&self, resume_token: &str, output: &str) -> Result<(), ServiceError> {
        block_on(
            self.client
                .send_task_success()
                .task_token(resume_token)
                .output(output)
                .send(),
        )
        .map(|_| ())
        .map_err(|error| service_error("SendTaskSuccess", error))
    }

    fn report_failure(
        &self,
        resume_token: &str,
        error_code: &str,
        cause: &str,
    ) -> Result<(), ServiceError> {
        block_on(
            self.client
                .send_task_failure()
                .task_token(resume_token)
                .error(error_code)
                .cause(cause)
                .send(),
        )
        .map(|_| ())
        .map_err(|error| service_error("SendTaskFailure", error))
    }

    fn report_heartbeat(&self, resume_token: &str) -> Result<(), ServiceError> {
        block_on(
            self.client
                .send_task_heartbeat()
                .task_token(resume_token)
                .send(),
        )
        .map(|_| ())
        .map_err(|error| service_error("SendTaskHeartbeat", error))
    }
}

pub struct StepFunctionsLauncher {
    client: aws_sdk_sfn::Client,
    state_machine_arn: String,
}

impl StepFunctionsLauncher {
    pub fn new(client: aws_sdk_sfn::Client, state_machine_arn: impl Into<String>) -> Self {
        Self {
            client,
            state_machine_arn: state_machine_arn.into(),
        }
    }
}

impl WorkflowLauncher for StepFunctionsLauncher {
    fn start_execution(&self, name: &str, input: &str) -> Result<String, ServiceError> {
        let output = block_on(
            self.client
                .start_execution()
                .state_machine_arn(&self.state_machine_arn)
                .name(name)
                .input(input)
                .send(),
        )
        .map_err(|error| service_error("StartExecution", error))?;

        Ok(output.execution_arn().to_string())
    }
}
