use serde_json::Value;

use crate::adapters::object_store::SnapshotStore;
use crate::adapters::run_ledger::RunLedger;
use crate::adapters::workflow::WorkflowLauncher;
use crate::error::ServiceError;
use crate::runtime::contract::InvocationResponse;
use crate::runtime::events::{decode_event, BridgeEvent};
use crate::runtime::object_location::ObjectLocation;
use crate::runtime::pipeline::{execution_name, FirstStageJobs, PipelineRunRequest};

pub const ACCESS_DENIED_BODY: &str = "There was access denied on the file";
pub const MISSING_SNAPSHOT_BODY: &str = "The file doesnt exist in the location";
pub const SNAPSHOT_ERROR_BODY: &str = "There was an error retrieving the file";

/// Adapters the step runner talks to, built once per process.
pub struct StepRunnerPorts<'a> {
    pub snapshots: &'a dyn SnapshotStore,
    pub ledger: &'a dyn RunLedger,
    pub launcher: &'a dyn WorkflowLauncher,
}

/// Starts the pipeline workflow for one queued submission. Every failure is
/// turned into a status response; nothing is retried here.
pub fn handle_pipeline_submission(
    event: &Value,
    jobs: &FirstStageJobs,
    ports: &StepRunnerPorts<'_>,
    execution_suffix: u16,
) -> InvocationResponse {
    let request = match decode_event(event) {
        Ok(BridgeEvent::PipelineSubmission(request)) => request,
        Ok(_) => {
            tracing::error!("Step runner invoked without a queued pipeline submission");
            return InvocationResponse::bad_request("Expected an SQS pipeline submission event");
        }
        Err(error) => {
            tracing::error!(error = %error, "Rejected pipeline submission");
            return InvocationResponse::bad_request(error.message());
        }
    };

    tracing::info!(
        run_id = %request.run_id,
        survey = %request.survey,
        "Retrieved pipeline submission for run {}",
        request.run_id
    );

    if let Err(response) = check_snapshot(&request, ports.snapshots) {
        return response;
    }

    let job_name = jobs.select(&request.pipeline);

    if let Err(source) = ports.ledger.record_run(&request.run_record()) {
        tracing::error!(run_id = %request.run_id, error = %source, "Failed to record pipeline run");
        return InvocationResponse::server_error(format!("Failed to record pipeline run: {source}"));
    }

    let input = match request.workflow_input(job_name) {
        Ok(input) => input,
        Err(error) => {
            tracing::error!(
                run_id = %request.run_id,
                error = %error,
                "Failed to build workflow input"
            );
            return InvocationResponse::server_error(error.message());
        }
    };

    let name = execution_name(&request.run_id, execution_suffix);
    match ports.launcher.start_execution(&name, &input) {
        Ok(execution_arn) => {
            tracing::info!(
                run_id = %request.run_id,
                job_name,
                execution_arn = %execution_arn,
                "Started execution {}",
                name
            );
            InvocationResponse::ok(execution_arn)
        }
        Err(source) => {
            tracing::error!(run_id = %request.run_id, error = %source, "Failed to start execution");
            InvocationResponse::server_error(format!("Failed to start execution: {source}"))
        }
    }
}

fn check_snapshot(
    request: &PipelineRunRequest,
    snapshots: &dyn SnapshotStore,
) -> Result<(), InvocationResponse> {
    let location = ObjectLocation::parse(&request.snapshot_location).map_err(|error| {
        tracing::error!(run_id = %request.run_id, error = %error, "Invalid snapshot location");
        InvocationResponse::bad_request(error.message())
    })?;

    snapshots.check_object(&location).map_err(|error| {
        tracing::error!(
            run_id = %request.run_id,
            snapshot = %location,
            error = %error,
            "Snapshot check failed"
        );
        match error {
            ServiceError::AccessDenied(_) => InvocationResponse::bad_request(ACCESS_DENIED_BODY),
            ServiceError::NotFound(_) => InvocationResponse::bad_request(MISSING_SNAPSHOT_BODY),
            ServiceError::ConditionFailed(_) | ServiceError::Service(_) => {
                InvocationResponse::bad_request(SNAPSHOT_ERROR_BODY)
            }
        }
    })
}
