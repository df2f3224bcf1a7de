//! Poll-driven bridge: one invocation first drains waiting activity tasks into
//! job submissions, then reconciles the scope's outstanding correlation
//! records against the current job status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::adapters::correlation_store::CorrelationStore;
use crate::adapters::job_engine::{JobEngine, JobRunDetail};
use crate::adapters::workflow::WorkflowEngine;
use crate::error::{BridgeError, ServiceError};
use crate::handlers::chain::{ChainDispatcher, ChainOutcome, ChainPlan};
use crate::handlers::resolver::to_json;
use crate::handlers::submitter::JobSubmitter;
use crate::runtime::contract::{
    classify_state, short_run_id, CorrelationRecord, FailureCause, PolledTaskOutput, StateClass,
    INVALID_TASK_INPUT_ERROR_CODE, JOB_FAILED_ERROR_CODE, START_FAILURE_ERROR,
};
use crate::runtime::task_input::decode_task_input;

/// Formatting of run timestamps in task success output.
pub const TASK_TIME_FORMAT: &str = "%x, %-I:%M %p %Z";

#[derive(Debug, Clone, PartialEq)]
pub struct PollLoopSettings {
    pub activity_arn: String,
    pub worker_name: String,
    pub query_limit: i32,
    pub job_capacity: f64,
    pub chain: Option<ChainPlan>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainSummary {
    pub submitted: Vec<String>,
    pub rejected_inputs: usize,
    pub failed_submissions: usize,
    pub fetch_error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    pub inspected: usize,
    pub heartbeats: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub unknown: usize,
    pub chained: Vec<String>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollCycleReport {
    pub drain: DrainSummary,
    pub reconcile: ReconcileSummary,
}

pub struct PollLoop<'a> {
    settings: &'a PollLoopSettings,
    workflow: &'a dyn WorkflowEngine,
    engine: &'a dyn JobEngine,
    store: &'a dyn CorrelationStore,
}

impl<'a> PollLoop<'a> {
    pub fn new(
        settings: &'a PollLoopSettings,
        workflow: &'a dyn WorkflowEngine,
        engine: &'a dyn JobEngine,
        store: &'a dyn CorrelationStore,
    ) -> Self {
        Self {
            settings,
            workflow,
            engine,
            store,
        }
    }

    pub fn run_cycle(&self) -> PollCycleReport {
        PollCycleReport {
            drain: self.drain_pending(),
            reconcile: self.reconcile_outstanding(),
        }
    }

    /// Submits a job for every waiting activity task until the engine hands
    /// out an empty token.
    pub fn drain_pending(&self) -> DrainSummary {
        let submitter = self.submitter();
        let mut summary = DrainSummary::default();

        loop {
            let task = match self
                .workflow
                .next_activity_task(&self.settings.activity_arn, &self.settings.worker_name)
            {
                Ok(Some(task)) => task,
                Ok(None) => break,
                Err(source) => {
                    let error = BridgeError::TaskFetch(source);
                    tracing::error!(
                        activity_arn = %self.settings.activity_arn,
                        error = %error,
                        "Failed to get activity task"
                    );
                    summary.fetch_error = Some(error.to_string());
                    break;
                }
            };

            let input = match decode_task_input(&task.input) {
                Ok(input) => input,
                Err(error) => {
                    // Unservable input is failed outright so the engine stops offering it.
                    tracing::error!(error = %error, "Unable to load config");
                    summary.rejected_inputs += 1;
                    if let Err(source) = self.workflow.report_failure(
                        &task.resume_token,
                        INVALID_TASK_INPUT_ERROR_CODE,
                        error.message(),
                    ) {
                        tracing::warn!(error = %source, "Failed to reject malformed activity task");
                    }
                    continue;
                }
            };

            tracing::info!(
                run_id = %input.run_id,
                survey = %input.survey,
                "Got task with run id {} survey {}",
                input.run_id,
                input.survey
            );

            let submission = input.into_submission(self.settings.job_capacity);
            match submitter.submit(&submission, Some(&task.resume_token)) {
                Ok(job_run_id) => summary.submitted.push(job_run_id),
                Err(error) => {
                    summary.failed_submissions += 1;
                    if let Err(source) = self.workflow.report_failure(
                        &task.resume_token,
                        START_FAILURE_ERROR,
                        &error.to_string(),
                    ) {
                        tracing::warn!(
                            job_name = %submission.job_name,
                            error = %source,
                            "Failed to report start failure to workflow engine"
                        );
                    }
                }
            }
        }

        summary
    }

    /// Polls the status of up to `query_limit` outstanding runs of the scope
    /// and reports each to the workflow engine.
    pub fn reconcile_outstanding(&self) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();

        let records = match self
            .store
            .query_scope(&self.settings.activity_arn, self.settings.query_limit)
        {
            Ok(records) => records,
            Err(source) => {
                let error = BridgeError::ScopeQuery {
                    scope_id: self.settings.activity_arn.clone(),
                    source,
                };
                tracing::error!(error = %error, "Failed to query outstanding job runs");
                summary.errors.push(error.to_string());
                return summary;
            }
        };

        let submitter = self.submitter();
        let dispatcher = self
            .settings
            .chain
            .as_ref()
            .map(|plan| ChainDispatcher::new(plan, &submitter, self.settings.job_capacity));

        for record in &records {
            summary.inspected += 1;
            self.reconcile_record(record, dispatcher.as_ref(), &mut summary);
        }

        summary
    }

    fn reconcile_record(
        &self,
        record: &CorrelationRecord,
        dispatcher: Option<&ChainDispatcher<'_>>,
        summary: &mut ReconcileSummary,
    ) {
        tracing::debug!(
            job_name = %record.job_name,
            job_run_id = %record.job_run_id,
            "Polling Glue job run status"
        );

        let detail = match self.engine.get_job_run(&record.job_name, &record.job_run_id) {
            Ok(detail) => detail,
            Err(source) => {
                let error = BridgeError::JobStatus {
                    job_name: record.job_name.clone(),
                    job_run_id: record.job_run_id.clone(),
                    source,
                };
                tracing::error!(
                    job_name = %record.job_name,
                    job_run_id = %record.job_run_id,
                    error = %error,
                    "Error checking job {} run id: {}",
                    record.job_name,
                    short_run_id(&record.job_run_id)
                );
                summary.errors.push(error.to_string());
                return;
            }
        };

        let token = record.resume_token.as_deref();
        let class = classify_state(detail.state.as_deref());
        let succeeded = class == StateClass::Succeeded;
        let report = match class {
            StateClass::Pending(state) => {
                tracing::debug!(
                    job_name = %record.job_name,
                    job_run_id = %record.job_run_id,
                    state = %state,
                    "Job with Run Id {} hasn't succeeded yet",
                    short_run_id(&record.job_run_id)
                );
                if let Some(token) = token {
                    summary.heartbeats += 1;
                    if let Err(source) = self.workflow.report_heartbeat(token) {
                        self.note_reporting_error(record, "SendTaskHeartbeat", source, summary);
                    }
                }
                return;
            }
            StateClass::Unknown(state) => {
                tracing::error!(
                    job_name = %record.job_name,
                    job_run_id = %record.job_run_id,
                    "Unknown job state {state:?}"
                );
                summary.unknown += 1;
                return;
            }
            StateClass::Succeeded => {
                tracing::info!(
                    job_name = %record.job_name,
                    job_run_id = %record.job_run_id,
                    "Job with Run Id {} SUCCEEDED",
                    short_run_id(&record.job_run_id)
                );
                summary.succeeded += 1;
                token.map(|token| {
                    (
                        "SendTaskSuccess",
                        self.workflow
                            .report_success(token, &to_json(&polled_output(&detail))),
                    )
                })
            }
            StateClass::Failed(state) => {
                let cause = FailureCause::new(
                    &record.job_name,
                    &record.job_run_id,
                    state,
                    detail.error_message.as_deref(),
                );
                tracing::error!(
                    job_name = %record.job_name,
                    job_run_id = %record.job_run_id,
                    state = %state,
                    "{}",
                    cause.summary()
                );
                summary.failed += 1;
                token.map(|token| {
                    (
                        "SendTaskFailure",
                        self.workflow
                            .report_failure(token, JOB_FAILED_ERROR_CODE, &to_json(&cause)),
                    )
                })
            }
        };

        if let Some((operation, Err(source))) = report {
            self.note_reporting_error(record, operation, source, summary);
        }

        // Only the invocation that removed the record may advance the chain.
        let claimed = match self.store.delete(&record.key()) {
            Ok(removed) => removed.is_some(),
            Err(source) => {
                let error = BridgeError::CorrelationDelete {
                    job_run_id: record.job_run_id.clone(),
                    source,
                };
                tracing::error!(
                    job_name = %record.job_name,
                    job_run_id = %record.job_run_id,
                    error = %error,
                    "Failed to delete glue job"
                );
                summary.errors.push(error.to_string());
                false
            }
        };

        if let (true, true, Some(dispatcher)) = (succeeded, claimed, dispatcher) {
            match dispatcher.on_success_with_arguments(
                &record.job_name,
                &record.job_run_id,
                &detail.arguments,
            ) {
                ChainOutcome::Dispatched { job_run_id, .. } => summary.chained.push(job_run_id),
                ChainOutcome::SubmissionFailed(error) | ChainOutcome::DetailUnavailable(error) => {
                    summary.errors.push(error.to_string())
                }
                ChainOutcome::FinalStage
                | ChainOutcome::NotInChain
                | ChainOutcome::NoForwardableArguments => {}
            }
        }
    }

    fn note_reporting_error(
        &self,
        record: &CorrelationRecord,
        operation: &'static str,
        source: ServiceError,
        summary: &mut ReconcileSummary,
    ) {
        let error = BridgeError::Reporting { operation, source };
        tracing::error!(
            job_name = %record.job_name,
            job_run_id = %record.job_run_id,
            error = %error,
            "Workflow engine did not accept the job status"
        );
        summary.errors.push(error.to_string());
    }

    fn submitter(&self) -> JobSubmitter<'a> {
        JobSubmitter::new(self.engine, self.store, &self.settings.activity_arn)
    }
}

fn polled_output(detail: &JobRunDetail) -> PolledTaskOutput {
    PolledTaskOutput {
        job_name: detail.job_name.clone(),
        job_run_id: detail.job_run_id.clone(),
        state: detail.state.clone().unwrap_or_default(),
        started_on: format_task_time(detail.started_on),
        completed_on: format_task_time(detail.completed_on),
        last_modified_on: format_task_time(detail.last_modified_on),
    }
}

fn format_task_time(timestamp: Option<DateTime<Utc>>) -> String {
    timestamp
        .map(|value| value.format(TASK_TIME_FORMAT).to_string())
        .unwrap_or_default()
}
