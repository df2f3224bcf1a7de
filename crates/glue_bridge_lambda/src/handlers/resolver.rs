//! Event-driven resolution of Glue job state changes.
//!
//! A terminal event is matched to its correlation record, the record is
//! deleted, and only then is the outcome reported and the chain advanced.
//! A redelivered event finds no record and reports nothing.

use crate::adapters::correlation_store::CorrelationStore;
use crate::adapters::workflow::WorkflowEngine;
use crate::error::BridgeError;
use crate::handlers::chain::{ChainDispatcher, ChainOutcome, Stage};
use crate::runtime::contract::{
    classify_state, short_run_id, CorrelationKey, CorrelationRecord, EventTaskOutput,
    FailureCause, JobLifecycleEvent, JobRunState, StateClass, JOB_FAILED_ERROR_CODE,
};

#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Succeeded,
    Failed(FailureCause),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportStatus {
    Reported,
    /// The record carries no resume token; nobody is waiting on a report.
    NotRequested,
    Rejected(BridgeError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Pending(JobRunState),
    UnknownState(String),
    NotCorrelated,
    /// Another invocation deleted the record between lookup and delete.
    AlreadyResolved,
    LookupFailed(BridgeError),
    DeleteFailed(BridgeError),
    Resolved {
        outcome: JobOutcome,
        report: ReportStatus,
        chain: Option<ChainOutcome>,
    },
}

impl Resolution {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending(_) => "pending",
            Self::UnknownState(_) => "unknown_state",
            Self::NotCorrelated => "not_correlated",
            Self::AlreadyResolved => "already_resolved",
            Self::LookupFailed(_) => "lookup_failed",
            Self::DeleteFailed(_) => "delete_failed",
            Self::Resolved {
                outcome: JobOutcome::Succeeded,
                ..
            } => "succeeded",
            Self::Resolved {
                outcome: JobOutcome::Failed(_),
                ..
            } => "failed",
        }
    }
}

pub struct EventResolver<'a> {
    scope_id: &'a str,
    store: &'a dyn CorrelationStore,
    workflow: &'a dyn WorkflowEngine,
    chain: Option<&'a ChainDispatcher<'a>>,
}

impl<'a> EventResolver<'a> {
    pub fn new(
        scope_id: &'a str,
        store: &'a dyn CorrelationStore,
        workflow: &'a dyn WorkflowEngine,
        chain: Option<&'a ChainDispatcher<'a>>,
    ) -> Self {
        Self {
            scope_id,
            store,
            workflow,
            chain,
        }
    }

    pub fn resolve(&self, event: &JobLifecycleEvent) -> Resolution {
        let job_run_id = event.job_run_id.as_str();

        let terminal = match classify_state(event.state.as_deref()) {
            StateClass::Pending(state) => {
                tracing::debug!(
                    job_name = %event.job_name,
                    job_run_id,
                    state = %state,
                    "Job with Run Id {} hasn't finished yet",
                    short_run_id(job_run_id)
                );
                return Resolution::Pending(state);
            }
            StateClass::Unknown(state) => {
                tracing::error!(
                    job_name = %event.job_name,
                    job_run_id,
                    state = %state,
                    "Unknown job state {state:?}"
                );
                return Resolution::UnknownState(state);
            }
            StateClass::Succeeded => JobRunState::Succeeded,
            StateClass::Failed(state) => state,
        };

        let key = CorrelationKey::new(self.scope_id, job_run_id);
        let record = match self.store.get(&key) {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::info!(
                    job_name = %event.job_name,
                    job_run_id,
                    "Job {} not present in correlation store",
                    short_run_id(job_run_id)
                );
                return Resolution::NotCorrelated;
            }
            Err(source) => {
                tracing::error!(
                    job_name = %event.job_name,
                    job_run_id,
                    error = %source,
                    "Correlation lookup failed, leaving record for retry"
                );
                return Resolution::LookupFailed(BridgeError::CorrelationLookup {
                    job_run_id: job_run_id.to_string(),
                    source,
                });
            }
        };

        let record = match self.store.delete(&key) {
            Ok(Some(removed)) => removed,
            Ok(None) => {
                tracing::info!(
                    job_name = %record.job_name,
                    job_run_id,
                    "Job {} was resolved by another invocation",
                    short_run_id(job_run_id)
                );
                return Resolution::AlreadyResolved;
            }
            Err(source) => {
                tracing::error!(
                    job_name = %record.job_name,
                    job_run_id,
                    error = %source,
                    "Failed to delete glue job"
                );
                return Resolution::DeleteFailed(BridgeError::CorrelationDelete {
                    job_run_id: job_run_id.to_string(),
                    source,
                });
            }
        };

        let outcome = if terminal == JobRunState::Succeeded {
            tracing::info!(
                job_name = %record.job_name,
                job_run_id,
                "Job with Run Id {} SUCCEEDED",
                short_run_id(job_run_id)
            );
            JobOutcome::Succeeded
        } else {
            let cause = FailureCause::new(
                &record.job_name,
                job_run_id,
                terminal,
                event.message.as_deref(),
            );
            tracing::error!(
                job_name = %record.job_name,
                job_run_id,
                state = %terminal,
                "{}",
                cause.summary()
            );
            JobOutcome::Failed(cause)
        };

        let report = self.report(&record, event, &outcome);
        let chain = self.advance_chain(&record, &outcome);

        Resolution::Resolved {
            outcome,
            report,
            chain,
        }
    }

    fn report(
        &self,
        record: &CorrelationRecord,
        event: &JobLifecycleEvent,
        outcome: &JobOutcome,
    ) -> ReportStatus {
        let Some(token) = record.resume_token.as_deref() else {
            return ReportStatus::NotRequested;
        };

        let result = match outcome {
            JobOutcome::Succeeded => {
                let output = EventTaskOutput {
                    job_name: record.job_name.clone(),
                    job_run_id: record.job_run_id.clone(),
                    state: JobRunState::Succeeded.as_str().to_string(),
                    time: event.time.clone(),
                };
                self.workflow
                    .report_success(token, &to_json(&output))
                    .map_err(|source| BridgeError::Reporting {
                        operation: "SendTaskSuccess",
                        source,
                    })
            }
            JobOutcome::Failed(cause) => self
                .workflow
                .report_failure(token, JOB_FAILED_ERROR_CODE, &to_json(cause))
                .map_err(|source| BridgeError::Reporting {
                    operation: "SendTaskFailure",
                    source,
                }),
        };

        match result {
            Ok(()) => ReportStatus::Reported,
            Err(error) => {
                tracing::error!(
                    job_name = %record.job_name,
                    job_run_id = %record.job_run_id,
                    error = %error,
                    "Workflow engine did not accept the job outcome"
                );
                ReportStatus::Rejected(error)
            }
        }
    }

    fn advance_chain(
        &self,
        record: &CorrelationRecord,
        outcome: &JobOutcome,
    ) -> Option<ChainOutcome> {
        let dispatcher = self.chain?;
        match outcome {
            JobOutcome::Succeeded => {
                Some(dispatcher.on_success(&record.job_name, &record.job_run_id))
            }
            JobOutcome::Failed(_) => {
                if dispatcher.plan().stage_of(&record.job_name) == Some(Stage::First) {
                    tracing::warn!(
                        job_name = %record.job_name,
                        job_run_id = %record.job_run_id,
                        "First stage failed, second stage will not run"
                    );
                }
                None
            }
        }
    }
}

pub(crate) fn to_json(value: &impl serde::Serialize) -> String {
    serde_json::to_string(value).expect("task payload should serialize")
}
