//! In-memory adapter doubles shared by the handler tests.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use crate::adapters::correlation_store::CorrelationStore;
use crate::adapters::job_engine::{JobEngine, JobRunDetail};
use crate::adapters::object_store::SnapshotStore;
use crate::adapters::run_ledger::RunLedger;
use crate::adapters::workflow::{ActivityTask, WorkflowEngine, WorkflowLauncher};
use crate::error::ServiceError;
use crate::runtime::contract::{CorrelationKey, CorrelationRecord, JobArguments, PipelineSubmission};
use crate::runtime::object_location::ObjectLocation;
use crate::runtime::pipeline::PipelineRunRecord;

pub const SCOPE: &str = "arn:aws:states:eu-west-2:123456789012:activity:glue-runner";

#[derive(Default)]
pub struct InMemoryCorrelationStore {
    records: Mutex<BTreeMap<(String, String), CorrelationRecord>>,
    fail_writes: Mutex<bool>,
    fail_reads: Mutex<bool>,
    fail_deletes: Mutex<bool>,
    lose_next_delete: Mutex<bool>,
    deletes: Mutex<usize>,
}

impl InMemoryCorrelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, record: CorrelationRecord) {
        self.records.lock().expect("poisoned mutex").insert(
            (record.scope_id.clone(), record.job_run_id.clone()),
            record,
        );
    }

    pub fn records(&self) -> Vec<CorrelationRecord> {
        self.records
            .lock()
            .expect("poisoned mutex")
            .values()
            .cloned()
            .collect()
    }

    pub fn deletes(&self) -> usize {
        *self.deletes.lock().expect("poisoned mutex")
    }

    pub fn fail_writes(&self) {
        *self.fail_writes.lock().expect("poisoned mutex") = true;
    }

    pub fn fail_reads(&self) {
        *self.fail_reads.lock().expect("poisoned mutex") = true;
    }

    pub fn fail_deletes(&self) {
        *self.fail_deletes.lock().expect("poisoned mutex") = true;
    }

    /// Makes the next delete behave as if a concurrent invocation removed the
    /// record first.
    pub fn lose_next_delete(&self) {
        *self.lose_next_delete.lock().expect("poisoned mutex") = true;
    }
}

impl CorrelationStore for InMemoryCorrelationStore {
    fn put(&self, record: &CorrelationRecord) -> Result<(), ServiceError> {
        if *self.fail_writes.lock().expect("poisoned mutex") {
            return Err(ServiceError::Service("PutItem failed: throttled".to_string()));
        }
        let mut records = self.records.lock().expect("poisoned mutex");
        let key = (record.scope_id.clone(), record.job_run_id.clone());
        if records.contains_key(&key) {
            return Err(ServiceError::ConditionFailed(record.job_run_id.clone()));
        }
        records.insert(key, record.clone());
        Ok(())
    }

    fn get(&self, key: &CorrelationKey) -> Result<Option<CorrelationRecord>, ServiceError> {
        if *self.fail_reads.lock().expect("poisoned mutex") {
            return Err(ServiceError::Service("GetItem failed: unreachable".to_string()));
        }
        Ok(self
            .records
            .lock()
            .expect("poisoned mutex")
            .get(&(key.scope_id.clone(), key.job_run_id.clone()))
            .cloned())
    }

    fn query_scope(
        &self,
        scope_id: &str,
        limit: i32,
    ) -> Result<Vec<CorrelationRecord>, ServiceError> {
        if *self.fail_reads.lock().expect("poisoned mutex") {
            return Err(ServiceError::Service("Query failed: unreachable".to_string()));
        }
        Ok(self
            .records
            .lock()
            .expect("poisoned mutex")
            .values()
            .filter(|record| record.scope_id == scope_id)
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }

    fn delete(&self, key: &CorrelationKey) -> Result<Option<CorrelationRecord>, ServiceError> {
        if *self.fail_deletes.lock().expect("poisoned mutex") {
            return Err(ServiceError::Service("DeleteItem failed: throttled".to_string()));
        }
        *self.deletes.lock().expect("poisoned mutex") += 1;
        let removed = self
            .records
            .lock()
            .expect("poisoned mutex")
            .remove(&(key.scope_id.clone(), key.job_run_id.clone()));

        let mut lose = self.lose_next_delete.lock().expect("poisoned mutex");
        if *lose {
            *lose = false;
            return Ok(None);
        }
        Ok(removed)
    }
}

#[derive(Default)]
pub struct FakeJobEngine {
    started: Mutex<Vec<PipelineSubmission>>,
    details: Mutex<HashMap<String, JobRunDetail>>,
    start_error: Mutex<Option<String>>,
    status_errors: Mutex<HashSet<String>>,
}

impl FakeJobEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started(&self) -> Vec<PipelineSubmission> {
        self.started.lock().expect("poisoned mutex").clone()
    }

    pub fn fail_starts(&self, message: &str) {
        *self.start_error.lock().expect("poisoned mutex") = Some(message.to_string());
    }

    pub fn set_run(&self, job_name: &str, job_run_id: &str, state: &str, arguments: JobArguments) {
        self.details.lock().expect("poisoned mutex").insert(
            job_run_id.to_string(),
            JobRunDetail {
                job_name: job_name.to_string(),
                job_run_id: job_run_id.to_string(),
                state: Some(state.to_string()),
                arguments,
                error_message: None,
                started_on: None,
                completed_on: None,
                last_modified_on: None,
            },
        );
    }

    pub fn set_detail(&self, detail: JobRunDetail) {
        self.details
            .lock()
            .expect("poisoned mutex")
            .insert(detail.job_run_id.clone(), detail);
    }

    pub fn fail_status_of(&self, job_run_id: &str) {
        self.status_errors
            .lock()
            .expect("poisoned mutex")
            .insert(job_run_id.to_string());
    }
}

impl JobEngine for FakeJobEngine {
    fn start_job_run(&self, submission: &PipelineSubmission) -> Result<String, ServiceError> {
        if let Some(message) = self.start_error.lock().expect("poisoned mutex").clone() {
            return Err(ServiceError::Service(message));
        }
        let mut started = self.started.lock().expect("poisoned mutex");
        started.push(submission.clone());
        Ok(format!("jr_{:04}", started.len()))
    }

    fn get_job_run(&self, _job_name: &str, job_run_id: &str) -> Result<JobRunDetail, ServiceError> {
        if self
            .status_errors
            .lock()
            .expect("poisoned mutex")
            .contains(job_run_id)
        {
            return Err(ServiceError::Service("GetJobRun failed: throttled".to_string()));
        }
        self.details
            .lock()
            .expect("poisoned mutex")
            .get(job_run_id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(job_run_id.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Success { token: String, output: String },
    Failure { token: String, error: String, cause: String },
    Heartbeat { token: String },
}

#[derive(Default)]
pub struct FakeWorkflow {
    tasks: Mutex<VecDeque<ActivityTask>>,
    fetches: Mutex<usize>,
    fail_fetch: Mutex<bool>,
    reject_reports: Mutex<bool>,
    reports: Mutex<Vec<Report>>,
}

impl FakeWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_task(&self, resume_token: &str, input: &str) {
        self.tasks
            .lock()
            .expect("poisoned mutex")
            .push_back(ActivityTask {
                resume_token: resume_token.to_string(),
                input: input.to_string(),
            });
    }

    pub fn fail_fetch(&self) {
        *self.fail_fetch.lock().expect("poisoned mutex") = true;
    }

    pub fn reject_reports(&self) {
        *self.reject_reports.lock().expect("poisoned mutex") = true;
    }

    pub fn fetches(&self) -> usize {
        *self.fetches.lock().expect("poisoned mutex")
    }

    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().expect("poisoned mutex").clone()
    }

    fn record(&self, report: Report) -> Result<(), ServiceError> {
        self.reports.lock().expect("poisoned mutex").push(report);
        if *self.reject_reports.lock().expect("poisoned mutex") {
            return Err(ServiceError::Service("TaskTimedOut".to_string()));
        }
        Ok(())
    }
}

impl WorkflowEngine for FakeWorkflow {
    fn next_activity_task(
        &self,
        _activity_arn: &str,
        _worker_name: &str,
    ) -> Result<Option<ActivityTask>, ServiceError> {
        *self.fetches.lock().expect("poisoned mutex") += 1;
        if *self.fail_fetch.lock().expect("poisoned mutex") {
            return Err(ServiceError::Service("GetActivityTask failed".to_string()));
        }
        Ok(self.tasks.lock().expect("poisoned mutex").pop_front())
    }

    fn report_success(&self, resume_token: &str, output: &str) -> Result<(), ServiceError> {
        self.record(Report::Success {
            token: resume_token.to_string(),
            output: output.to_string(),
        })
    }

    fn report_failure(
        &self,
        resume_token: &str,
        error_code: &str,
        cause: &str,
    ) -> Result<(), ServiceError> {
        self.record(Report::Failure {
            token: resume_token.to_string(),
            error: error_code.to_string(),
            cause: cause.to_string(),
        })
    }

    fn report_heartbeat(&self, resume_token: &str) -> Result<(), ServiceError> {
        self.record(Report::Heartbeat {
            token: resume_token.to_string(),
        })
    }
}

#[derive(Default)]
pub struct FakeLauncher {
    executions: Mutex<Vec<(String, String)>>,
    fail: Mutex<bool>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self) {
        *self.fail.lock().expect("poisoned mutex") = true;
    }

    pub fn executions(&self) -> Vec<(String, String)> {
        self.executions.lock().expect("poisoned mutex").clone()
    }
}

impl WorkflowLauncher for FakeLauncher {
    fn start_execution(&self, name: &str, input: &str) -> Result<String, ServiceError> {
        if *self.fail.lock().expect("poisoned mutex") {
            return Err(ServiceError::Service("ExecutionLimitExceeded".to_string()));
        }
        self.executions
            .lock()
            .expect("poisoned mutex")
            .push((name.to_string(), input.to_string()));
        Ok(format!(
            "arn:aws:states:eu-west-2:123456789012:execution:pipeline:{name}"
        ))
    }
}

#[derive(Default)]
pub struct FakeSnapshotStore {
    outcome: Mutex<Option<ServiceError>>,
    checked: Mutex<Vec<ObjectLocation>>,
}

impl FakeSnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, error: ServiceError) {
        *self.outcome.lock().expect("poisoned mutex") = Some(error);
    }

    pub fn checked(&self) -> Vec<ObjectLocation> {
        self.checked.lock().expect("poisoned mutex").clone()
    }
}

impl SnapshotStore for FakeSnapshotStore {
    fn check_object(&self, location: &ObjectLocation) -> Result<(), ServiceError> {
        self.checked
            .lock()
            .expect("poisoned mutex")
            .push(location.clone());
        match self.outcome.lock().expect("poisoned mutex").clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct FakeRunLedger {
    runs: Mutex<Vec<PipelineRunRecord>>,
    fail: Mutex<bool>,
}

impl FakeRunLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self) {
        *self.fail.lock().expect("poisoned mutex") = true;
    }

    pub fn runs(&self) -> Vec<PipelineRunRecord> {
        self.runs.lock().expect("poisoned mutex").clone()
    }
}

impl RunLedger for FakeRunLedger {
    fn record_run(&self, record: &PipelineRunRecord) -> Result<(), ServiceError> {
        if *self.fail.lock().expect("poisoned mutex") {
            return Err(ServiceError::Service("PutItem failed: throttled".to_string()));
        }
        self.runs
            .lock()
            .expect("poisoned mutex")
            .push(record.clone());
        Ok(())
    }
}

pub fn record(job_run_id: &str, job_name: &str, resume_token: Option<&str>) -> CorrelationRecord {
    CorrelationRecord {
        scope_id: SCOPE.to_string(),
        job_run_id: job_run_id.to_string(),
        job_name: job_name.to_string(),
        resume_token: resume_token.map(str::to_string),
    }
}
