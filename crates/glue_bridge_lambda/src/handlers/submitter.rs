use crate::adapters::correlation_store::CorrelationStore;
use crate::adapters::job_engine::JobEngine;
use crate::error::BridgeError;
use crate::runtime::contract::{short_run_id, CorrelationRecord, PipelineSubmission};

/// Starts jobs and records which activity scope is waiting on them.
pub struct JobSubmitter<'a> {
    engine: &'a dyn JobEngine,
    store: &'a dyn CorrelationStore,
    scope_id: &'a str,
}

impl<'a> JobSubmitter<'a> {
    pub fn new(
        engine: &'a dyn JobEngine,
        store: &'a dyn CorrelationStore,
        scope_id: &'a str,
    ) -> Self {
        Self {
            engine,
            store,
            scope_id,
        }
    }

    pub fn engine(&self) -> &'a dyn JobEngine {
        self.engine
    }

    /// Starts the job and writes its correlation record. A failed write does
    /// not stop the already started run; it is reported as
    /// [`BridgeError::OrphanedJob`].
    pub fn submit(
        &self,
        submission: &PipelineSubmission,
        resume_token: Option<&str>,
    ) -> Result<String, BridgeError> {
        tracing::info!(
            job_name = %submission.job_name,
            capacity = submission.capacity,
            "Running Glue job named \"{}\"",
            submission.job_name
        );

        let job_run_id = self.engine.start_job_run(submission).map_err(|source| {
            tracing::error!(
                job_name = %submission.job_name,
                error = %source,
                "Failed to start Glue job named {}",
                submission.job_name
            );
            BridgeError::Submission {
                job_name: submission.job_name.clone(),
                source,
            }
        })?;

        let record = CorrelationRecord {
            scope_id: self.scope_id.to_string(),
            job_run_id: job_run_id.clone(),
            job_name: submission.job_name.clone(),
            resume_token: resume_token.map(str::to_string),
        };

        if let Err(source) = self.store.put(&record) {
            tracing::error!(
                job_name = %record.job_name,
                job_run_id = %record.job_run_id,
                error = %source,
                "Glue job run {} started but its correlation record was not stored",
                short_run_id(&record.job_run_id)
            );
            return Err(BridgeError::OrphanedJob {
                job_name: record.job_name,
                job_run_id,
                source,
            });
        }

        tracing::info!(
            job_name = %record.job_name,
            job_run_id = %record.job_run_id,
            "Glue job run started. Run Id: {}",
            short_run_id(&record.job_run_id)
        );
        Ok(job_run_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::handlers::fakes::{FakeJobEngine, InMemoryCorrelationStore, SCOPE};
    use crate::runtime::contract::{CorrelationKey, JobArguments};

    fn submission() -> PipelineSubmission {
        PipelineSubmission {
            job_name: "ingest".to_string(),
            arguments: JobArguments::from([("--config".to_string(), "e30=".to_string())]),
            capacity: 2.0,
        }
    }

    #[test]
    fn successful_submit_leaves_exactly_one_record() {
        let engine = FakeJobEngine::new();
        let store = InMemoryCorrelationStore::new();
        let submitter = JobSubmitter::new(&engine, &store, SCOPE);

        let run_id = submitter
            .submit(&submission(), Some("token-1"))
            .expect("submit should succeed");

        assert_eq!(engine.started().len(), 1);
        assert_eq!(engine.started()[0].capacity, 2.0);
        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key(), CorrelationKey::new(SCOPE, run_id));
        assert_eq!(records[0].job_name, "ingest");
        assert_eq!(records[0].resume_token.as_deref(), Some("token-1"));
    }

    #[test]
    fn rejected_submission_writes_no_record() {
        let engine = FakeJobEngine::new();
        engine.fail_starts("capacity unavailable");
        let store = InMemoryCorrelationStore::new();
        let submitter = JobSubmitter::new(&engine, &store, SCOPE);

        let error = submitter
            .submit(&submission(), None)
            .expect_err("submit should fail");

        assert!(matches!(
            error,
            BridgeError::Submission { ref job_name, .. } if job_name == "ingest"
        ));
        assert!(store.records().is_empty());
    }

    #[test]
    fn failed_record_write_reports_orphaned_run() {
        let engine = FakeJobEngine::new();
        let store = InMemoryCorrelationStore::new();
        store.fail_writes();
        let submitter = JobSubmitter::new(&engine, &store, SCOPE);

        let error = submitter
            .submit(&submission(), None)
            .expect_err("record write should fail");

        match error {
            BridgeError::OrphanedJob {
                job_run_id, source, ..
            } => {
                assert_eq!(job_run_id, "jr_0001");
                assert!(matches!(source, ServiceError::Service(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(engine.started().len(), 1);
    }
}
