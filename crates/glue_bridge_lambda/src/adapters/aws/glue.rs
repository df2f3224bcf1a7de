use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::{block_on, service_error};
use crate::adapters::job_engine::{JobEngine, JobRunDetail};
use crate::error::ServiceError;
use crate::runtime::contract::PipelineSubmission;

pub struct GlueJobEngine {
    client: aws_sdk_glue::Client,
}

impl GlueJobEngine {
    pub fn new(client: aws_sdk_glue::Client) -> Self {
        Self { client }
    }
}

impl JobEngine for GlueJobEngine {
    fn start_job_run(&self, submission: &PipelineSubmission) -> Result<String, ServiceError> {
        let arguments: HashMap<String, String> = submission
            .arguments
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        let output = block_on(
            self.client
                .start_job_run()
                .job_name(&submission.job_name)
                .set_arguments(Some(arguments))
                .max_capacity(submission.capacity)
                .send(),
        )
        .map_err(|error| service_error("StartJobRun", error))?;

        output
            .job_run_id()
            .filter(|run_id| !run_id.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ServiceError::Service("StartJobRun returned no run id".to_string()))
    }

    fn get_job_run(&self, job_name: &str, job_run_id: &str) -> Result<JobRunDetail, ServiceError> {
        let output = block_on(
            self.client
                .get_job_run()
                .job_name(job_name)
                .run_id(job_run_id)
                .predecessors_included(false)
                .send(),
        )
        .map_err(|error| service_error("GetJobRun", error))?;

        let run = output.job_run().ok_or_else(|| {
            ServiceError::NotFound(format!("GetJobRun returned no run for {job_run_id}"))
        })?;

        Ok(JobRunDetail {
            job_name: job_name.to_string(),
            job_run_id: job_run_id.to_string(),
            state: run.job_run_state().map(|state| state.as_str().to_string()),
            arguments: run
                .arguments()
                .map(|arguments| {
                    arguments
                        .iter()
                        .map(|(name, value)| (name.clone(), value.clone()))
                        .collect()
                })
                .unwrap_or_default(),
            error_message: run.error_message().map(str::to_string),
            started_on: run.started_on().and_then(to_chrono),
            completed_on: run.completed_on().and_then(to_chrono),
            last_modified_on: run.last_modified_on().and_then(to_chrono),
        })
    }
}

fn to_chrono(timestamp: &aws_sdk_glue::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(timestamp.secs(), timestamp.subsec_nanos())
}
