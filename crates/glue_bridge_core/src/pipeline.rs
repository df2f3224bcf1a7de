//! Pipeline submissions queued for the step runner and the workflow input
//! built from them.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::contract::ValidationError;
use crate::task_input::{CONFIG_ARGUMENT, JOB_NAME_FIELD};

pub const RUN_STATUS_SUBMITTED: &str = "SUBMITTED";
pub const EXECUTION_NAME_PREFIX: &str = "Lambda-Execution-";
pub const EXECUTION_SUFFIX_RANGE: std::ops::RangeInclusive<u16> = 1111..=9999;

/// Runtime configuration embedded (as a JSON string) in the submission payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bpm_queue_url: Option<String>,
    pub spark: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRunRequest {
    pub run_id: String,
    pub survey: String,
    pub snapshot_location: String,
    pub template_id: Value,
    pub template_version: Value,
    pub client_id: Value,
    pub pipeline: PipelineConfig,
    /// The pipeline configuration exactly as it was queued.
    pub runtime_config: String,
    payload: Map<String, Value>,
}

/// Row written to the pipeline runs table before the workflow starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRunRecord {
    pub run_id: String,
    pub category: String,
    pub template_id: Value,
    pub template_version: Value,
    pub client_id: Value,
    pub run_status: String,
    pub runtime_config: String,
}

/// First-stage Glue jobs, selected by the pipeline's `spark` flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirstStageJobs {
    pub spark_job: String,
    pub python_shell_job: String,
}

impl FirstStageJobs {
    pub fn select(&self, pipeline: &PipelineConfig) -> &str {
        if pipeline.spark {
            &self.spark_job
        } else {
            &self.python_shell_job
        }
    }
}

pub fn decode_pipeline_request(body: &str) -> Result<PipelineRunRequest, ValidationError> {
    let flattened = body.replace('\n', " ");
    let event: Value = serde_json::from_str(&flattened)
        .map_err(|error| ValidationError::new(format!("Malformed submission body: {error}")))?;

    let payload = event
        .get("Payload")
        .and_then(Value::as_object)
        .cloned()
        .ok_or_else(|| {
            ValidationError::new(
                "Top-level 'Payload' object attribute expected in event but not found",
            )
        })?;

    let runtime_config = required_str(&payload, "pipeline")?;
    let pipeline: PipelineConfig = serde_json::from_str(&runtime_config)
        .map_err(|error| ValidationError::new(format!("Malformed pipeline config: {error}")))?;

    Ok(PipelineRunRequest {
        run_id: required_str(&payload, "run_id")?,
        survey: required_str(&payload, "survey")?,
        snapshot_location: required_str(&payload, "snapshot_location")?,
        template_id: required_value(&payload, "template_id")?,
        template_version: required_value(&payload, "template_version")?,
        client_id: required_value(&payload, "client_id")?,
        pipeline,
        runtime_config,
        payload,
    })
}

impl PipelineRunRequest {
    pub fn run_record(&self) -> PipelineRunRecord {
        PipelineRunRecord {
            run_id: self.run_id.clone(),
            category: self.survey.clone(),
            template_id: self.template_id.clone(),
            template_version: self.template_version.clone(),
            client_id: self.client_id.clone(),
            run_status: RUN_STATUS_SUBMITTED.to_string(),
            runtime_config: self.runtime_config.clone(),
        }
    }

    /// Builds the state machine input: a JSON string literal wrapping the JSON
    /// object `{"GlueJobName": .., "--config": ..}`, where `--config` is the
    /// submission payload with its pipeline expanded and stamped with the run id.
    pub fn workflow_input(&self, job_name: &str) -> Result<String, ValidationError> {
        let mut pipeline = serde_json::to_value(&self.pipeline)
            .map_err(|error| ValidationError::new(format!("Failed to encode pipeline: {error}")))?;
        if let Value::Object(fields) = &mut pipeline {
            fields.insert("run_id".to_string(), Value::String(self.run_id.clone()));
        }

        let mut payload = self.payload.clone();
        payload.insert("pipeline".to_string(), pipeline);

        let config = Value::Object(payload).to_string();
        let task_input = json!({
            JOB_NAME_FIELD: job_name,
            CONFIG_ARGUMENT: config,
        })
        .to_string();

        Ok(Value::String(task_input).to_string())
    }
}

pub fn execution_name(run_id: &str, suffix: u16) -> String {
    format!("{EXECUTION_NAME_PREFIX}{run_id}{suffix}")
}

fn required_str(payload: &Map<String, Value>, field: &str) -> Result<String, ValidationError> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ValidationError::new(format!("Payload.{field} must be a string")))
}

fn required_value(payload: &Map<String, Value>, field: &str) -> Result<Value, ValidationError> {
    match payload.get(field) {
        Some(Value::Null) | None => Err(ValidationError::new(format!(
            "Payload.{field} is required"
        ))),
        Some(value) => Ok(value.clone()),
    }
}
