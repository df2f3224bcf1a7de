//! Activity task input decoding and the `--config` argument transport.
//!
//! Glue job arguments are not binary safe, so the embedded `--config` JSON is
//! base64 encoded exactly once before submission. The job decodes it on its
//! side with [`decode_config_argument`].

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{Map, Value};

use crate::contract::{JobArguments, PipelineSubmission, ValidationError};

pub const CONFIG_ARGUMENT: &str = "--config";
pub const JOB_NAME_FIELD: &str = "GlueJobName";

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityTaskInput {
    pub job_name: String,
    /// Job arguments with `--config` still in plain JSON.
    pub arguments: JobArguments,
    pub run_id: String,
    pub survey: String,
}

impl ActivityTaskInput {
    /// Converts the task into a job submission, encoding `--config` for transport.
    pub fn into_submission(self, capacity: f64) -> PipelineSubmission {
        let mut arguments = self.arguments;
        encode_config_argument(&mut arguments);
        PipelineSubmission {
            job_name: self.job_name,
            arguments,
            capacity,
        }
    }
}

/// Decodes the input of an activity task. Two shapes are accepted:
/// `{"job": <name>, "input": "<json arguments>"}` or a JSON string wrapping
/// `{"GlueJobName": <name>, "--config": "<json>", ..}`.
pub fn decode_task_input(raw: &str) -> Result<ActivityTaskInput, ValidationError> {
    let outer: Value = serde_json::from_str(raw)
        .map_err(|error| ValidationError::new(format!("task input is not JSON: {error}")))?;

    let (job_name, fields) = match outer {
        Value::Object(envelope) => {
            let job_name = envelope
                .get("job")
                .and_then(Value::as_str)
                .ok_or_else(|| ValidationError::new("task input envelope must carry 'job'"))?
                .to_string();
            let input = envelope
                .get("input")
                .and_then(Value::as_str)
                .ok_or_else(|| ValidationError::new("task input envelope must carry 'input'"))?;
            (job_name, parse_object(input)?)
        }
        Value::String(inner) => {
            let fields = parse_object(&inner)?;
            let job_name = fields
                .get(JOB_NAME_FIELD)
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    ValidationError::new(format!("task input must carry '{JOB_NAME_FIELD}'"))
                })?
                .to_string();
            (job_name, fields)
        }
        _ => {
            return Err(ValidationError::new(
                "task input must be an object or a JSON-encoded string",
            ))
        }
    };

    if job_name.trim().is_empty() {
        return Err(ValidationError::new("job name cannot be empty"));
    }

    let mut arguments = JobArguments::new();
    for (name, value) in fields {
        if name == JOB_NAME_FIELD {
            continue;
        }
        let value = match value {
            Value::String(text) => text,
            Value::Object(_) | Value::Array(_) => {
                return Err(ValidationError::new(format!(
                    "argument '{name}' must be a scalar value"
                )))
            }
            other => other.to_string(),
        };
        arguments.insert(name, value);
    }

    let config_text = arguments
        .get(CONFIG_ARGUMENT)
        .ok_or_else(|| {
            ValidationError::new(format!("task input must carry '{CONFIG_ARGUMENT}'"))
        })?;
    let config: Value = serde_json::from_str(config_text)
        .map_err(|error| ValidationError::new(format!("Unable to load config: {error}")))?;

    let run_id = config
        .get("pipeline")
        .and_then(|pipeline| pipeline.get("run_id"))
        .and_then(Value::as_str)
        .ok_or_else(|| ValidationError::new("config must carry pipeline.run_id"))?
        .to_string();
    let survey = config
        .get("survey")
        .and_then(Value::as_str)
        .ok_or_else(|| ValidationError::new("config must carry survey"))?
        .to_string();

    Ok(ActivityTaskInput {
        job_name,
        arguments,
        run_id,
        survey,
    })
}

pub fn encode_config_argument(arguments: &mut JobArguments) {
    if let Some(config) = arguments.get_mut(CONFIG_ARGUMENT) {
        *config = STANDARD.encode(config.as_bytes());
    }
}

pub fn decode_config_argument(encoded: &str) -> Result<String, ValidationError> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|error| ValidationError::new(format!("config is not valid base64: {error}")))?;
    String::from_utf8(bytes)
        .map_err(|error| ValidationError::new(format!("config is not valid UTF-8: {error}")))
}

fn parse_object(text: &str) -> Result<Map<String, Value>, ValidationError> {
    match serde_json::from_str(text) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(ValidationError::new("task arguments must be a JSON object")),
        Err(error) => Err(ValidationError::new(format!(
            "task arguments are not JSON: {error}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn config() -> String {
        json!({
            "survey": "BMI_SG",
            "pipeline": {"run_id": "run-9", "spark": false}
        })
        .to_string()
    }

    #[test]
    fn decodes_double_encoded_task_input() {
        let inner = json!({"GlueJobName": "ingest", "--config": config()}).to_string();
        let raw = Value::String(inner).to_string();

        let task = decode_task_input(&raw).expect("input should decode");
        assert_eq!(task.job_name, "ingest");
        assert_eq!(task.run_id, "run-9");
        assert_eq!(task.survey, "BMI_SG");
        assert!(!task.arguments.contains_key(JOB_NAME_FIELD));
        assert_eq!(task.arguments[CONFIG_ARGUMENT], config());
    }

    #[test]
    fn decodes_job_envelope_task_input() {
        let raw = json!({
            "job": "compute",
            "input": json!({"--config": config(), "--partitions": 4}).to_string()
        })
        .to_string();

        let task = decode_task_input(&raw).expect("input should decode");
        assert_eq!(task.job_name, "compute");
        assert_eq!(task.arguments["--partitions"], "4");
    }

    #[test]
    fn malformed_config_is_rejected() {
        let inner = json!({"GlueJobName": "ingest", "--config": "{not json"}).to_string();
        let raw = Value::String(inner).to_string();

        let error = decode_task_input(&raw).expect_err("config should fail");
        assert!(error.message().starts_with("Unable to load config"));
    }

    #[test]
    fn config_without_run_id_is_rejected() {
        let inner = json!({
            "GlueJobName": "ingest",
            "--config": json!({"survey": "BMI_SG", "pipeline": {}}).to_string()
        })
        .to_string();
        let raw = Value::String(inner).to_string();

        let error = decode_task_input(&raw).expect_err("run id is required");
        assert_eq!(error.message(), "config must carry pipeline.run_id");
    }

    #[test]
    fn submission_encodes_config_once_and_job_side_recovers_it() {
        let inner = json!({"GlueJobName": "ingest", "--config": config()}).to_string();
        let task = decode_task_input(&Value::String(inner).to_string()).expect("decode");

        let submission = task.into_submission(5.0);
        let encoded = &submission.arguments[CONFIG_ARGUMENT];
        assert_ne!(encoded, &config());
        assert!(encoded.chars().all(|c| c.is_ascii_alphanumeric() || "+/=".contains(c)));
        assert_eq!(decode_config_argument(encoded).expect("decode"), config());
        assert_eq!(submission.capacity, 5.0);
    }

    #[test]
    fn arguments_without_config_are_left_untouched() {
        let mut arguments = JobArguments::from([("--mode".to_string(), "fast".to_string())]);
        encode_config_argument(&mut arguments);
        assert_eq!(arguments["--mode"], "fast");
    }
}
