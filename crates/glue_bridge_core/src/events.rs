//! Boundary decoding of the payloads the bridge functions are invoked with.

use serde_json::Value;

use crate::contract::{JobLifecycleEvent, ValidationError};
use crate::pipeline::{decode_pipeline_request, PipelineRunRequest};

pub const GLUE_EVENT_SOURCE: &str = "aws.glue";
pub const SQS_EVENT_SOURCE: &str = "aws:sqs";

#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    /// A Glue "Job State Change" notification.
    JobStateChange(JobLifecycleEvent),
    /// A queued pipeline submission for the step runner.
    PipelineSubmission(PipelineRunRequest),
    /// Anything else, e.g. a scheduled tick driving the poll loop.
    Scheduled,
}

pub fn decode_event(event: &Value) -> Result<BridgeEvent, ValidationError> {
    if is_glue_event(event) {
        return decode_lifecycle_event(event).map(BridgeEvent::JobStateChange);
    }

    if is_sqs_event(event) {
        let body = first_sqs_body(event)?;
        return decode_pipeline_request(body).map(BridgeEvent::PipelineSubmission);
    }

    Ok(BridgeEvent::Scheduled)
}

pub fn is_glue_event(event: &Value) -> bool {
    event
        .get("source")
        .and_then(Value::as_str)
        .map(|source| source == GLUE_EVENT_SOURCE)
        .unwrap_or(false)
}

pub fn is_sqs_event(event: &Value) -> bool {
    event
        .get("Records")
        .and_then(Value::as_array)
        .map(|records| {
            !records.is_empty()
                && records.iter().all(|record| {
                    record
                        .get("eventSource")
                        .and_then(Value::as_str)
                        .map(|source| source == SQS_EVENT_SOURCE)
                        .unwrap_or(false)
                })
        })
        .unwrap_or(false)
}

pub fn decode_lifecycle_event(event: &Value) -> Result<JobLifecycleEvent, ValidationError> {
    let detail = event
        .get("detail")
        .and_then(Value::as_object)
        .ok_or_else(|| ValidationError::new("job state change event must include detail"))?;

    let required = |field: &str| -> Result<String, ValidationError> {
        detail
            .get(field)
            .and_then(Value::as_str)
            .map(str::to_string)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| {
                ValidationError::new(format!("detail.{field} must be a non-empty string"))
            })
    };

    Ok(JobLifecycleEvent {
        job_name: required("jobName")?,
        job_run_id: required("jobRunId")?,
        state: detail.get("state").and_then(Value::as_str).map(str::to_string),
        message: detail
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        time: event
            .get("time")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

fn first_sqs_body(event: &Value) -> Result<&str, ValidationError> {
    event
        .get("Records")
        .and_then(Value::as_array)
        .and_then(|records| records.first())
        .and_then(|record| record.get("body"))
        .and_then(Value::as_str)
        .ok_or_else(|| ValidationError::new("SQS record body must be a string"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_glue_state_change() {
        let event = json!({
            "source": "aws.glue",
            "detail-type": "Glue Job State Change",
            "time": "2024-03-01T10:00:00Z",
            "detail": {
                "jobName": "ingest",
                "jobRunId": "jr_abc123",
                "state": "FAILED",
                "message": "OOM"
            }
        });

        let decoded = decode_event(&event).expect("event should decode");
        assert_eq!(
            decoded,
            BridgeEvent::JobStateChange(JobLifecycleEvent {
                job_name: "ingest".to_string(),
                job_run_id: "jr_abc123".to_string(),
                state: Some("FAILED".to_string()),
                message: Some("OOM".to_string()),
                time: "2024-03-01T10:00:00Z".to_string(),
            })
        );
    }

    #[test]
    fn glue_event_without_run_id_is_rejected() {
        let event = json!({
            "source": "aws.glue",
            "detail": {"jobName": "ingest", "state": "SUCCEEDED"}
        });

        let error = decode_event(&event).expect_err("missing run id should fail");
        assert_eq!(error.message(), "detail.jobRunId must be a non-empty string");
    }

    #[test]
    fn rejects_non_sqs_records() {
        let event = json!({
            "Records": [
                {"eventSource": "aws:s3", "body": "{}"}
            ]
        });
        assert!(!is_sqs_event(&event));
        assert_eq!(decode_event(&event), Ok(BridgeEvent::Scheduled));
    }

    #[test]
    fn rejects_sqs_record_without_body_string() {
        let event = json!({
            "Records": [
                {"eventSource": "aws:sqs", "body": 42}
            ]
        });

        let error = decode_event(&event).expect_err("non-string body should fail");
        assert_eq!(error.message(), "SQS record body must be a string");
    }

    #[test]
    fn scheduled_payload_falls_through() {
        let event = json!({"source": "aws.events", "detail-type": "Scheduled Event"});
        assert_eq!(decode_event(&event), Ok(BridgeEvent::Scheduled));
    }
}
