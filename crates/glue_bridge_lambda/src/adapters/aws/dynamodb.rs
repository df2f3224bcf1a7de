use std::collections::HashMap;

use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use serde_json::Value;

use super::{block_on, service_error};
use crate::adapters::correlation_store::CorrelationStore;
use crate::adapters::run_ledger::RunLedger;
use crate::error::ServiceError;
use crate::runtime::contract::{CorrelationKey, CorrelationRecord};
use crate::runtime::pipeline::PipelineRunRecord;

pub const SCOPE_ATTRIBUTE: &str = "sfn_activity_arn";
pub const RUN_ID_ATTRIBUTE: &str = "glue_job_run_id";
pub const JOB_NAME_ATTRIBUTE: &str = "glue_job_name";
pub const RESUME_TOKEN_ATTRIBUTE: &str = "sfn_task_token";

type Item = HashMap<String, AttributeValue>;

pub struct DynamoCorrelationStore {
    client: aws_sdk_dynamodb::Client,
    table_name: String,
}

impl DynamoCorrelationStore {
    pub fn new(client: aws_sdk_dynamodb::Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

impl CorrelationStore for DynamoCorrelationStore {
    fn put(&self, record: &CorrelationRecord) -> Result<(), ServiceError> {
        let mut item = key_attributes(&record.key());
        item.insert(
            JOB_NAME_ATTRIBUTE.to_string(),
            AttributeValue::S(record.job_name.clone()),
        );
        if let Some(token) = &record.resume_token {
            item.insert(
                RESUME_TOKEN_ATTRIBUTE.to_string(),
                AttributeValue::S(token.clone()),
            );
        }

        block_on(
            self.client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(item))
                .condition_expression("attribute_not_exists(#run_id)")
                .expression_attribute_names("#run_id", RUN_ID_ATTRIBUTE)
                .send(),
        )
        .map(|_| ())
        .map_err(|error| service_error("PutItem", error))
    }

    fn get(&self, key: &CorrelationKey) -> Result<Option<CorrelationRecord>, ServiceError> {
        let output = block_on(
            self.client
                .get_item()
                .table_name(&self.table_name)
                .set_key(Some(key_attributes(key)))
                .consistent_read(true)
                .send(),
        )
        .map_err(|error| service_error("GetItem", error))?;

        output.item().map(record_from_item).transpose()
    }

    fn query_scope(
        &self,
        scope_id: &str,
        limit: i32,
    ) -> Result<Vec<CorrelationRecord>, ServiceError> {
        let output = block_on(
            self.client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("#scope = :scope")
                .expression_attribute_names("#scope", SCOPE_ATTRIBUTE)
                .expression_attribute_values(":scope", AttributeValue::S(scope_id.to_string()))
                .limit(limit)
                .consistent_read(true)
                .send(),
        )
        .map_err(|error| service_error("Query", error))?;

        let mut records = Vec::with_capacity(output.items().len());
        for item in output.items() {
            match record_from_item(item) {
                Ok(record) => records.push(record),
                Err(error) => tracing::warn!(
                    table = %self.table_name,
                    error = %error,
                    "skipping malformed correlation record"
                ),
            }
        }
        Ok(records)
    }

    fn delete(&self, key: &CorrelationKey) -> Result<Option<CorrelationRecord>, ServiceError> {
        let output = block_on(
            self.client
                .delete_item()
                .table_name(&self.table_name)
                .set_key(Some(key_attributes(key)))
                .return_values(ReturnValue::AllOld)
                .send(),
        )
        .map_err(|error| service_error("DeleteItem", error))?;

        output.attributes().map(record_from_item).transpose()
    }
}

pub struct DynamoRunLedger {
    client: aws_sdk_dynamodb::Client,
    table_name: String,
}

impl DynamoRunLedger {
    pub fn new(client: aws_sdk_dynamodb::Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

impl RunLedger for DynamoRunLedger {
    fn record_run(&self, record: &PipelineRunRecord) -> Result<(), ServiceError> {
        let item = Item::from([
            ("run_id".to_string(), AttributeValue::S(record.run_id.clone())),
            (
                "category".to_string(),
                AttributeValue::S(record.category.clone()),
            ),
            ("template_id".to_string(), json_attribute(&record.template_id)),
            (
                "template_version".to_string(),
                json_attribute(&record.template_version),
            ),
            ("client_id".to_string(), json_attribute(&record.client_id)),
            (
                "run_status".to_string(),
                AttributeValue::S(record.run_status.clone()),
            ),
            (
                "runtime_config".to_string(),
                AttributeValue::S(record.runtime_config.clone()),
            ),
        ]);

        block_on(
            self.client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(item))
                .send(),
        )
        .map(|_| ())
        .map_err(|error| service_error("PutItem", error))
    }
}

fn key_attributes(key: &CorrelationKey) -> Item {
    Item::from([
        (
            SCOPE_ATTRIBUTE.to_string(),
            AttributeValue::S(key.scope_id.clone()),
        ),
        (
            RUN_ID_ATTRIBUTE.to_string(),
            AttributeValue::S(key.job_run_id.clone()),
        ),
    ])
}

fn record_from_item(item: &Item) -> Result<CorrelationRecord, ServiceError> {
    let string_attribute = |name: &str| -> Option<String> {
        item.get(name)
            .and_then(|value| value.as_s().ok())
            .map(String::to_string)
    };
    let required = |name: &str| -> Result<String, ServiceError> {
        string_attribute(name).ok_or_else(|| {
            ServiceError::Service(format!("correlation record is missing string attribute {name}"))
        })
    };

    Ok(CorrelationRecord {
        scope_id: required(SCOPE_ATTRIBUTE)?,
        job_run_id: required(RUN_ID_ATTRIBUTE)?,
        job_name: required(JOB_NAME_ATTRIBUTE)?,
        resume_token: string_attribute(RESUME_TOKEN_ATTRIBUTE),
    })
}

fn json_attribute(value: &Value) -> AttributeValue {
    match value {
        Value::String(text) => AttributeValue::S(text.clone()),
        Value::Number(number) => AttributeValue::N(number.to_string()),
        Value::Bool(flag) => AttributeValue::Bool(*flag),
        other => AttributeValue::S(other.to_string()),
    }
}
