use std::time::Duration;

use glue_bridge_lambda::adapters::aws::dynamodb::DynamoCorrelationStore;
use glue_bridge_lambda::adapters::aws::glue::GlueJobEngine;
use glue_bridge_lambda::adapters::aws::step_functions::{long_poll_client, StepFunctionsWorkflow};
use glue_bridge_lambda::config::{process_env, GlueCheckerConfig};
use glue_bridge_lambda::handlers::chain::ChainDispatcher;
use glue_bridge_lambda::handlers::resolver::EventResolver;
use glue_bridge_lambda::handlers::submitter::JobSubmitter;
use glue_bridge_lambda::logging::{init_tracing, invocation_span};
use glue_bridge_lambda::runtime::events::{decode_event, BridgeEvent};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::{json, Value};

struct Clients {
    sfn: aws_sdk_sfn::Client,
    glue: aws_sdk_glue::Client,
    dynamodb: aws_sdk_dynamodb::Client,
}

fn handle_request(clients: &Clients, event: &Value, request_id: &str) -> Result<Value, Error> {
    let config = GlueCheckerConfig::from_env(&process_env).map_err(|error| {
        tracing::error!(error = %error, "glue checker is not configured");
        Error::from(error.to_string())
    })?;

    let span = invocation_span("glue_checker", config.environment.as_deref(), request_id);
    span.in_scope(|| {
        let lifecycle = match decode_event(event) {
            Ok(BridgeEvent::JobStateChange(lifecycle)) => lifecycle,
            Ok(_) => {
                tracing::warn!("ignoring event that is not a Glue job state change");
                return Ok(json!({"resolution": "ignored"}));
            }
            Err(error) => {
                tracing::error!(error = %error, "malformed Glue job state change");
                return Err(Error::from(error.to_string()));
            }
        };

        let workflow = StepFunctionsWorkflow::new(clients.sfn.clone());
        let engine = GlueJobEngine::new(clients.glue.clone());
        let store =
            DynamoCorrelationStore::new(clients.dynamodb.clone(), &config.correlation_table);
        let submitter = JobSubmitter::new(&engine, &store, &config.activity_arn);
        let dispatcher = config
            .chain
            .as_ref()
            .map(|chain| ChainDispatcher::new(&chain.plan, &submitter, chain.job_capacity));

        let resolver =
            EventResolver::new(&config.activity_arn, &store, &workflow, dispatcher.as_ref());
        let resolution = resolver.resolve(&lifecycle);

        Ok(json!({
            "job_name": lifecycle.job_name,
            "job_run_id": lifecycle.job_run_id,
            "resolution": resolution.label(),
        }))
    })
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let clients = Clients {
        sfn: long_poll_client(&aws_config, Duration::from_secs(50), Duration::from_secs(70)),
        glue: aws_sdk_glue::Client::new(&aws_config),
        dynamodb: aws_sdk_dynamodb::Client::new(&aws_config),
    };
    let clients = &clients;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_request(clients, &event.payload, &event.context.request_id)
    }))
    .await
}
