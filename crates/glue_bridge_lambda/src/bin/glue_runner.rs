use std::time::Duration;

use glue_bridge_lambda::adapters::aws::dynamodb::DynamoCorrelationStore;
use glue_bridge_lambda::adapters::aws::glue::GlueJobEngine;
use glue_bridge_lambda::adapters::aws::step_functions::{long_poll_client, StepFunctionsWorkflow};
use glue_bridge_lambda::config::{process_env, GlueRunnerConfig};
use glue_bridge_lambda::handlers::poll_loop::{PollCycleReport, PollLoop};
use glue_bridge_lambda::logging::{init_tracing, invocation_span};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

struct Clients {
    sfn: aws_sdk_sfn::Client,
    glue: aws_sdk_glue::Client,
    dynamodb: aws_sdk_dynamodb::Client,
}

fn handle_request(clients: &Clients, request_id: &str) -> Result<PollCycleReport, Error> {
    let config = GlueRunnerConfig::from_env(&process_env).map_err(|error| {
        tracing::error!(error = %error, "glue runner is not configured");
        Error::from(error.to_string())
    })?;

    let span = invocation_span("glue_runner", config.environment.as_deref(), request_id);
    span.in_scope(|| {
        let workflow = StepFunctionsWorkflow::new(clients.sfn.clone());
        let engine = GlueJobEngine::new(clients.glue.clone());
        let store =
            DynamoCorrelationStore::new(clients.dynamodb.clone(), &config.correlation_table);

        let poll = PollLoop::new(&config.poll, &workflow, &engine, &store);
        let report = poll.run_cycle();
        tracing::info!(
            submitted = report.drain.submitted.len(),
            inspected = report.reconcile.inspected,
            errors = report.reconcile.errors.len(),
            "glue runner cycle finished"
        );
        Ok(report)
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
        handle_request(clients, &event.context.request_id)
    }))
    .await
}
