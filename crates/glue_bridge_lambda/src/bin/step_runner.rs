use std::time::Duration;

use glue_bridge_lambda::adapters::aws::dynamodb::DynamoRunLedger;
use glue_bridge_lambda::adapters::aws::s3::S3SnapshotStore;
use glue_bridge_lambda::adapters::aws::step_functions::{long_poll_client, StepFunctionsLauncher};
use glue_bridge_lambda::config::{process_env, StepRunnerConfig};
use glue_bridge_lambda::handlers::step_runner::{handle_pipeline_submission, StepRunnerPorts};
use glue_bridge_lambda::logging::{init_tracing, invocation_span};
use glue_bridge_lambda::runtime::contract::InvocationResponse;
use glue_bridge_lambda::runtime::pipeline::EXECUTION_SUFFIX_RANGE;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use rand::Rng;
use serde_json::Value;

struct Clients {
    sfn: aws_sdk_sfn::Client,
    s3: aws_sdk_s3::Client,
    dynamodb: aws_sdk_dynamodb::Client,
}

fn handle_request(
    clients: &Clients,
    event: &Value,
    request_id: &str,
) -> Result<InvocationResponse, Error> {
    let config = StepRunnerConfig::from_env(&process_env).map_err(|error| {
        tracing::error!(error = %error, "step runner is not configured");
        Error::from(error.to_string())
    })?;

    let span = invocation_span("step_runner", config.environment.as_deref(), request_id);
    span.in_scope(|| {
        let snapshots = S3SnapshotStore::new(clients.s3.clone());
        let ledger = DynamoRunLedger::new(clients.dynamodb.clone(), &config.pipeline_runs_table);
        let launcher = StepFunctionsLauncher::new(clients.sfn.clone(), &config.state_machine_arn);
        let ports = StepRunnerPorts {
            snapshots: &snapshots,
            ledger: &ledger,
            launcher: &launcher,
        };

        let suffix = rand::thread_rng().gen_range(EXECUTION_SUFFIX_RANGE);
        Ok(handle_pipeline_submission(event, &config.jobs, &ports, suffix))
    })
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let clients = Clients {
        sfn: long_poll_client(&aws_config, Duration::from_secs(100), Duration::from_secs(200)),
        s3: aws_sdk_s3::Client::new(&aws_config),
        dynamodb: aws_sdk_dynamodb::Client::new(&aws_config),
    };
    let clients = &clients;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_request(clients, &event.payload, &event.context.request_id)
    }))
    .await
}
