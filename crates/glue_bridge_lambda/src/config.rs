//! Environment-driven settings of the three functions.
//!
//! Every loader takes a lookup closure so tests can supply values without
//! touching the process environment.

use std::str::FromStr;

use crate::error::BridgeError;
use crate::handlers::chain::ChainPlan;
use crate::handlers::poll_loop::PollLoopSettings;
use crate::runtime::pipeline::FirstStageJobs;

pub const DEFAULT_PIPELINE_RUNS_TABLE: &str = "spp-res_ddb_pipeline_runs";

pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlueRunnerConfig {
    pub environment: Option<String>,
    pub correlation_table: String,
    pub poll: PollLoopSettings,
}

impl GlueRunnerConfig {
    pub fn from_env(lookup: EnvLookup<'_>) -> Result<Self, BridgeError> {
        Ok(Self {
            environment: optional(lookup, "environment"),
            correlation_table: required(lookup, "ddb_table")?,
            poll: PollLoopSettings {
                activity_arn: required(lookup, "sfn_activity_arn")?,
                worker_name: required(lookup, "sfn_worker_name")?,
                query_limit: parsed(lookup, "ddb_query_limit")?,
                job_capacity: parsed(lookup, "spark_glue_job_capacity")?,
                chain: chain_plan(lookup)?,
            },
        })
    }
}

/// Settings of the event-driven checker. The activity ARN doubles as the
/// correlation scope.
#[derive(Debug, Clone, PartialEq)]
pub struct GlueCheckerConfig {
    pub environment: Option<String>,
    pub activity_arn: String,
    pub correlation_table: String,
    pub chain: Option<CheckerChain>,
}

/// Chaining settings of the checker; the capacity is only needed to submit
/// the second stage.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckerChain {
    pub plan: ChainPlan,
    pub job_capacity: f64,
}

impl GlueCheckerConfig {
    pub fn from_env(lookup: EnvLookup<'_>) -> Result<Self, BridgeError> {
        let chain = match chain_plan(lookup)? {
            Some(plan) => Some(CheckerChain {
                plan,
                job_capacity: parsed(lookup, "spark_glue_job_capacity")?,
            }),
            None => None,
        };

        Ok(Self {
            environment: optional(lookup, "environment"),
            activity_arn: required(lookup, "sfn_activity_arn")?,
            correlation_table: required(lookup, "ddb_table")?,
            chain,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRunnerConfig {
    pub environment: Option<String>,
    pub state_machine_arn: String,
    pub jobs: FirstStageJobs,
    pub pipeline_runs_table: String,
}

impl StepRunnerConfig {
    pub fn from_env(lookup: EnvLookup<'_>) -> Result<Self, BridgeError> {
        Ok(Self {
            environment: optional(lookup, "environment"),
            state_machine_arn: required(lookup, "sfn_glue_name")?,
            jobs: FirstStageJobs {
                spark_job: required(lookup, "glue_emr_job_name")?,
                python_shell_job: required(lookup, "glue_pyshell_job_name")?,
            },
            pipeline_runs_table: optional(lookup, "pipeline_runs_table")
                .unwrap_or_else(|| DEFAULT_PIPELINE_RUNS_TABLE.to_string()),
        })
    }
}

fn optional(lookup: EnvLookup<'_>, name: &str) -> Option<String> {
    lookup(name).filter(|value| !value.trim().is_empty())
}

fn required(lookup: EnvLookup<'_>, name: &str) -> Result<String, BridgeError> {
    optional(lookup, name).ok_or_else(|| BridgeError::Configuration(name.to_string()))
}

fn parsed<T>(lookup: EnvLookup<'_>, name: &str) -> Result<T, BridgeError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    required(lookup, name)?
        .trim()
        .parse()
        .map_err(|error: T::Err| BridgeError::InvalidConfiguration {
            name: name.to_string(),
            message: error.to_string(),
        })
}

fn chain_plan(lookup: EnvLookup<'_>) -> Result<Option<ChainPlan>, BridgeError> {
    match (
        optional(lookup, "chain_first_stage_job"),
        optional(lookup, "chain_second_stage_job"),
    ) {
        (Some(first_stage), Some(second_stage)) => Ok(Some(ChainPlan {
            first_stage,
            second_stage,
        })),
        (None, None) => Ok(None),
        (Some(_), None) | (None, Some(_)) => Err(BridgeError::InvalidConfiguration {
            name: "chain_first_stage_job/chain_second_stage_job".to_string(),
            message: "both stages must be set to enable chaining".to_string(),
        }),
    }
}
