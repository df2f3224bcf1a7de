use crate::error::BridgeError;
use crate::handlers::submitter::JobSubmitter;
use crate::runtime::contract::{short_run_id, JobArguments, PipelineSubmission};

/// Two-stage pipeline: a successful `first_stage` run feeds its arguments to
/// `second_stage`. The chain never extends past the second stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainPlan {
    pub first_stage: String,
    pub second_stage: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    First,
    Second,
}

impl ChainPlan {
    pub fn stage_of(&self, job_name: &str) -> Option<Stage> {
        if job_name == self.first_stage {
            Some(Stage::First)
        } else if job_name == self.second_stage {
            Some(Stage::Second)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChainOutcome {
    Dispatched { job_name: String, job_run_id: String },
    FinalStage,
    NotInChain,
    NoForwardableArguments,
    DetailUnavailable(BridgeError),
    SubmissionFailed(BridgeError),
}

pub struct ChainDispatcher<'a> {
    plan: &'a ChainPlan,
    submitter: &'a JobSubmitter<'a>,
    capacity: f64,
}

impl<'a> ChainDispatcher<'a> {
    pub fn new(plan: &'a ChainPlan, submitter: &'a JobSubmitter<'a>, capacity: f64) -> Self {
        Self {
            plan,
            submitter,
            capacity,
        }
    }

    pub fn plan(&self) -> &'a ChainPlan {
        self.plan
    }

    /// Chains a run that reported SUCCEEDED, looking its arguments up first.
    pub fn on_success(&self, job_name: &str, job_run_id: &str) -> ChainOutcome {
        if self.plan.stage_of(job_name) != Some(Stage::First) {
            return self.skip(job_name, job_run_id);
        }

        match self.submitter.engine().get_job_run(job_name, job_run_id) {
            Ok(detail) => self.forward(job_name, job_run_id, &detail.arguments),
            Err(source) => {
                tracing::error!(
                    job_name,
                    job_run_id,
                    error = %source,
                    "Unable to read arguments of finished job run {}",
                    short_run_id(job_run_id)
                );
                ChainOutcome::DetailUnavailable(BridgeError::JobStatus {
                    job_name: job_name.to_string(),
                    job_run_id: job_run_id.to_string(),
                    source,
                })
            }
        }
    }

    /// Chains a run whose arguments are already known.
    pub fn on_success_with_arguments(
        &self,
        job_name: &str,
        job_run_id: &str,
        arguments: &JobArguments,
    ) -> ChainOutcome {
        if self.plan.stage_of(job_name) != Some(Stage::First) {
            return self.skip(job_name, job_run_id);
        }
        self.forward(job_name, job_run_id, arguments)
    }

    fn skip(&self, job_name: &str, job_run_id: &str) -> ChainOutcome {
        match self.plan.stage_of(job_name) {
            Some(Stage::Second) => {
                tracing::info!(
                    job_name,
                    job_run_id,
                    "Final stage job run {} finished, pipeline complete",
                    short_run_id(job_run_id)
                );
                ChainOutcome::FinalStage
            }
            _ => ChainOutcome::NotInChain,
        }
    }

    fn forward(&self, job_name: &str, job_run_id: &str, arguments: &JobArguments) -> ChainOutcome {
        if arguments.is_empty() {
            tracing::error!(
                job_name,
                job_run_id,
                "finished job yielded no forwardable arguments"
            );
            return ChainOutcome::NoForwardableArguments;
        }

        let submission = PipelineSubmission {
            job_name: self.plan.second_stage.clone(),
            arguments: arguments.clone(),
            capacity: self.capacity,
        };

        match self.submitter.submit(&submission, None) {
            Ok(next_run_id) => {
                tracing::info!(
                    job_name,
                    job_run_id,
                    next_job_name = %submission.job_name,
                    next_job_run_id = %next_run_id,
                    "Chained {} into {}",
                    job_name,
                    submission.job_name
                );
                ChainOutcome::Dispatched {
                    job_name: submission.job_name,
                    job_run_id: next_run_id,
                }
            }
            Err(error) => ChainOutcome::SubmissionFailed(error),
        }
    }
}
