pub mod aws;
pub mod correlation_store;
pub mod job_engine;
pub mod object_store;
pub mod run_ledger;
pub mod workflow;
