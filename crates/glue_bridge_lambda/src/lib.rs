//! AWS-oriented adapters and handlers for the Glue job bridge.
//!
//! This crate owns runtime integration details (Lambda handlers, Step
//! Functions / Glue / DynamoDB / S3 adapters, configuration and logging) and
//! re-exports the domain primitives of `glue_bridge_core` as `runtime`.

pub mod adapters;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;

pub use glue_bridge_core as runtime;
