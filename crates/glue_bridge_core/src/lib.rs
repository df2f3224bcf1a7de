//! Shared domain primitives for the Glue job bridge.
//!
//! This crate owns the correlation record model, job state classification,
//! inbound event decoding and the request/response contracts exchanged with
//! the workflow engine. It intentionally excludes AWS SDK and Lambda runtime
//! concerns, which live in `glue_bridge_lambda`.

pub mod contract;
pub mod events;
pub mod object_location;
pub mod pipeline;
pub mod task_input;
