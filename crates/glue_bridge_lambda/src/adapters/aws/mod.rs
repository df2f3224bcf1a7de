//! AWS SDK backed implementations of the adapter traits.
//!
//! The traits are synchronous so handlers stay plain functions; each call
//! blocks the current worker thread on the SDK future, which requires the
//! multi-thread tokio runtime the Lambda binaries run on.

pub mod dynamodb;
pub mod glue;
pub mod s3;
pub mod step_functions;

use std::future::Future;

use aws_smithy_types::error::display::DisplayErrorContext;
use aws_smithy_types::error::metadata::ProvideErrorMetadata;

use crate::error::ServiceError;

pub(crate) fn block_on<F: Future>(future: F) -> F::Output {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

pub(crate) fn service_error<E>(operation: &str, error: E) -> ServiceError
where
    E: ProvideErrorMetadata + std::error::Error,
{
    let message = format!("{operation} failed: {}", DisplayErrorContext(&error));
    match error.code() {
        Some("AccessDenied" | "AccessDeniedException") => ServiceError::AccessDenied(message),
        Some(
            "NoSuchKey" | "NotFound" | "EntityNotFoundException" | "ResourceNotFoundException",
        ) => ServiceError::NotFound(message),
        Some("ConditionalCheckFailedException") => ServiceError::ConditionFailed(message),
        _ => ServiceError::Service(message),
    }
}
