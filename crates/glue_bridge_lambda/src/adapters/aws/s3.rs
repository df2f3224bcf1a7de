use super::{block_on, service_error};
use crate::adapters::object_store::SnapshotStore;
use crate::error::ServiceError;
use crate::runtime::object_location::ObjectLocation;

pub struct S3SnapshotStore {
    client: aws_sdk_s3::Client,
}

impl S3SnapshotStore {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

impl SnapshotStore for S3SnapshotStore {
    fn check_object(&self, location: &ObjectLocation) -> Result<(), ServiceError> {
        block_on(
            self.client
                .get_object()
                .bucket(&location.bucket)
                .key(&location.key)
                .send(),
        )
        .map(|_| ())
        .map_err(|error| service_error("GetObject", error))
    }
}
