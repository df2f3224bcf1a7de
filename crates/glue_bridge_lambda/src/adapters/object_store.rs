use crate::error::ServiceError;
use crate::runtime::object_location::ObjectLocation;

pub trait SnapshotStore {
    /// Succeeds when the object exists and is readable.
    fn check_object(&self, location: &ObjectLocation) -> Result<(), ServiceError>;
}
