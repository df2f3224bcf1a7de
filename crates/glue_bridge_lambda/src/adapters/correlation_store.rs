use crate::error::ServiceError;
use crate::runtime::contract::{CorrelationKey, CorrelationRecord};

/// Persistent mapping from started job runs to the activity scope that owns them.
///
/// Writes are conditional so a key is never silently overwritten, and
/// `delete` reports the record it removed so that only one of several
/// concurrent resolvers acts on a given run.
pub trait CorrelationStore {
    fn put(&self, record: &CorrelationRecord) -> Result<(), ServiceError>;

    fn get(&self, key: &CorrelationKey) -> Result<Option<CorrelationRecord>, ServiceError>;

    /// Returns at most `limit` records of the scope.
    fn query_scope(&self, scope_id: &str, limit: i32)
        -> Result<Vec<CorrelationRecord>, ServiceError>;

    /// Deletes the record, returning it if it was still present.
    fn delete(&self, key: &CorrelationKey) -> Result<Option<CorrelationRecord>, ServiceError>;
}
