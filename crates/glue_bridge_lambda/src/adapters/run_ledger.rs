use crate::error::ServiceError;
use crate::runtime::pipeline::PipelineRunRecord;

pub trait RunLedger {
    fn record_run(&self, record: &PipelineRunRecord) -> Result<(), ServiceError>;
}
