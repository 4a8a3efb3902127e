mod poll;
mod status;

pub use poll::{AsyncJobWaiter, StatusSource, WaitError, WaitPolicy};
pub use status::{
    FlowDefinitionRecord, FlowStatus, HumanLoopRecord, HumanLoopStatus, JobStatus,
    ProcessingJobRecord,
};
