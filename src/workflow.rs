//! Workflow engine: checkpointed steps over a durable step log, hosted by queue workers.

pub mod engine;
pub mod log;
pub mod queue;

pub use engine::WorkflowRun;
pub use log::{MemoryStepLog, RunRecord, RunStatus, SledStepLog, StepLog, StepRecord};
pub use queue::{JobHandler, JobQueue, QueueConfig, QueueStats};
