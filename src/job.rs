//! Jobs: requests, persisted status records, and the retry schedule.

pub mod record;
pub mod request;
pub mod schedule;
pub mod store;

pub use record::{JobRecord, JobStatus, JobStatusView};
pub use request::{JobContent, JobParams, JobRequest};
pub use schedule::{backoff_delay, due_jobs, is_due, MAX_JOB_ATTEMPTS};
pub use store::{JobStatusStore, MemoryJobStore, SledJobStore};
