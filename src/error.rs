//! Error types for the lexicast pipeline.
//!
//! Every pipeline failure is classified so the job boundary can decide whether to retry,
//! give up, or treat the request as an idempotent no-op.

use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// How the job boundary should treat an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Terminate immediately without consuming retry budget.
    Fatal,
    /// Transient; retried with backoff until the budget is exhausted.
    Retryable,
    /// The requested output already exists.
    Duplicate,
}

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Entity not found: {0}")]
    EntityMissing(String),

    #[error("Stale job: requested version {expected}, entity is now at {actual}")]
    StaleVersion { expected: String, actual: String },

    #[error("Output for this version is already ready")]
    DuplicateReady {
        manifest_ref: Option<String>,
        stitched_ref: Option<String>,
        unit_count: usize,
    },

    #[error("Nothing to generate: {0}")]
    EmptyPlan(String),

    #[error("Estimated cost ${estimated:.4} exceeds budget ${budget:.4}")]
    BudgetExceeded { estimated: f64, budget: f64 },

    #[error("Provider rejected request ({status}): {message}")]
    ProviderRejected { status: u16, message: String },

    #[error("Provider unavailable ({status}): {message}")]
    ProviderUnavailable { status: u16, message: String },

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    /// `retryable` is set when at least one lost unit failed transiently.
    #[error("{message}")]
    BatchFailed { message: String, retryable: bool },

    #[error("Unit {index} failed: {message}")]
    UnitFailed {
        index: usize,
        message: String,
        retryable: bool,
    },

    #[error("Job queue error: {0}")]
    QueueError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
}

impl PipelineError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PipelineError::DuplicateReady { .. } => ErrorClass::Duplicate,
            PipelineError::ProviderUnavailable { .. }
            | PipelineError::ProviderError(_)
            | PipelineError::Network(_)
            | PipelineError::Timeout(_)
            | PipelineError::Upload(_)
            | PipelineError::StorageError(_) => ErrorClass::Retryable,
            PipelineError::EntityMissing(_)
            | PipelineError::StaleVersion { .. }
            | PipelineError::EmptyPlan(_)
            | PipelineError::BudgetExceeded { .. }
            | PipelineError::ProviderRejected { .. }
            | PipelineError::ProviderNotConfigured(_)
            | PipelineError::BatchFailed { .. }
            | PipelineError::UnitFailed { .. }
            | PipelineError::QueueError(_)
            | PipelineError::ConfigError(_)
            | PipelineError::Serialization(_) => ErrorClass::Fatal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Retryable
    }

    /// Whether the job-level schedule should run the job again later. Batch and unit
    /// failures are rescheduled only when a transient error caused them.
    pub fn is_reschedulable(&self) -> bool {
        match self {
            PipelineError::BatchFailed { retryable, .. }
            | PipelineError::UnitFailed { retryable, .. } => *retryable,
            other => other.is_retryable(),
        }
    }

    /// Missing entity or version drift; the job ends as `stale`.
    pub fn is_stale(&self) -> bool {
        matches!(
            self,
            PipelineError::EntityMissing(_) | PipelineError::StaleVersion { .. }
        )
    }
}

impl From<config::ConfigError> for PipelineError {
    fn from(err: config::ConfigError) -> Self {
        PipelineError::ConfigError(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::IoError(std::io::Error::new(
            std::io::ErrorKind::Other,
            err.to_string(),
        ))
    }
}

impl From<sled::Error> for PipelineError {
    fn from(err: sled::Error) -> Self {
        PipelineError::StorageError(err.into())
    }
}
