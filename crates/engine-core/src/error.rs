use intake::error::IntakeError;
use model::batch::status::BatchStatus;
use thiserror::Error;

/// Batch-level failures. Row-level trouble during commit and rollback is
/// carried in outcome payloads instead of surfacing here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Operation requires batch state {expected}, found {actual}")]
    InvalidState {
        expected: String,
        actual: BatchStatus,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("A template named '{0}' already exists for this tenant")]
    DuplicateTemplate(String),

    #[error("Batch has already been rolled back")]
    AlreadyRolledBack,

    #[error("Mapping references unknown fields: {}", .0.join(", "))]
    UnknownFields(Vec<String>),

    #[error(transparent)]
    Intake(#[from] IntakeError),

    #[error("Store error: {0}")]
    Store(String),
}

impl PipelineError {
    pub fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
        PipelineError::NotFound(format!("{what} {id}"))
    }

    pub fn invalid_state(expected: impl Into<String>, actual: BatchStatus) -> Self {
        PipelineError::InvalidState {
            expected: expected.into(),
            actual,
        }
    }
}

impl From<sled::Error> for PipelineError {
    fn from(err: sled::Error) -> Self {
        PipelineError::Store(err.to_string())
    }
}

impl From<bincode::Error> for PipelineError {
    fn from(err: bincode::Error) -> Self {
        PipelineError::Store(err.to_string())
    }
}
