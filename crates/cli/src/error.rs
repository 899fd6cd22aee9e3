use engine_core::error::PipelineError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse JSON input: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Import pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Invalid status filter: {0}")]
    InvalidStatusFilter(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}
