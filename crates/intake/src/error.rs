use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("File of {actual} bytes exceeds the {limit} byte ceiling")]
    TooLarge { actual: u64, limit: u64 },

    #[error("File exceeds the {limit} row ceiling")]
    TooManyRows { limit: u64 },

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("Error reading row {row}: {message}")]
    Read { row: u64, message: String },
}
