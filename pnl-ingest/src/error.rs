use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("No columns to parse from file")]
    EmptyInput,

    #[error("Header row has no account column")]
    MissingAccountColumn,
}

pub type Result<T> = std::result::Result<T, IngestError>;
