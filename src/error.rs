use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Ledger snapshot contains no usable transactions")]
    EmptyLedger,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid period bounds: start {start} is after end {end}")]
    InvalidPeriod { start: String, end: String },

    #[error("Date parse error: {0}")]
    DateError(String),

    #[error("History store error: {0}")]
    HistoryError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
