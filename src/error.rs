use thiserror::Error;

#[derive(Error, Debug)]
pub enum RevenueDashboardError {
    #[error("Invalid fiscal year label '{0}': expected 'YYYY/YYYY' with consecutive years")]
    InvalidFiscalYearLabel(String),

    #[error("Invalid calendar date: {year}-{month:02}-{day:02}")]
    InvalidDate { year: i32, month: u32, day: u32 },

    #[error("Invalid month {0}: must be between 1 and 12")]
    InvalidMonth(u32),

    #[error("Invalid amount {0}: must be a finite, non-negative value")]
    InvalidAmount(f64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Record store error: {0}")]
    StoreError(String),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RevenueDashboardError>;
