use crate::types::AxisGroup;
use thiserror::Error;

/// Collector error types
#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("required sensor unavailable: {0}")]
    MissingSensor(AxisGroup),

    #[error("measurement already in progress")]
    AlreadyMeasuring,

    #[error("no measurement in progress")]
    NotMeasuring,

    #[error("invalid session state: {0}")]
    InvalidState(String),

    #[error("export failed: {0}")]
    Export(#[from] csv::Error),

    #[error("export I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, CollectorError>;
