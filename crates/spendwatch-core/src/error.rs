use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Insufficient data: need at least {required} records, found {found}")]
    InsufficientData { required: usize, found: usize },
    #[error("Training failed: {0}")]
    TrainingFailure(String),
    #[error("Analysis cancelled")]
    Cancelled,
    #[error("Invalid parameter: {name} - {reason}")]
    InvalidParameter { name: String, reason: String },
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Serialization error: {0}")]
    Serde(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CoreError {
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// `true` when the caller should gather more history rather than retry.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, CoreError::InsufficientData { .. })
    }
}
