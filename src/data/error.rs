//! Error types for history store operations

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HistoryError {
    #[error("Invalid entry: {reason}")]
    InvalidEntry { reason: String },

    #[error("Insufficient history for {benchmark}: {priors} prior point(s), at least 2 required")]
    InsufficientHistory { benchmark: String, priors: usize },
}

impl HistoryError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        HistoryError::InvalidEntry {
            reason: reason.into(),
        }
    }
}

/// Result type for history store operations
pub type Result<T> = std::result::Result<T, HistoryError>;
