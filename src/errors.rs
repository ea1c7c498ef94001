//! Errors surfaced by the example source.

use thiserror::Error;

use crate::database::StorageError;

/// Ways feedback can be given at the wrong moment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FeedbackMisuse {
    #[error("no value has been pulled yet")]
    NoDraw,

    #[error("the last value was replayed from storage, not generated")]
    Replayed,

    #[error("feedback was already given for the last value")]
    AlreadyResolved,
}

#[derive(Debug, Error)]
pub enum SourceError {
    /// The source cannot be built as configured
    #[error("Invalid example source configuration: {0}")]
    Configuration(String),

    #[error("Feedback given out of turn: {0}")]
    ContractViolation(#[from] FeedbackMisuse),

    #[error("Example storage failed: {0}")]
    Storage(#[from] StorageError),
}

impl SourceError {
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, SourceError::ContractViolation(_))
    }
}
