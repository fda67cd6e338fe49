//! Reimbursement domain errors
//!
//! Validation and transition failures are returned as values so callers can
//! render field- or action-level feedback. Storage failures travel in their
//! own variant so callers can offer a retry instead of a form error.

use thiserror::Error;

use core_kernel::{Money, PortError};
use domain_directory::{DirectoryError, ExpenseCategory};

use crate::claim::ClaimAction;
use crate::status::ClaimStatus;

/// Errors that can occur in the reimbursement domain
#[derive(Debug, Error)]
pub enum ReimbursementError {
    #[error("A claim must contain at least one expense item")]
    EmptyClaim,

    #[error("Category {category} is not allowed for event {event}")]
    DisallowedCategory { category: ExpenseCategory, event: String },

    #[error("Claim total {total} exceeds the event budget of {limit}")]
    BudgetExceeded { total: Money, limit: Money },

    #[error("Cannot {action}: claim is {from}")]
    InvalidTransition { from: ClaimStatus, action: ClaimAction },

    #[error("Claim {id} changed since it was read (expected version {expected}, found {actual})")]
    StaleState { id: String, expected: u64, actual: u64 },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Event {0} is still referenced by claims")]
    EventInUse(String),

    #[error("Stored record is corrupt: {0}")]
    CorruptRecord(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[source] PortError),
}

/// Coarse classification of a [`ReimbursementError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Transition,
    Concurrency,
    NotFound,
    Authorization,
    Storage,
}

impl ReimbursementError {
    pub fn validation(message: impl Into<String>) -> Self {
        ReimbursementError::Validation(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ReimbursementError::Unauthorized(message.into())
    }

    pub fn claim_not_found(id: impl std::fmt::Display) -> Self {
        ReimbursementError::NotFound {
            entity: "claim",
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ReimbursementError::EmptyClaim
            | ReimbursementError::DisallowedCategory { .. }
            | ReimbursementError::BudgetExceeded { .. }
            | ReimbursementError::Validation(_) => ErrorKind::Validation,
            ReimbursementError::InvalidTransition { .. } | ReimbursementError::EventInUse(_) => {
                ErrorKind::Transition
            }
            ReimbursementError::StaleState { .. } => ErrorKind::Concurrency,
            ReimbursementError::NotFound { .. } => ErrorKind::NotFound,
            ReimbursementError::Unauthorized(_) => ErrorKind::Authorization,
            ReimbursementError::CorruptRecord(_) | ReimbursementError::StorageUnavailable(_) => {
                ErrorKind::Storage
            }
        }
    }

    /// True when repeating the operation after a refetch may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ReimbursementError::StaleState { .. } | ReimbursementError::StorageUnavailable(_)
        )
    }
}

impl From<PortError> for ReimbursementError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::VersionConflict { id, expected, actual } => {
                ReimbursementError::StaleState { id, expected, actual }
            }
            PortError::NotFound { entity_type, id } => ReimbursementError::NotFound {
                entity: match entity_type.as_str() {
                    "events" | "event" => "event",
                    "users" | "user" => "user",
                    "receipt" => "receipt",
                    _ => "claim",
                },
                id,
            },
            PortError::Transformation { message } => ReimbursementError::CorruptRecord(message),
            other => ReimbursementError::StorageUnavailable(other),
        }
    }
}

impl From<DirectoryError> for ReimbursementError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound { entity, id } => ReimbursementError::NotFound { entity, id },
            DirectoryError::Validation(m) | DirectoryError::DuplicateEmail(m) => ReimbursementError::Validation(m),
            DirectoryError::Unauthorized(m) => ReimbursementError::Unauthorized(m),
            DirectoryError::InactiveUser(id) => {
                ReimbursementError::Unauthorized(format!("user {id} is inactive"))
            }
            DirectoryError::StaleState { id, expected, actual } => {
                ReimbursementError::StaleState { id, expected, actual }
            }
            DirectoryError::CorruptRecord(m) => ReimbursementError::CorruptRecord(m),
            DirectoryError::StorageUnavailable(e) => ReimbursementError::StorageUnavailable(e),
        }
    }
}
