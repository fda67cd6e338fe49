//! Reporting errors

use thiserror::Error;

use core_kernel::{MoneyError, TemporalError};
use domain_directory::DirectoryError;
use domain_reimbursement::{ErrorKind, ReimbursementError};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Invalid report filter: {0}")]
    InvalidFilter(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Amounts that cannot be summed together
    #[error("Aggregation failed: {0}")]
    Aggregation(#[from] MoneyError),

    /// Loading the records to report on failed
    #[error(transparent)]
    Source(#[from] ReimbursementError),
}

impl ReportError {
    pub fn invalid_filter(message: impl Into<String>) -> Self {
        ReportError::InvalidFilter(message.into())
    }

    /// True when the failure came from the record store and a retry may help
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReportError::Source(e) if e.is_retryable())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ReportError::InvalidFilter(_) | ReportError::Aggregation(_) => ErrorKind::Validation,
            ReportError::Unauthorized(_) => ErrorKind::Authorization,
            ReportError::Source(e) => e.kind(),
        }
    }
}

impl From<TemporalError> for ReportError {
    fn from(err: TemporalError) -> Self {
        ReportError::InvalidFilter(err.to_string())
    }
}

impl From<DirectoryError> for ReportError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Unauthorized(m) => ReportError::Unauthorized(m),
            DirectoryError::InactiveUser(id) => ReportError::Unauthorized(format!("user {id} is inactive")),
            other => ReportError::Source(other.into()),
        }
    }
}
