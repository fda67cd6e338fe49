//! Directory domain errors

use thiserror::Error;

use core_kernel::PortError;

/// Errors that can occur in the directory domain
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Event or user with the given id was not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Invalid event or user data
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The caller may not perform this operation
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The acting user exists but has been deactivated
    #[error("User {0} is inactive")]
    InactiveUser(String),

    /// A user with this email already exists
    #[error("Duplicate email: {0}")]
    DuplicateEmail(String),

    /// The record changed since it was read
    #[error("{id} changed since it was read (expected version {expected}, found {actual})")]
    StaleState { id: String, expected: u64, actual: u64 },

    /// A stored document could not be decoded
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    /// The record store failed
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[source] PortError),
}

impl DirectoryError {
    pub fn validation(message: impl Into<String>) -> Self {
        DirectoryError::Validation(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        DirectoryError::Unauthorized(message.into())
    }

    pub fn event_not_found(id: impl std::fmt::Display) -> Self {
        DirectoryError::NotFound {
            entity: "event",
            id: id.to_string(),
        }
    }

    pub fn user_not_found(id: impl std::fmt::Display) -> Self {
        DirectoryError::NotFound {
            entity: "user",
            id: id.to_string(),
        }
    }
}

impl From<PortError> for DirectoryError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound { entity_type, id } => DirectoryError::NotFound {
                entity: if entity_type == "events" { "event" } else { "user" },
                id,
            },
            PortError::VersionConflict { id, expected, actual } => {
                DirectoryError::StaleState { id, expected, actual }
            }
            PortError::Transformation { message } => DirectoryError::CorruptRecord(message),
            PortError::Conflict { message } => DirectoryError::Validation(message),
            other => DirectoryError::StorageUnavailable(other),
        }
    }
}
