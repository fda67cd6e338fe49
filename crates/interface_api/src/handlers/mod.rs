//! Request handlers

pub mod claims;
pub mod directory;
pub mod health;
pub mod reports;

use std::str::FromStr;

use crate::error::ApiError;

/// Parses a path id, with or without its display prefix
pub(crate) fn parse_id<T: FromStr>(raw: &str, entity: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("malformed {entity} id: {raw}")))
}
