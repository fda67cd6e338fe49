//! Event and user DTOs

use serde::Deserialize;

use domain_directory::{EventStatus, Role};

#[derive(Debug, Default, Deserialize)]
pub struct EventListQuery {
    pub status: Option<EventStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub role: Option<Role>,
}

/// Optional compare-and-set version for directory updates
#[derive(Debug, Default, Deserialize)]
pub struct VersionQuery {
    pub version: Option<u64>,
}
