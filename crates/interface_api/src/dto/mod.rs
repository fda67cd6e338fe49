//! Request and response bodies

pub mod claims;
pub mod directory;
pub mod reports;
