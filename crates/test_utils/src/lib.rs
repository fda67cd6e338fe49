//! Test Utilities Crate
//!
//! Shared test infrastructure for the reimbursement workspace.
//!
//! # Modules
//!
//! - `fixtures`: sample money, dates, the wired in-memory `TestWorld` and the
//!   reporting boundary fixture
//! - `builders`: builders for claim, event and user inputs
//! - `database`: PostgreSQL testcontainer helpers
//! - `assertions`: claim invariant assertions
//! - `generators`: proptest strategies

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
