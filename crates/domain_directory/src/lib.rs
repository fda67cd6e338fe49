//! Directory Domain
//!
//! Reference data managed by administrators: the events claims are filed
//! against and the users who file, review and administer them.
//!
//! # Roles
//!
//! - **admin**: maintains events and users, may also review claims
//! - **validator**: reviews claims (approve, reject, request clarification)
//! - **user**: submits claims and answers clarification requests

pub mod category;
pub mod event;
pub mod user;
pub mod error;
pub mod repository;
pub mod service;

pub use category::ExpenseCategory;
pub use event::{CategoryFlags, Event, EventStatus, EventUpdate, NewEvent};
pub use user::{Actor, NewUser, Role, User, UserStatus, UserUpdate};
pub use error::DirectoryError;
pub use repository::{EventRepository, UserRepository};
pub use service::DirectoryService;
