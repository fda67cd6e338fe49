//! Core Kernel - Foundational types and utilities for the reimbursement system
//!
//! This crate provides the building blocks shared by the lifecycle and reporting engines:
//! - Money types with precise decimal arithmetic
//! - Date ranges and timezone-aware month bucketing
//! - Strongly-typed identifiers
//! - Collaborator ports (record store, file store) and their error type

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod error;
pub mod ports;
pub mod store;

pub use money::{format_grouped_amount, Money, Currency, MoneyError};
pub use temporal::{DateRange, TimeRange, Timezone, YearMonth, TemporalError};
pub use identifiers::{
    ClaimId, ExpenseItemId, EventId, UserId, ClarificationId, ReceiptRef,
};
pub use error::CoreError;
pub use ports::{
    PortError, DomainPort, AdapterHealth, HealthCheckable, HealthCheckResult,
};
pub use store::{
    Collection, StoredRecord, Versioned, RecordFilter, RecordStore, FileStore, StoredFile,
};
