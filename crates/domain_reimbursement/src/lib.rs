//! Reimbursement Domain
//!
//! The claim lifecycle: submission, review, clarification and resubmission.
//!
//! # Claim lifecycle
//!
//! ```text
//! submit ──▶ pending ──approve──▶ approved
//!              │ ▲    ──reject───▶ rejected ──resubmit──▶ (new pending claim)
//!   request    │ │ respond
//! clarification▼ │
//!       needs_clarification
//! ```
//!
//! Approved and rejected are terminal. Every write is a compare-and-set on
//! the claim's stored version.

pub mod status;
pub mod item;
pub mod clarification;
pub mod claim;
pub mod events;
pub mod config;
pub mod error;
pub mod repository;
pub mod service;

pub use status::{ClaimStatus, ItemStatus};
pub use item::{ExpenseItem, ItemDecision, NewExpenseItem};
pub use clarification::{
    ClarificationInput, ClarificationReason, ClarificationRequest, ClarificationResponse, ClarificationRound,
};
pub use claim::{ClaimAction, NewClaim, ReimbursementClaim, ReviewDecision};
pub use events::ClaimEvent;
pub use config::{BudgetPolicy, LifecycleConfig};
pub use error::{ErrorKind, ReimbursementError};
pub use repository::{ClaimQuery, ClaimRepository};
pub use service::{Clock, ReimbursementService};
