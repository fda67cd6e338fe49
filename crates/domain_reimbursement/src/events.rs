//! Domain events for the claim aggregate
//!
//! Recorded by [`crate::ReimbursementClaim`] as transitions succeed and drained
//! by the service after the write is accepted, for the audit log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{ClaimId, ClarificationId, ExpenseItemId, Money, UserId};

use crate::status::ItemStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClaimEvent {
    Submitted {
        claim_id: ClaimId,
        submitted_by: UserId,
        total: Money,
        timestamp: DateTime<Utc>,
    },

    /// Total is above the event ceiling but the budget policy only warns
    BudgetOverrun {
        claim_id: ClaimId,
        total: Money,
        limit: Money,
    },

    Resubmitted {
        claim_id: ClaimId,
        supersedes: ClaimId,
        timestamp: DateTime<Utc>,
    },

    Approved {
        claim_id: ClaimId,
        approved_by: UserId,
        approved_amount: Money,
        timestamp: DateTime<Utc>,
    },

    Rejected {
        claim_id: ClaimId,
        rejected_by: UserId,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    ClarificationRequested {
        claim_id: ClaimId,
        clarification_id: ClarificationId,
        requested_by: UserId,
        flagged_items: Vec<ExpenseItemId>,
        timestamp: DateTime<Utc>,
    },

    ClarificationAnswered {
        claim_id: ClaimId,
        clarification_id: ClarificationId,
        timestamp: DateTime<Utc>,
    },

    ItemDecided {
        claim_id: ClaimId,
        item_id: ExpenseItemId,
        status: ItemStatus,
        decided_by: UserId,
        timestamp: DateTime<Utc>,
    },
}

impl ClaimEvent {
    pub fn claim_id(&self) -> ClaimId {
        match self {
            ClaimEvent::Submitted { claim_id, .. }
            | ClaimEvent::BudgetOverrun { claim_id, .. }
            | ClaimEvent::Resubmitted { claim_id, .. }
            | ClaimEvent::Approved { claim_id, .. }
            | ClaimEvent::Rejected { claim_id, .. }
            | ClaimEvent::ClarificationRequested { claim_id, .. }
            | ClaimEvent::ClarificationAnswered { claim_id, .. }
            | ClaimEvent::ItemDecided { claim_id, .. } => *claim_id,
        }
    }

    /// Short machine name used as the `event` field in logs
    pub fn name(&self) -> &'static str {
        match self {
            ClaimEvent::Submitted { .. } => "claim_submitted",
            ClaimEvent::BudgetOverrun { .. } => "budget_overrun",
            ClaimEvent::Resubmitted { .. } => "claim_resubmitted",
            ClaimEvent::Approved { .. } => "claim_approved",
            ClaimEvent::Rejected { .. } => "claim_rejected",
            ClaimEvent::ClarificationRequested { .. } => "clarification_requested",
            ClaimEvent::ClarificationAnswered { .. } => "clarification_answered",
            ClaimEvent::ItemDecided { .. } => "item_decided",
        }
    }
}
