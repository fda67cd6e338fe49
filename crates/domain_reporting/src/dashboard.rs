//! Dashboard statistics

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{EventId, Money};
use domain_reimbursement::ClaimStatus;

use crate::context::ReportContext;
use crate::rollup::Rollup;

/// One status row of the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusShare {
    pub status: ClaimStatus,
    pub label: String,
    pub count: usize,
    pub total_amount: Money,
    /// Share of the overall amount, rounded to whole percent
    pub share_percent: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventShare {
    pub event_id: EventId,
    pub event_name: String,
    pub count: usize,
    pub total_amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub claim_count: usize,
    pub total_amount: Money,
    pub approved_amount: Money,
    pub pending_amount: Money,
    pub rejected_amount: Money,
    /// Always the four statuses, in lifecycle order
    pub by_status: Vec<StatusShare>,
    /// Largest total first
    pub by_event: Vec<EventShare>,
}

/// `part / whole` as a whole percentage; zero when `whole` is zero
pub fn share_percent(part: Decimal, whole: Decimal) -> u32 {
    if whole.is_zero() {
        return 0;
    }
    (part / whole * Decimal::ONE_HUNDRED)
        .round()
        .to_u32()
        .unwrap_or(0)
}

impl DashboardStats {
    pub fn from_rollup(rollup: &Rollup, ctx: &ReportContext) -> Self {
        let overall = rollup.overall.total_amount.amount();

        let by_status = ClaimStatus::ALL
            .into_iter()
            .map(|status| {
                let sub = rollup.status(status);
                StatusShare {
                    status,
                    label: ctx.status_label(status),
                    count: sub.count,
                    total_amount: sub.total_amount,
                    share_percent: share_percent(sub.total_amount.amount(), overall),
                }
            })
            .collect();

        let mut by_event: Vec<EventShare> = rollup
            .by_event
            .iter()
            .map(|(id, sub)| EventShare {
                event_id: *id,
                event_name: ctx.event_label(*id),
                count: sub.count,
                total_amount: sub.total_amount,
            })
            .collect();
        by_event.sort_by(|a, b| {
            b.total_amount
                .amount()
                .cmp(&a.total_amount.amount())
                .then_with(|| a.event_name.cmp(&b.event_name))
        });

        // claims waiting on the submitter are still open money
        let open = rollup
            .status(ClaimStatus::Pending)
            .total_amount
            .amount()
            + rollup.status(ClaimStatus::NeedsClarification).total_amount.amount();

        Self {
            claim_count: rollup.overall.count,
            total_amount: rollup.overall.total_amount,
            approved_amount: rollup.status(ClaimStatus::Approved).approved_amount,
            pending_amount: Money::new(open, rollup.currency),
            rejected_amount: rollup.status(ClaimStatus::Rejected).total_amount,
            by_status,
            by_event,
        }
    }
}
