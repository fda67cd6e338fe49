//! Single-pass rollups over claim records
//!
//! All sums here are on raw [`Money`] values. Nothing in this module formats
//! amounts; presentation happens in [`crate::export`] once aggregation is done.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use core_kernel::{Currency, EventId, Money, UserId};
use domain_reimbursement::{ClaimStatus, ReimbursementClaim};

use crate::error::ReportError;

/// Count and amounts over a set of claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtotal {
    pub count: usize,
    /// Sum of claim totals
    pub total_amount: Money,
    /// Sum of the approved items of those claims
    pub approved_amount: Money,
}

impl Subtotal {
    pub fn zero(currency: Currency) -> Self {
        Self {
            count: 0,
            total_amount: Money::zero(currency),
            approved_amount: Money::zero(currency),
        }
    }

    /// Adds one claim to the subtotal
    pub fn add(&mut self, claim: &ReimbursementClaim) -> Result<(), ReportError> {
        self.total_amount = self.total_amount.checked_add(&claim.total_amount())?;
        self.approved_amount = self.approved_amount.checked_add(&claim.approved_amount()?)?;
        self.count += 1;
        Ok(())
    }
}

/// Computes the subtotal of exactly the given claims
pub fn subtotal<'a, I>(claims: I, currency: Currency) -> Result<Subtotal, ReportError>
where
    I: IntoIterator<Item = &'a ReimbursementClaim>,
{
    claims.into_iter().try_fold(Subtotal::zero(currency), |mut acc, claim| {
        acc.add(claim)?;
        Ok(acc)
    })
}

/// Overall, per-status, per-event and per-user subtotals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rollup {
    pub currency: Currency,
    pub overall: Subtotal,
    /// Always holds all four statuses, zero-filled
    pub by_status: BTreeMap<ClaimStatus, Subtotal>,
    pub by_event: BTreeMap<EventId, Subtotal>,
    pub by_user: BTreeMap<UserId, Subtotal>,
}

impl Rollup {
    pub fn empty(currency: Currency) -> Self {
        Self {
            currency,
            overall: Subtotal::zero(currency),
            by_status: ClaimStatus::ALL
                .into_iter()
                .map(|s| (s, Subtotal::zero(currency)))
                .collect(),
            by_event: BTreeMap::new(),
            by_user: BTreeMap::new(),
        }
    }

    /// Builds the rollup in one pass over `claims`
    pub fn from_claims<'a, I>(claims: I, currency: Currency) -> Result<Self, ReportError>
    where
        I: IntoIterator<Item = &'a ReimbursementClaim>,
    {
        let mut rollup = Self::empty(currency);
        for claim in claims {
            rollup.add(claim)?;
        }
        Ok(rollup)
    }

    pub fn add(&mut self, claim: &ReimbursementClaim) -> Result<(), ReportError> {
        let currency = self.currency;
        self.overall.add(claim)?;
        self.by_status
            .entry(claim.status())
            .or_insert_with(|| Subtotal::zero(currency))
            .add(claim)?;
        self.by_event
            .entry(claim.event_id())
            .or_insert_with(|| Subtotal::zero(currency))
            .add(claim)?;
        self.by_user
            .entry(claim.submitted_by())
            .or_insert_with(|| Subtotal::zero(currency))
            .add(claim)?;
        Ok(())
    }

    pub fn status(&self, status: ClaimStatus) -> Subtotal {
        self.by_status
            .get(&status)
            .copied()
            .unwrap_or_else(|| Subtotal::zero(self.currency))
    }
}
