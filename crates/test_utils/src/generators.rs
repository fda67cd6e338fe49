//! Property-Based Test Generators
//!
//! proptest strategies producing claims that satisfy the creation rules,
//! then walked into an arbitrary review status.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use core_kernel::{ClaimId, Currency, EventId, Money, UserId};
use domain_directory::{Actor, CategoryFlags, Event, ExpenseCategory, Role};
use domain_reimbursement::{BudgetPolicy, ClaimStatus, NewExpenseItem, ReimbursementClaim};

use crate::builders::{EventBuilder, NewClaimBuilder};
use crate::fixtures::{receipt, Outcome};

/// Strategy for expense categories
pub fn category_strategy() -> impl Strategy<Value = ExpenseCategory> {
    prop_oneof![
        Just(ExpenseCategory::Accommodation),
        Just(ExpenseCategory::Transportation),
        Just(ExpenseCategory::Meals),
        Just(ExpenseCategory::Other),
    ]
}

/// Strategy for claim statuses
pub fn claim_status_strategy() -> impl Strategy<Value = ClaimStatus> {
    prop_oneof![
        Just(ClaimStatus::Pending),
        Just(ClaimStatus::Approved),
        Just(ClaimStatus::Rejected),
        Just(ClaimStatus::NeedsClarification),
    ]
}

/// Strategy for positive whole-rupiah amounts
pub fn idr_amount_strategy() -> impl Strategy<Value = Money> {
    (1i64..=25_000_000i64).prop_map(|rupiah| Money::from_minor(rupiah, Currency::IDR))
}

/// Strategy for one valid expense line
pub fn expense_item_strategy() -> impl Strategy<Value = NewExpenseItem> {
    (category_strategy(), idr_amount_strategy(), 0u32..1000).prop_map(|(category, amount, n)| {
        NewExpenseItem::new(category, amount, format!("{} {n}", category.label()), receipt(&format!("{n}.jpg")))
    })
}

/// Strategy for a non-empty list of expense lines
pub fn expense_items_strategy() -> impl Strategy<Value = Vec<NewExpenseItem>> {
    prop::collection::vec(expense_item_strategy(), 1..8)
}

/// Strategy for submission instants across 2025
pub fn submitted_at_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..365 * 24 * 3600).prop_map(|secs| Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(secs))
}

fn open_event() -> Event {
    EventBuilder::new()
        .with_categories(CategoryFlags::all())
        .build_event(EventId::new(), UserId::new())
}

fn outcome_for(status: ClaimStatus) -> Outcome {
    match status {
        ClaimStatus::Pending => Outcome::Pending,
        ClaimStatus::Approved => Outcome::Approved,
        ClaimStatus::Rejected => Outcome::Rejected,
        ClaimStatus::NeedsClarification => Outcome::NeedsClarification,
    }
}

/// Strategy for a valid claim in an arbitrary status
///
/// Submitters are drawn from a small pool so per-user buckets collect more
/// than one claim.
pub fn claim_strategy() -> impl Strategy<Value = ReimbursementClaim> {
    let submitters: Vec<UserId> = (0..3).map(|_| UserId::new()).collect();
    let event = open_event();
    let validator = Actor::new(UserId::new(), Role::Validator);
    (
        expense_items_strategy(),
        claim_status_strategy(),
        submitted_at_strategy(),
        0usize..3,
    )
        .prop_map(move |(items, status, at, who)| {
            let submitter = Actor::new(submitters[who], Role::User);
            let input = NewClaimBuilder::new(event.id).with_items(items).build();
            let claim = ReimbursementClaim::submit(
                ClaimId::new_v7(),
                &submitter,
                &event,
                input,
                Currency::IDR,
                BudgetPolicy::Enforce,
                at,
            )
            .expect("generated claim is valid");
            outcome_for(status).apply(claim, &validator, at)
        })
}

/// Strategy for a collection of claims
pub fn claims_strategy(max: usize) -> impl Strategy<Value = Vec<ReimbursementClaim>> {
    prop::collection::vec(claim_strategy(), 0..max)
}
