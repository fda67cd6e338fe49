//! Custom Test Assertions
//!
//! Assertion helpers for claim invariants that give more meaningful failure
//! messages than bare `assert!`.

use core_kernel::Money;
use domain_reimbursement::{ClaimStatus, ReimbursementClaim};

/// Asserts that the claim total equals the sum of its items
pub fn assert_total_consistent(claim: &ReimbursementClaim) {
    let sum = Money::try_sum(claim.currency(), claim.items().iter().map(|i| &i.amount))
        .expect("items share the claim currency");
    assert_eq!(
        claim.total_amount(),
        sum,
        "Claim {} total {} differs from item sum {}",
        claim.id(),
        claim.total_amount(),
        sum
    );
}

/// Asserts that a decided claim left no item pending
pub fn assert_no_pending_items(claim: &ReimbursementClaim) {
    let pending: Vec<_> = claim.items().iter().filter(|i| i.is_pending()).map(|i| i.id).collect();
    assert!(
        pending.is_empty(),
        "Claim {} is {} but items {:?} are still pending",
        claim.id(),
        claim.status(),
        pending
    );
}

/// Asserts the claim status
pub fn assert_status(claim: &ReimbursementClaim, expected: ClaimStatus) {
    assert_eq!(
        claim.status(),
        expected,
        "Claim {} is {}, expected {}",
        claim.id(),
        claim.status(),
        expected
    );
}

/// Asserts two amounts are identical, currency included
pub fn assert_money_eq(actual: &Money, expected: &Money) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={}, expected={}",
        actual.currency(),
        expected.currency()
    );
    assert_eq!(
        actual.amount(),
        expected.amount(),
        "Amount mismatch: actual={}, expected={}",
        actual,
        expected
    );
}

/// Asserts a terminal claim accepts no review transition
pub fn assert_terminal(claim: &ReimbursementClaim) {
    assert!(
        claim.is_terminal(),
        "Claim {} is {}, expected a terminal status",
        claim.id(),
        claim.status()
    );
    assert_no_pending_items(claim);
}
