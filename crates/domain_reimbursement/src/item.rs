//! Expense items
//!
//! One cost line of a claim. Items carry their own review status so a
//! validator can approve or reject lines individually before deciding the
//! claim as a whole.

use serde::{Deserialize, Serialize};

use core_kernel::{Currency, ExpenseItemId, Money, ReceiptRef, UserId};
use domain_directory::ExpenseCategory;

use crate::error::ReimbursementError;
use crate::status::ItemStatus;

/// Input for one expense line of a new claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpenseItem {
    pub category: ExpenseCategory,
    pub amount: Money,
    #[serde(default)]
    pub description: String,
    pub receipt_ref: ReceiptRef,
}

impl NewExpenseItem {
    pub fn new(category: ExpenseCategory, amount: Money, description: impl Into<String>, receipt_ref: ReceiptRef) -> Self {
        Self {
            category,
            amount,
            description: description.into(),
            receipt_ref,
        }
    }

    pub(crate) fn into_item(self, id: ExpenseItemId, currency: Currency) -> Result<ExpenseItem, ReimbursementError> {
        if self.amount.currency() != currency {
            return Err(ReimbursementError::validation(format!(
                "expense amounts must be in {}, got {}",
                currency,
                self.amount.currency()
            )));
        }
        if !self.amount.is_positive() {
            return Err(ReimbursementError::validation(format!(
                "expense amount must be positive, got {}",
                self.amount
            )));
        }
        if !self.amount.is_whole_minor() {
            return Err(ReimbursementError::validation(format!(
                "expense amount {} has digits below the smallest unit",
                self.amount
            )));
        }
        if self.receipt_ref.as_str().trim().is_empty() {
            return Err(ReimbursementError::validation("every expense item needs a receipt"));
        }
        Ok(ExpenseItem {
            id,
            category: self.category,
            amount: self.amount,
            description: self.description.trim().to_string(),
            receipt_ref: self.receipt_ref,
            status: ItemStatus::Pending,
            note: None,
            decided_by: None,
        })
    }
}

/// Per-item verdict a reviewer can record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemDecision {
    Approve,
    Reject,
}

impl ItemDecision {
    pub fn status(&self) -> ItemStatus {
        match self {
            ItemDecision::Approve => ItemStatus::Approved,
            ItemDecision::Reject => ItemStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseItem {
    pub id: ExpenseItemId,
    pub category: ExpenseCategory,
    pub amount: Money,
    pub description: String,
    pub receipt_ref: ReceiptRef,
    pub status: ItemStatus,
    pub note: Option<String>,
    /// Reviewer who set `status` explicitly; `None` when it was defaulted
    pub decided_by: Option<UserId>,
}

impl ExpenseItem {
    pub fn is_pending(&self) -> bool {
        self.status == ItemStatus::Pending
    }

    pub fn is_approved(&self) -> bool {
        self.status == ItemStatus::Approved
    }

    pub fn is_rejected(&self) -> bool {
        self.status == ItemStatus::Rejected
    }
}
