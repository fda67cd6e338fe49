//! Clarification rounds
//!
//! A validator may ask the submitter for more information. Each request and
//! its eventual answer form one round; rounds are appended and never
//! overwritten, so the claim carries its full question-and-answer history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{ClarificationId, ExpenseItemId, UserId};

/// Structured reason a validator can attach to a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClarificationReason {
    MissingReceipt,
    UnclearReceipt,
    AmountMismatch,
    InvalidDate,
    UnauthorizedExpense,
    ExceedsLimit,
    MissingDetails,
    Other,
}

impl ClarificationReason {
    pub fn label(&self) -> &'static str {
        match self {
            ClarificationReason::MissingReceipt => "Bukti pembayaran tidak ada",
            ClarificationReason::UnclearReceipt => "Bukti pembayaran tidak jelas",
            ClarificationReason::AmountMismatch => "Jumlah tidak sesuai dengan bukti",
            ClarificationReason::InvalidDate => "Tanggal tidak valid",
            ClarificationReason::UnauthorizedExpense => "Pengeluaran tidak diizinkan",
            ClarificationReason::ExceedsLimit => "Melebihi batas anggaran",
            ClarificationReason::MissingDetails => "Detail tidak lengkap",
            ClarificationReason::Other => "Lainnya",
        }
    }
}

/// What a validator sends when asking for clarification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClarificationInput {
    #[serde(default)]
    pub flagged_items: Vec<ExpenseItemId>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub reasons: Vec<ClarificationReason>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClarificationRequest {
    pub id: ClarificationId,
    pub requested_by: UserId,
    pub requested_at: DateTime<Utc>,
    pub message: Option<String>,
    pub flagged_items: Vec<ExpenseItemId>,
    pub reasons: Vec<ClarificationReason>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClarificationResponse {
    pub responded_by: UserId,
    pub responded_at: DateTime<Utc>,
    pub message: String,
}

/// One request and, once answered, its response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClarificationRound {
    pub request: ClarificationRequest,
    pub response: Option<ClarificationResponse>,
}

impl ClarificationRound {
    pub fn is_resolved(&self) -> bool {
        self.response.is_some()
    }
}
