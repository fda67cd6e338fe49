//! Claims DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use core_kernel::{EventId, Money, UserId, Versioned};
use domain_reimbursement::{
    ClaimQuery, ClaimStatus, ClarificationInput, ItemDecision, NewExpenseItem, ReimbursementClaim,
    ReimbursementError,
};

/// Query string of `GET /claims`
#[derive(Debug, Default, Deserialize)]
pub struct ClaimListQuery {
    pub status: Option<ClaimStatus>,
    pub event_id: Option<EventId>,
    pub submitted_by: Option<UserId>,
}

impl From<ClaimListQuery> for ClaimQuery {
    fn from(q: ClaimListQuery) -> Self {
        ClaimQuery {
            status: q.status,
            submitted_by: q.submitted_by,
            event_id: q.event_id,
        }
    }
}

/// Body of a transition that needs nothing but the version last read
#[derive(Debug, Deserialize)]
pub struct VersionRequest {
    pub version: u64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RejectRequest {
    pub version: u64,
    #[validate(length(min = 1, max = 2000))]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ClarificationRequestBody {
    pub version: u64,
    #[serde(flatten)]
    pub input: ClarificationInput,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RespondRequest {
    pub version: u64,
    #[validate(length(min = 1, max = 4000))]
    pub message: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NoteRequest {
    pub version: u64,
    #[validate(length(max = 2000))]
    pub note: String,
}

#[derive(Debug, Deserialize)]
pub struct ItemDecisionRequest {
    pub version: u64,
    pub decision: ItemDecision,
    pub note: Option<String>,
}

/// Body of `POST /claims/:id/resubmit`; omitting `items` copies the old ones
#[derive(Debug, Default, Deserialize)]
pub struct ResubmitRequest {
    pub items: Option<Vec<NewExpenseItem>>,
}

/// Query string of `POST /receipts`
#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub file_name: String,
}

#[derive(Debug, Serialize)]
pub struct ReceiptUrlResponse {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    #[serde(flatten)]
    pub claim: ReimbursementClaim,
    pub approved_amount: Money,
    pub status_label: &'static str,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<Versioned<ReimbursementClaim>> for ClaimResponse {
    type Error = ReimbursementError;

    fn try_from(v: Versioned<ReimbursementClaim>) -> Result<Self, Self::Error> {
        Ok(Self {
            approved_amount: v.value.approved_amount()?,
            status_label: v.value.status().label(),
            version: v.version,
            created_at: v.created_at,
            updated_at: v.updated_at,
            claim: v.value,
        })
    }
}
