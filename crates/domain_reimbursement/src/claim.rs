//! Reimbursement claim aggregate
//!
//! Every lifecycle operation is a method taking the acting identity and the
//! current instant. A method either mutates the claim and records a
//! [`ClaimEvent`], or returns an error and leaves the claim untouched.
//! Persisting the result (and detecting concurrent writers) is the job of
//! [`crate::ReimbursementService`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{ClaimId, ClarificationId, Currency, EventId, ExpenseItemId, Money, UserId};
use domain_directory::{Actor, Event};

use crate::clarification::{ClarificationInput, ClarificationRequest, ClarificationResponse, ClarificationRound};
use crate::config::BudgetPolicy;
use crate::error::ReimbursementError;
use crate::events::ClaimEvent;
use crate::item::{ExpenseItem, ItemDecision, NewExpenseItem};
use crate::status::{ClaimStatus, ItemStatus};

/// Operations that change a claim, used in transition errors and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimAction {
    Approve,
    Reject,
    RequestClarification,
    RespondToClarification,
    DecideItem,
    AnnotateItem,
    SetValidatorNote,
    Resubmit,
}

impl ClaimAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimAction::Approve => "approve",
            ClaimAction::Reject => "reject",
            ClaimAction::RequestClarification => "request clarification",
            ClaimAction::RespondToClarification => "respond to clarification",
            ClaimAction::DecideItem => "decide item",
            ClaimAction::AnnotateItem => "annotate item",
            ClaimAction::SetValidatorNote => "set validator note",
            ClaimAction::Resubmit => "resubmit",
        }
    }
}

impl fmt::Display for ClaimAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for submitting a claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewClaim {
    pub event_id: EventId,
    /// Day the expenses were incurred
    pub expense_date: NaiveDate,
    #[serde(default)]
    pub description: Option<String>,
    pub items: Vec<NewExpenseItem>,
}

/// Final verdict on a claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewDecision {
    pub outcome: ClaimStatus,
    pub decided_by: UserId,
    pub decided_at: DateTime<Utc>,
    pub reason: Option<String>,
}

/// A reimbursement claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReimbursementClaim {
    id: ClaimId,
    submitted_by: UserId,
    event_id: EventId,
    expense_date: NaiveDate,
    description: Option<String>,
    items: Vec<ExpenseItem>,
    /// Derived from `items`; kept in the document for readers of the raw store
    total_amount: Money,
    currency: Currency,
    status: ClaimStatus,
    submitted_at: DateTime<Utc>,
    #[serde(default)]
    clarifications: Vec<ClarificationRound>,
    validator_note: Option<String>,
    decision: Option<ReviewDecision>,
    /// The rejected claim this one was resubmitted from
    supersedes: Option<ClaimId>,
    #[serde(skip)]
    events: Vec<ClaimEvent>,
}

fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn sum_items(items: &[ExpenseItem], currency: Currency) -> Result<Money, ReimbursementError> {
    Money::try_sum(currency, items.iter().map(|i| &i.amount))
        .map_err(|e| ReimbursementError::validation(e.to_string()))
}

impl ReimbursementClaim {
    /// Validates and builds a new pending claim
    ///
    /// # Errors
    ///
    /// - `EmptyClaim` when `input.items` is empty
    /// - `DisallowedCategory` when an item's category is switched off for `event`
    /// - `BudgetExceeded` when the total exceeds the event ceiling and `budget_policy` is `Enforce`
    /// - `Validation` for bad amounts, missing receipts, a mismatched event or
    ///   an event budget in another currency
    pub fn submit(
        id: ClaimId,
        submitter: &Actor,
        event: &Event,
        input: NewClaim,
        currency: Currency,
        budget_policy: BudgetPolicy,
        now: DateTime<Utc>,
    ) -> Result<Self, ReimbursementError> {
        if input.event_id != event.id {
            return Err(ReimbursementError::validation(format!(
                "claim references {} but was checked against {}",
                input.event_id, event.id
            )));
        }
        if input.items.is_empty() {
            return Err(ReimbursementError::EmptyClaim);
        }
        if let Some(item) = input.items.iter().find(|i| !event.allows(i.category)) {
            return Err(ReimbursementError::DisallowedCategory {
                category: item.category,
                event: event.name.clone(),
            });
        }

        let items = input
            .items
            .into_iter()
            .map(|i| i.into_item(ExpenseItemId::new_v7(), currency))
            .collect::<Result<Vec<_>, _>>()?;
        let total_amount = sum_items(&items, currency)?;

        let mut events = Vec::new();
        if let Some(limit) = event.budget_limit {
            if limit.currency() != currency {
                return Err(ReimbursementError::validation(format!(
                    "event budget is in {} but claims are filed in {}",
                    limit.currency(),
                    currency
                )));
            }
            if total_amount.amount() > limit.amount() {
                match budget_policy {
                    BudgetPolicy::Enforce => {
                        return Err(ReimbursementError::BudgetExceeded {
                            total: total_amount,
                            limit,
                        })
                    }
                    BudgetPolicy::Warn => events.push(ClaimEvent::BudgetOverrun {
                        claim_id: id,
                        total: total_amount,
                        limit,
                    }),
                }
            }
        }

        events.insert(
            0,
            ClaimEvent::Submitted {
                claim_id: id,
                submitted_by: submitter.user_id,
                total: total_amount,
                timestamp: now,
            },
        );

        Ok(Self {
            id,
            submitted_by: submitter.user_id,
            event_id: event.id,
            expense_date: input.expense_date,
            description: input.description.as_deref().and_then(non_blank),
            items,
            total_amount,
            currency,
            status: ClaimStatus::Pending,
            submitted_at: now,
            clarifications: Vec::new(),
            validator_note: None,
            decision: None,
            supersedes: None,
            events,
        })
    }

    /// Builds a fresh pending claim from this rejected one
    ///
    /// The rejected record is not modified. When `items` is `None` the
    /// original lines are submitted again.
    pub fn resubmit(
        &self,
        id: ClaimId,
        actor: &Actor,
        event: &Event,
        items: Option<Vec<NewExpenseItem>>,
        budget_policy: BudgetPolicy,
        now: DateTime<Utc>,
    ) -> Result<Self, ReimbursementError> {
        if actor.user_id != self.submitted_by {
            return Err(ReimbursementError::unauthorized("only the submitter may resubmit a claim"));
        }
        if self.status != ClaimStatus::Rejected {
            return Err(ReimbursementError::InvalidTransition {
                from: self.status,
                action: ClaimAction::Resubmit,
            });
        }
        let items = items.unwrap_or_else(|| {
            self.items
                .iter()
                .map(|i| NewExpenseItem::new(i.category, i.amount, i.description.clone(), i.receipt_ref.clone()))
                .collect()
        });
        let input = NewClaim {
            event_id: self.event_id,
            expense_date: self.expense_date,
            description: self.description.clone(),
            items,
        };
        let mut claim = Self::submit(id, actor, event, input, self.currency, budget_policy, now)?;
        claim.supersedes = Some(self.id);
        claim.events.push(ClaimEvent::Resubmitted {
            claim_id: id,
            supersedes: self.id,
            timestamp: now,
        });
        Ok(claim)
    }

    // ---- accessors ------------------------------------------------------

    pub fn id(&self) -> ClaimId {
        self.id
    }

    pub fn submitted_by(&self) -> UserId {
        self.submitted_by
    }

    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    pub fn expense_date(&self) -> NaiveDate {
        self.expense_date
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn items(&self) -> &[ExpenseItem] {
        &self.items
    }

    pub fn item(&self, item_id: ExpenseItemId) -> Option<&ExpenseItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    /// Sum of the items currently marked approved
    ///
    /// Items are checked against the claim currency by [`Self::verify`] when
    /// the record is loaded, so a mismatch here is reported as `Validation`.
    pub fn approved_amount(&self) -> Result<Money, ReimbursementError> {
        Money::try_sum(
            self.currency,
            self.items.iter().filter(|i| i.is_approved()).map(|i| &i.amount),
        )
        .map_err(|e| ReimbursementError::validation(e.to_string()))
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn status(&self) -> ClaimStatus {
        self.status
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    /// Every clarification round, oldest first
    pub fn clarifications(&self) -> &[ClarificationRound] {
        &self.clarifications
    }

    /// The most recent clarification request, answered or not
    pub fn clarification_request(&self) -> Option<&ClarificationRequest> {
        self.clarifications.last().map(|r| &r.request)
    }

    /// The answer to the most recent request, if it has one
    pub fn clarification_response(&self) -> Option<&ClarificationResponse> {
        self.clarifications.last().and_then(|r| r.response.as_ref())
    }

    pub fn has_open_clarification(&self) -> bool {
        self.clarifications.iter().any(|r| !r.is_resolved())
    }

    pub fn validator_note(&self) -> Option<&str> {
        self.validator_note.as_deref()
    }

    pub fn decision(&self) -> Option<&ReviewDecision> {
        self.decision.as_ref()
    }

    pub fn supersedes(&self) -> Option<ClaimId> {
        self.supersedes
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns accumulated domain events and clears them
    pub fn take_events(&mut self) -> Vec<ClaimEvent> {
        std::mem::take(&mut self.events)
    }

    /// Checks the invariants a stored document must satisfy
    pub fn verify(&self) -> Result<(), ReimbursementError> {
        if self.items.is_empty() {
            return Err(ReimbursementError::CorruptRecord(format!("claim {} has no items", self.id)));
        }
        let sum = sum_items(&self.items, self.currency)
            .map_err(|e| ReimbursementError::CorruptRecord(format!("claim {}: {}", self.id, e)))?;
        if sum != self.total_amount {
            return Err(ReimbursementError::CorruptRecord(format!(
                "claim {} total {} does not match its items ({})",
                self.id, self.total_amount, sum
            )));
        }
        let open = self.clarifications.iter().filter(|r| !r.is_resolved()).count();
        let expected_open = usize::from(self.status == ClaimStatus::NeedsClarification);
        if open != expected_open {
            return Err(ReimbursementError::CorruptRecord(format!(
                "claim {} is {} with {} open clarification requests",
                self.id, self.status, open
            )));
        }
        Ok(())
    }

    // ---- guards ---------------------------------------------------------

    fn ensure_reviewer(&self, actor: &Actor) -> Result<(), ReimbursementError> {
        if !actor.can_review() {
            return Err(ReimbursementError::unauthorized(format!(
                "role {} may not review claims",
                actor.role
            )));
        }
        if actor.user_id == self.submitted_by {
            return Err(ReimbursementError::unauthorized("reviewers may not decide their own claims"));
        }
        Ok(())
    }

    fn ensure_status(&self, allowed: &[ClaimStatus], action: ClaimAction) -> Result<(), ReimbursementError> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(ReimbursementError::InvalidTransition {
                from: self.status,
                action,
            })
        }
    }

    fn item_index(&self, item_id: ExpenseItemId) -> Result<usize, ReimbursementError> {
        self.items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or_else(|| ReimbursementError::NotFound {
                entity: "expense item",
                id: item_id.to_string(),
            })
    }

    fn settle_pending_items(&mut self, status: ItemStatus) {
        for item in self.items.iter_mut().filter(|i| i.is_pending()) {
            item.status = status;
        }
    }

    // ---- transitions ----------------------------------------------------

    /// `pending → approved`
    ///
    /// Items still pending become approved; items a reviewer rejected
    /// explicitly stay rejected. Fails when every item has been rejected.
    pub fn approve(&mut self, actor: &Actor, now: DateTime<Utc>) -> Result<(), ReimbursementError> {
        self.ensure_reviewer(actor)?;
        self.ensure_status(&[ClaimStatus::Pending], ClaimAction::Approve)?;
        if self.items.iter().all(|i| i.is_rejected()) {
            return Err(ReimbursementError::validation(
                "every item has been rejected; reject the claim instead",
            ));
        }

        self.settle_pending_items(ItemStatus::Approved);
        self.status = ClaimStatus::Approved;
        self.decision = Some(ReviewDecision {
            outcome: ClaimStatus::Approved,
            decided_by: actor.user_id,
            decided_at: now,
            reason: None,
        });
        self.events.push(ClaimEvent::Approved {
            claim_id: self.id,
            approved_by: actor.user_id,
            approved_amount: self.approved_amount()?,
            timestamp: now,
        });
        Ok(())
    }

    /// `pending → rejected`
    ///
    /// Only items still pending become rejected; explicit item approvals
    /// are kept as history.
    pub fn reject(&mut self, actor: &Actor, reason: &str, now: DateTime<Utc>) -> Result<(), ReimbursementError> {
        self.ensure_reviewer(actor)?;
        self.ensure_status(&[ClaimStatus::Pending], ClaimAction::Reject)?;
        let reason = non_blank(reason).ok_or_else(|| ReimbursementError::validation("a rejection reason is required"))?;

        self.settle_pending_items(ItemStatus::Rejected);
        self.status = ClaimStatus::Rejected;
        self.decision = Some(ReviewDecision {
            outcome: ClaimStatus::Rejected,
            decided_by: actor.user_id,
            decided_at: now,
            reason: Some(reason.clone()),
        });
        self.events.push(ClaimEvent::Rejected {
            claim_id: self.id,
            rejected_by: actor.user_id,
            reason,
            timestamp: now,
        });
        Ok(())
    }

    /// `pending → needs_clarification`
    ///
    /// The request must flag at least one item or carry a message. Only one
    /// request may be unanswered at a time, so a claim already waiting for
    /// an answer refuses with `InvalidTransition`.
    pub fn request_clarification(
        &mut self,
        actor: &Actor,
        input: ClarificationInput,
        now: DateTime<Utc>,
    ) -> Result<ClarificationId, ReimbursementError> {
        self.ensure_reviewer(actor)?;
        self.ensure_status(&[ClaimStatus::Pending], ClaimAction::RequestClarification)?;

        let message = non_blank(&input.message);
        let mut flagged = input.flagged_items;
        flagged.sort();
        flagged.dedup();
        if flagged.is_empty() && message.is_none() {
            return Err(ReimbursementError::validation(
                "a clarification request must flag an item or include a message",
            ));
        }
        for item_id in &flagged {
            self.item_index(*item_id)?;
        }

        let id = ClarificationId::new_v7();
        self.clarifications.push(ClarificationRound {
            request: ClarificationRequest {
                id,
                requested_by: actor.user_id,
                requested_at: now,
                message,
                flagged_items: flagged.clone(),
                reasons: input.reasons,
            },
            response: None,
        });
        self.status = ClaimStatus::NeedsClarification;
        self.events.push(ClaimEvent::ClarificationRequested {
            claim_id: self.id,
            clarification_id: id,
            requested_by: actor.user_id,
            flagged_items: flagged,
            timestamp: now,
        });
        Ok(id)
    }

    /// `needs_clarification → pending`
    ///
    /// Only the submitter may answer. The answered request is kept in the
    /// history.
    pub fn respond_to_clarification(
        &mut self,
        actor: &Actor,
        message: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ReimbursementError> {
        if actor.user_id != self.submitted_by {
            return Err(ReimbursementError::unauthorized(
                "only the submitter may answer a clarification request",
            ));
        }
        self.ensure_status(&[ClaimStatus::NeedsClarification], ClaimAction::RespondToClarification)?;
        let message = non_blank(message).ok_or_else(|| ReimbursementError::validation("a response message is required"))?;

        let round = self
            .clarifications
            .iter_mut()
            .rev()
            .find(|r| !r.is_resolved())
            .ok_or_else(|| ReimbursementError::CorruptRecord(format!("claim {} has no open clarification", self.id)))?;
        round.response = Some(ClarificationResponse {
            responded_by: actor.user_id,
            responded_at: now,
            message,
        });
        let clarification_id = round.request.id;

        self.status = ClaimStatus::Pending;
        self.events.push(ClaimEvent::ClarificationAnswered {
            claim_id: self.id,
            clarification_id,
            timestamp: now,
        });
        Ok(())
    }

    /// Records a reviewer's verdict on one item while the claim is pending
    pub fn decide_item(
        &mut self,
        actor: &Actor,
        item_id: ExpenseItemId,
        decision: ItemDecision,
        note: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), ReimbursementError> {
        self.ensure_reviewer(actor)?;
        self.ensure_status(&[ClaimStatus::Pending], ClaimAction::DecideItem)?;
        let index = self.item_index(item_id)?;

        let item = &mut self.items[index];
        item.status = decision.status();
        item.decided_by = Some(actor.user_id);
        if let Some(note) = note.and_then(non_blank) {
            item.note = Some(note);
        }
        self.events.push(ClaimEvent::ItemDecided {
            claim_id: self.id,
            item_id,
            status: item.status,
            decided_by: actor.user_id,
            timestamp: now,
        });
        Ok(())
    }

    /// Sets or clears a reviewer's note on one item
    pub fn annotate_item(
        &mut self,
        actor: &Actor,
        item_id: ExpenseItemId,
        note: &str,
    ) -> Result<(), ReimbursementError> {
        self.ensure_reviewer(actor)?;
        self.ensure_status(
            &[ClaimStatus::Pending, ClaimStatus::NeedsClarification],
            ClaimAction::AnnotateItem,
        )?;
        let index = self.item_index(item_id)?;
        self.items[index].note = non_blank(note);
        Ok(())
    }

    /// Sets or clears the claim-level reviewer note
    pub fn set_validator_note(&mut self, actor: &Actor, note: &str) -> Result<(), ReimbursementError> {
        self.ensure_reviewer(actor)?;
        self.ensure_status(
            &[ClaimStatus::Pending, ClaimStatus::NeedsClarification],
            ClaimAction::SetValidatorNote,
        )?;
        self.validator_note = non_blank(note);
        Ok(())
    }
}
