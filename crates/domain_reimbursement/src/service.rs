//! Reimbursement service
//!
//! Orchestrates every lifecycle operation as load → transition → compare-and-set
//! write. The caller passes the version it last read; if the stored claim has
//! moved on, the operation fails with `StaleState` and nothing is written.
//!
//! New claims and event deletion serialize on the event's version: a claim
//! is inserted and then its event is bumped, while `delete_event` checks for
//! claims and deletes only at the version it read. Whichever write lands
//! second sees a changed or missing event.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use core_kernel::{ClaimId, EventId, ExpenseItemId, FileStore, PortError, RecordStore, StoredFile, Versioned};
use domain_directory::{Actor, DirectoryError, DirectoryService, Event};

use crate::claim::{ClaimAction, NewClaim, ReimbursementClaim};
use crate::clarification::ClarificationInput;
use crate::config::LifecycleConfig;
use crate::error::ReimbursementError;
use crate::events::ClaimEvent;
use crate::item::{ItemDecision, NewExpenseItem};
use crate::repository::{ClaimQuery, ClaimRepository};

/// Bumps of an event that another writer moved on before giving up
const EVENT_BUMP_RETRIES: u32 = 3;

/// Source of the current instant, replaceable in tests
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Clone)]
pub struct ReimbursementService {
    claims: ClaimRepository,
    directory: DirectoryService,
    files: Arc<dyn FileStore>,
    config: LifecycleConfig,
    clock: Clock,
}

fn log_events(events: Vec<ClaimEvent>, version: u64) {
    for event in events {
        match &event {
            ClaimEvent::BudgetOverrun { claim_id, total, limit } => {
                warn!(claim_id = %claim_id, total = %total, limit = %limit, "claim total exceeds event budget");
            }
            other => {
                info!(claim_id = %other.claim_id(), event = other.name(), version, "claim event");
            }
        }
    }
}

impl ReimbursementService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        files: Arc<dyn FileStore>,
        directory: DirectoryService,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            claims: ClaimRepository::new(store),
            directory,
            files,
            config,
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    pub fn claims(&self) -> &ClaimRepository {
        &self.claims
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    async fn load_event(&self, id: EventId) -> Result<Versioned<Event>, ReimbursementError> {
        Ok(self.directory.get_event(id).await?)
    }

    /// Moves the event one version forward without changing it
    async fn bump_event(&self, mut event: Versioned<Event>) -> Result<(), ReimbursementError> {
        let events = self.directory.events();
        let mut retries = 0;
        loop {
            match events.save(&event.value, event.version).await {
                Ok(_) => return Ok(()),
                Err(DirectoryError::StaleState { .. }) if retries < EVENT_BUMP_RETRIES => {
                    retries += 1;
                    event = events.get(event.value.id).await?;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Inserts a new claim and ties it to its event
    ///
    /// If the event cannot be bumped afterwards (deleted, or storage failed),
    /// the claim is removed again and the error returned.
    async fn insert_under_event(
        &self,
        claim: &ReimbursementClaim,
        event: Versioned<Event>,
    ) -> Result<Versioned<ReimbursementClaim>, ReimbursementError> {
        let stored = self.claims.insert(claim).await?;
        if let Err(err) = self.bump_event(event).await {
            warn!(claim_id = %claim.id(), event_id = %claim.event_id(), error = %err, "withdrawing claim; event changed");
            self.claims.remove(claim.id()).await?;
            return Err(err);
        }
        Ok(stored)
    }

    fn ensure_can_view(actor: &Actor, claim: &ReimbursementClaim) -> Result<(), ReimbursementError> {
        if actor.can_review() || actor.user_id == claim.submitted_by() {
            Ok(())
        } else {
            Err(ReimbursementError::unauthorized("claim belongs to another user"))
        }
    }

    /// Applies `transition` to the claim at `expected_version` and writes it back
    async fn mutate<F>(
        &self,
        actor: &Actor,
        id: ClaimId,
        expected_version: u64,
        action: ClaimAction,
        transition: F,
    ) -> Result<Versioned<ReimbursementClaim>, ReimbursementError>
    where
        F: FnOnce(&mut ReimbursementClaim, DateTime<Utc>) -> Result<(), ReimbursementError>,
    {
        self.directory.ensure_active(actor).await?;
        let current = self.claims.get(id).await?;
        if current.version != expected_version {
            warn!(claim_id = %id, expected_version, actual = current.version, %action, "stale claim version");
            return Err(ReimbursementError::StaleState {
                id: id.to_string(),
                expected: expected_version,
                actual: current.version,
            });
        }

        let from = current.value.status();
        let mut claim = current.value;
        if let Err(err) = transition(&mut claim, self.now()) {
            warn!(claim_id = %id, actor = %actor, %action, from = %from, error = %err, "transition refused");
            return Err(err);
        }

        let stored = self.claims.save(&claim, expected_version).await.map_err(|err| {
            if matches!(err, ReimbursementError::StaleState { .. }) {
                warn!(claim_id = %id, expected_version, %action, "claim changed during write");
            }
            err
        })?;
        info!(
            claim_id = %id,
            actor = %actor,
            %action,
            from = %from,
            to = %claim.status(),
            version = stored.version,
            "claim updated"
        );
        log_events(claim.take_events(), stored.version);
        Ok(stored)
    }

    // ---- submission -----------------------------------------------------

    /// Validates and stores a new pending claim
    #[instrument(skip(self, input), fields(actor = %actor.user_id, event_id = %input.event_id))]
    pub async fn create_claim(
        &self,
        actor: &Actor,
        input: NewClaim,
    ) -> Result<Versioned<ReimbursementClaim>, ReimbursementError> {
        self.directory.ensure_active(actor).await?;
        let event = self.load_event(input.event_id).await?;
        let mut claim = ReimbursementClaim::submit(
            ClaimId::new_v7(),
            actor,
            &event.value,
            input,
            self.config.currency,
            self.config.budget_policy,
            self.now(),
        )?;
        let stored = self.insert_under_event(&claim, event).await?;
        info!(claim_id = %claim.id(), total = %claim.total_amount(), items = claim.items().len(), "claim submitted");
        log_events(claim.take_events(), stored.version);
        Ok(stored)
    }

    /// Files a new claim in place of a rejected one
    ///
    /// The rejected claim is left as it is; the new claim records it in
    /// `supersedes`. The new id is derived from the old one, so a repeated
    /// request fails with `InvalidTransition` instead of filing twice.
    #[instrument(skip(self, items), fields(actor = %actor.user_id, claim_id = %id))]
    pub async fn resubmit_claim(
        &self,
        actor: &Actor,
        id: ClaimId,
        items: Option<Vec<NewExpenseItem>>,
    ) -> Result<Versioned<ReimbursementClaim>, ReimbursementError> {
        self.directory.ensure_active(actor).await?;
        let previous = self.claims.get(id).await?.value;
        let event = self.load_event(previous.event_id()).await?;
        let mut claim = previous.resubmit(
            id.resubmission(),
            actor,
            &event.value,
            items,
            self.config.budget_policy,
            self.now(),
        )?;
        let stored = match self.insert_under_event(&claim, event).await {
            Err(ReimbursementError::StorageUnavailable(PortError::Conflict { .. })) => {
                warn!(new_claim_id = %claim.id(), "claim already resubmitted");
                return Err(ReimbursementError::InvalidTransition {
                    from: previous.status(),
                    action: ClaimAction::Resubmit,
                });
            }
            result => result?,
        };
        info!(new_claim_id = %claim.id(), "claim resubmitted");
        log_events(claim.take_events(), stored.version);
        Ok(stored)
    }

    // ---- review ---------------------------------------------------------

    #[instrument(skip(self), fields(actor = %actor.user_id, claim_id = %id))]
    pub async fn approve(
        &self,
        actor: &Actor,
        id: ClaimId,
        expected_version: u64,
    ) -> Result<Versioned<ReimbursementClaim>, ReimbursementError> {
        self.mutate(actor, id, expected_version, ClaimAction::Approve, |claim, now| {
            claim.approve(actor, now)
        })
        .await
    }

    #[instrument(skip(self, reason), fields(actor = %actor.user_id, claim_id = %id))]
    pub async fn reject(
        &self,
        actor: &Actor,
        id: ClaimId,
        reason: &str,
        expected_version: u64,
    ) -> Result<Versioned<ReimbursementClaim>, ReimbursementError> {
        self.mutate(actor, id, expected_version, ClaimAction::Reject, |claim, now| {
            claim.reject(actor, reason, now)
        })
        .await
    }

    #[instrument(skip(self, input), fields(actor = %actor.user_id, claim_id = %id))]
    pub async fn request_clarification(
        &self,
        actor: &Actor,
        id: ClaimId,
        input: ClarificationInput,
        expected_version: u64,
    ) -> Result<Versioned<ReimbursementClaim>, ReimbursementError> {
        self.mutate(actor, id, expected_version, ClaimAction::RequestClarification, |claim, now| {
            claim.request_clarification(actor, input, now).map(|_| ())
        })
        .await
    }

    #[instrument(skip(self, message), fields(actor = %actor.user_id, claim_id = %id))]
    pub async fn respond_to_clarification(
        &self,
        actor: &Actor,
        id: ClaimId,
        message: &str,
        expected_version: u64,
    ) -> Result<Versioned<ReimbursementClaim>, ReimbursementError> {
        self.mutate(actor, id, expected_version, ClaimAction::RespondToClarification, |claim, now| {
            claim.respond_to_clarification(actor, message, now)
        })
        .await
    }

    #[instrument(skip(self, note), fields(actor = %actor.user_id, claim_id = %id, item_id = %item_id))]
    pub async fn decide_item(
        &self,
        actor: &Actor,
        id: ClaimId,
        item_id: ExpenseItemId,
        decision: ItemDecision,
        note: Option<&str>,
        expected_version: u64,
    ) -> Result<Versioned<ReimbursementClaim>, ReimbursementError> {
        self.mutate(actor, id, expected_version, ClaimAction::DecideItem, |claim, now| {
            claim.decide_item(actor, item_id, decision, note, now)
        })
        .await
    }

    pub async fn annotate_item(
        &self,
        actor: &Actor,
        id: ClaimId,
        item_id: ExpenseItemId,
        note: &str,
        expected_version: u64,
    ) -> Result<Versioned<ReimbursementClaim>, ReimbursementError> {
        self.mutate(actor, id, expected_version, ClaimAction::AnnotateItem, |claim, _| {
            claim.annotate_item(actor, item_id, note)
        })
        .await
    }

    pub async fn set_validator_note(
        &self,
        actor: &Actor,
        id: ClaimId,
        note: &str,
        expected_version: u64,
    ) -> Result<Versioned<ReimbursementClaim>, ReimbursementError> {
        self.mutate(actor, id, expected_version, ClaimAction::SetValidatorNote, |claim, _| {
            claim.set_validator_note(actor, note)
        })
        .await
    }

    // ---- reads ----------------------------------------------------------

    pub async fn get_claim(&self, actor: &Actor, id: ClaimId) -> Result<Versioned<ReimbursementClaim>, ReimbursementError> {
        self.directory.ensure_active(actor).await?;
        let claim = self.claims.get(id).await?;
        Self::ensure_can_view(actor, &claim.value)?;
        Ok(claim)
    }

    /// Lists claims visible to the actor
    ///
    /// Plain users only ever see their own claims, whatever `query` asks for.
    pub async fn list_claims(
        &self,
        actor: &Actor,
        mut query: ClaimQuery,
    ) -> Result<Vec<Versioned<ReimbursementClaim>>, ReimbursementError> {
        self.directory.ensure_active(actor).await?;
        if !actor.can_review() {
            query.submitted_by = Some(actor.user_id);
        }
        let claims = self.claims.list(query).await?;
        debug!(count = claims.len(), "claims listed");
        Ok(claims)
    }

    // ---- receipts -------------------------------------------------------

    #[instrument(skip(self, bytes), fields(actor = %actor.user_id, size = bytes.len()))]
    pub async fn upload_receipt(
        &self,
        actor: &Actor,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredFile, ReimbursementError> {
        self.directory.ensure_active(actor).await?;
        if bytes.is_empty() {
            return Err(ReimbursementError::validation("receipt file is empty"));
        }
        let stored = self.files.upload(file_name, content_type, bytes).await?;
        info!(reference = %stored.reference, "receipt uploaded");
        Ok(stored)
    }

    /// Resolves the receipt of one item to a URL the caller can open
    pub async fn receipt_url(
        &self,
        actor: &Actor,
        id: ClaimId,
        item_id: ExpenseItemId,
    ) -> Result<String, ReimbursementError> {
        let claim = self.get_claim(actor, id).await?.value;
        let item = claim.item(item_id).ok_or_else(|| ReimbursementError::NotFound {
            entity: "expense item",
            id: item_id.to_string(),
        })?;
        Ok(self.files.get_url(&item.receipt_ref).await?)
    }

    // ---- reference data -------------------------------------------------

    /// Deletes an event that no claim references
    #[instrument(skip(self), fields(actor = %actor.user_id, event_id = %event_id))]
    pub async fn delete_event(&self, actor: &Actor, event_id: EventId) -> Result<(), ReimbursementError> {
        let user = self.directory.ensure_active(actor).await?;
        if !user.role.is_admin() {
            return Err(ReimbursementError::unauthorized("admin role required"));
        }
        let event = self.directory.get_event(event_id).await?;
        if self.claims.any_for_event(event_id).await? {
            warn!("refusing to delete event with claims");
            return Err(ReimbursementError::EventInUse(event_id.to_string()));
        }
        self.directory.events().delete(event_id, event.version).await?;
        info!("event deleted");
        Ok(())
    }
}
