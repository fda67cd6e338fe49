//! Lifecycle service tests against the in-memory record and file stores
//!
//! # Test Organization
//!
//! - `submission` - creation-time validation and persistence
//! - `review` - approve, reject and per-item decisions
//! - `clarification` - the request/response cycle
//! - `concurrency` - version checks and storage failures
//! - `resubmission` - new claims from rejected ones
//! - `access` - who may see and act on what
//! - `invariants` - property tests over generated claims

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use core_kernel::store::mock::InMemoryRecordStore;
use core_kernel::{
    Collection, Currency, DomainPort, EventId, HealthCheckResult, HealthCheckable, Money, PortError, RecordFilter,
    RecordStore, StoredRecord,
};
use domain_directory::{CategoryFlags, DirectoryError, ExpenseCategory, Role};
use domain_reimbursement::{
    BudgetPolicy, ClaimAction, ClaimQuery, ClaimStatus, ClarificationInput, ClarificationReason, ErrorKind,
    ItemDecision, ItemStatus, LifecycleConfig, ReimbursementError, ReimbursementService,
};
use test_utils::{
    assert_money_eq, assert_no_pending_items, assert_status, assert_total_consistent, mixed_scenario_items,
    EventBuilder, MoneyFixtures, TestWorld,
};

fn message(text: &str) -> ClarificationInput {
    ClarificationInput {
        message: text.to_string(),
        ..ClarificationInput::default()
    }
}

/// Record store that deletes one event as soon as a claim is inserted,
/// standing in for an admin deleting it mid-submission
struct EventDeletedOnClaimInsert {
    inner: InMemoryRecordStore,
    event: EventId,
}

impl DomainPort for EventDeletedOnClaimInsert {}

#[async_trait]
impl HealthCheckable for EventDeletedOnClaimInsert {
    async fn health_check(&self) -> HealthCheckResult {
        self.inner.health_check().await
    }
}

#[async_trait]
impl RecordStore for EventDeletedOnClaimInsert {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<StoredRecord>, PortError> {
        self.inner.get(collection, id).await
    }

    async fn list(&self, collection: Collection, filter: &RecordFilter) -> Result<Vec<StoredRecord>, PortError> {
        self.inner.list(collection, filter).await
    }

    async fn create(&self, collection: Collection, id: &str, data: Value) -> Result<StoredRecord, PortError> {
        let record = self.inner.create(collection, id, data).await?;
        if collection == Collection::Claims {
            self.inner.delete(Collection::Events, &self.event.storage_key()).await?;
        }
        Ok(record)
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        expected_version: u64,
        data: Value,
    ) -> Result<StoredRecord, PortError> {
        self.inner.update(collection, id, expected_version, data).await
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), PortError> {
        self.inner.delete(collection, id).await
    }

    async fn delete_at_version(
        &self,
        collection: Collection,
        id: &str,
        expected_version: u64,
    ) -> Result<(), PortError> {
        self.inner.delete_at_version(collection, id, expected_version).await
    }
}

// ============================================================================
// SUBMISSION
// ============================================================================

mod submission {
    use super::*;

    #[tokio::test]
    async fn test_submit_computes_total_and_starts_pending() {
        let world = TestWorld::new().await;
        let stored = world.submit_mixed().await;
        let claim = &stored.value;

        assert_eq!(stored.version, 1);
        assert_status(claim, ClaimStatus::Pending);
        assert_money_eq(&claim.total_amount(), &MoneyFixtures::idr(3_200_000));
        assert_eq!(claim.submitted_at(), world.clock.now());
        assert_eq!(claim.submitted_by(), world.user.user_id);
        assert!(claim.items().iter().all(|i| i.status == ItemStatus::Pending));
        assert_total_consistent(claim);
        assert_eq!(world.store.count(Collection::Claims).await, 1);
    }

    #[tokio::test]
    async fn test_empty_claim_persists_nothing() {
        let world = TestWorld::new().await;

        let err = world
            .service
            .create_claim(&world.user, world.claim().build())
            .await
            .unwrap_err();

        assert!(matches!(err, ReimbursementError::EmptyClaim));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(world.store.count(Collection::Claims).await, 0);
    }

    #[tokio::test]
    async fn test_disallowed_category() {
        let world = TestWorld::new().await;
        let event = world
            .add_event(EventBuilder::new().with_name("Workshop").with_categories(CategoryFlags::default()))
            .await;

        let input = test_utils::NewClaimBuilder::new(event.id)
            .with_item(ExpenseCategory::Meals, 100_000)
            .with_item(ExpenseCategory::Other, 75_000)
            .build();
        let err = world.service.create_claim(&world.user, input).await.unwrap_err();

        match err {
            ReimbursementError::DisallowedCategory { category, event } => {
                assert_eq!(category, ExpenseCategory::Other);
                assert_eq!(event, "Workshop");
            }
            other => panic!("expected DisallowedCategory, got {other:?}"),
        }
        assert_eq!(world.store.count(Collection::Claims).await, 0);
    }

    #[tokio::test]
    async fn test_budget_enforced_by_default() {
        let world = TestWorld::new().await;
        let event = world.add_event(EventBuilder::new().with_budget(2_000_000)).await;

        let input = test_utils::NewClaimBuilder::new(event.id)
            .with_item(ExpenseCategory::Accommodation, 1_500_000)
            .with_item(ExpenseCategory::Meals, 600_000)
            .build();
        let err = world.service.create_claim(&world.user, input).await.unwrap_err();

        assert!(matches!(err, ReimbursementError::BudgetExceeded { .. }));
        assert_eq!(world.store.count(Collection::Claims).await, 0);
    }

    #[tokio::test]
    async fn test_budget_warn_policy_accepts_claim() {
        let world = TestWorld::with_budget_policy(BudgetPolicy::Warn).await;
        let event = world.add_event(EventBuilder::new().with_budget(2_000_000)).await;

        let input = test_utils::NewClaimBuilder::new(event.id)
            .with_item(ExpenseCategory::Accommodation, 2_500_000)
            .build();
        let stored = world.service.create_claim(&world.user, input).await.unwrap();

        assert_status(&stored.value, ClaimStatus::Pending);
        assert_money_eq(&stored.value.total_amount(), &MoneyFixtures::idr(2_500_000));
    }

    #[tokio::test]
    async fn test_budget_in_foreign_currency_is_refused() {
        let world = TestWorld::new().await;
        let event = world
            .add_event(EventBuilder::new().with_budget_money(MoneyFixtures::usd(100)))
            .await;

        let input = test_utils::NewClaimBuilder::new(event.id)
            .with_item(ExpenseCategory::Meals, 999_999_999)
            .build();
        let err = world.service.create_claim(&world.user, input).await.unwrap_err();

        assert!(matches!(err, ReimbursementError::Validation(_)));
        assert_eq!(world.store.count(Collection::Claims).await, 0);
    }

    #[tokio::test]
    async fn test_budget_exactly_at_limit_is_accepted() {
        let world = TestWorld::new().await;
        let event = world.add_event(EventBuilder::new().with_budget(2_000_000)).await;

        let input = test_utils::NewClaimBuilder::new(event.id)
            .with_item(ExpenseCategory::Transportation, 2_000_000)
            .build();
        assert!(world.service.create_claim(&world.user, input).await.is_ok());
    }

    #[tokio::test]
    async fn test_foreign_currency_item_rejected() {
        let world = TestWorld::new().await;
        let input = world
            .claim()
            .with_money_item(ExpenseCategory::Meals, MoneyFixtures::usd(2_500))
            .build();

        let err = world.service.create_claim(&world.user, input).await.unwrap_err();
        assert!(matches!(err, ReimbursementError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_event() {
        let world = TestWorld::new().await;
        let input = test_utils::NewClaimBuilder::new(core_kernel::EventId::new())
            .with_item(ExpenseCategory::Meals, 10_000)
            .build();

        let err = world.service.create_claim(&world.user, input).await.unwrap_err();
        assert!(matches!(err, ReimbursementError::NotFound { entity: "event", .. }));
    }
}

// ============================================================================
// REVIEW
// ============================================================================

mod review {
    use super::*;

    #[tokio::test]
    async fn test_approve_settles_items() {
        let world = TestWorld::new().await;
        let claim = world.submit_mixed().await;

        let approved = world
            .service
            .approve(&world.validator, claim.value.id(), claim.version)
            .await
            .unwrap();

        assert_eq!(approved.version, 2);
        assert_status(&approved.value, ClaimStatus::Approved);
        assert_no_pending_items(&approved.value);
        assert_money_eq(&approved.value.approved_amount().unwrap(), &MoneyFixtures::idr(3_200_000));
        let decision = approved.value.decision().unwrap();
        assert_eq!(decision.decided_by, world.validator.user_id);
    }

    #[tokio::test]
    async fn test_second_approve_is_invalid_transition() {
        let world = TestWorld::new().await;
        let claim = world.submit_mixed().await;
        let id = claim.value.id();

        let first = world.service.approve(&world.validator, id, claim.version).await.unwrap();
        let err = world
            .service
            .approve(&world.validator, id, first.version)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ReimbursementError::InvalidTransition {
                from: ClaimStatus::Approved,
                action: ClaimAction::Approve
            }
        ));
        let current = world.service.get_claim(&world.validator, id).await.unwrap();
        assert_eq!(current, first);
    }

    /// Meals rejected on its own, then the claim approved: the claim ends
    /// approved, the total keeps all three items and only two are paid.
    #[tokio::test]
    async fn test_mixed_item_outcome() {
        let world = TestWorld::new().await;
        let claim = world.submit_mixed().await;
        let id = claim.value.id();
        let meals = claim.value.items()[2].id;

        let decided = world
            .service
            .decide_item(&world.validator, id, meals, ItemDecision::Reject, Some("Tanpa nota asli"), claim.version)
            .await
            .unwrap();
        let approved = world.service.approve(&world.validator, id, decided.version).await.unwrap();
        let claim = &approved.value;

        assert_status(claim, ClaimStatus::Approved);
        assert_money_eq(&claim.total_amount(), &MoneyFixtures::idr(3_200_000));
        assert_money_eq(&claim.approved_amount().unwrap(), &MoneyFixtures::idr(2_350_000));
        let statuses: Vec<_> = claim.items().iter().map(|i| i.status).collect();
        assert_eq!(statuses, vec![ItemStatus::Approved, ItemStatus::Approved, ItemStatus::Rejected]);
        assert_eq!(claim.items()[2].note.as_deref(), Some("Tanpa nota asli"));
        assert_eq!(claim.items()[0].decided_by, None);
        assert_total_consistent(claim);
    }

    #[tokio::test]
    async fn test_approve_with_every_item_rejected_fails() {
        let world = TestWorld::new().await;
        let claim = world
            .submit(world.claim().with_item(ExpenseCategory::Meals, 90_000).build())
            .await;
        let id = claim.value.id();
        let item = claim.value.items()[0].id;

        let decided = world
            .service
            .decide_item(&world.validator, id, item, ItemDecision::Reject, None, claim.version)
            .await
            .unwrap();
        let err = world.service.approve(&world.validator, id, decided.version).await.unwrap_err();

        assert!(matches!(err, ReimbursementError::Validation(_)));
        let rejected = world
            .service
            .reject(&world.validator, id, "Semua item ditolak", decided.version)
            .await
            .unwrap();
        assert_status(&rejected.value, ClaimStatus::Rejected);
    }

    #[tokio::test]
    async fn test_reject_keeps_explicit_item_approvals() {
        let world = TestWorld::new().await;
        let claim = world.submit_mixed().await;
        let id = claim.value.id();
        let hotel = claim.value.items()[0].id;

        let decided = world
            .service
            .decide_item(&world.validator, id, hotel, ItemDecision::Approve, None, claim.version)
            .await
            .unwrap();
        let rejected = world
            .service
            .reject(&world.validator, id, "Di luar tanggal acara", decided.version)
            .await
            .unwrap();

        let statuses: Vec<_> = rejected.value.items().iter().map(|i| i.status).collect();
        assert_eq!(statuses, vec![ItemStatus::Approved, ItemStatus::Rejected, ItemStatus::Rejected]);
        assert_no_pending_items(&rejected.value);
        assert_eq!(
            rejected.value.decision().unwrap().reason.as_deref(),
            Some("Di luar tanggal acara")
        );
    }

    #[tokio::test]
    async fn test_reject_requires_reason() {
        let world = TestWorld::new().await;
        let claim = world.submit_mixed().await;

        let err = world
            .service
            .reject(&world.validator, claim.value.id(), "   ", claim.version)
            .await
            .unwrap_err();

        assert!(matches!(err, ReimbursementError::Validation(_)));
        let current = world.service.get_claim(&world.user, claim.value.id()).await.unwrap();
        assert_eq!(current.version, 1);
        assert_status(&current.value, ClaimStatus::Pending);
    }

    #[tokio::test]
    async fn test_terminal_claims_refuse_every_transition() {
        let world = TestWorld::new().await;
        let claim = world.submit_mixed().await;
        let id = claim.value.id();
        let item = claim.value.items()[0].id;
        let rejected = world
            .service
            .reject(&world.validator, id, "Duplikat", claim.version)
            .await
            .unwrap();
        let v = rejected.version;

        let results = vec![
            world.service.approve(&world.validator, id, v).await,
            world.service.reject(&world.validator, id, "lagi", v).await,
            world.service.request_clarification(&world.validator, id, message("?"), v).await,
            world.service.respond_to_clarification(&world.user, id, "jawaban", v).await,
            world
                .service
                .decide_item(&world.validator, id, item, ItemDecision::Approve, None, v)
                .await,
            world.service.annotate_item(&world.validator, id, item, "catatan", v).await,
            world.service.set_validator_note(&world.validator, id, "catatan", v).await,
        ];
        for result in results {
            let err = result.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Transition, "unexpected error {err:?}");
        }
        let current = world.service.get_claim(&world.validator, id).await.unwrap();
        assert_eq!(current, rejected);
    }

    #[tokio::test]
    async fn test_validator_note_and_annotation() {
        let world = TestWorld::new().await;
        let claim = world.submit_mixed().await;
        let id = claim.value.id();
        let item = claim.value.items()[1].id;

        let noted = world
            .service
            .set_validator_note(&world.validator, id, "Cek ulang tiket", claim.version)
            .await
            .unwrap();
        let annotated = world
            .service
            .annotate_item(&world.validator, id, item, "Nota buram", noted.version)
            .await
            .unwrap();

        assert_eq!(annotated.value.validator_note(), Some("Cek ulang tiket"));
        assert_eq!(annotated.value.items()[1].note.as_deref(), Some("Nota buram"));

        let cleared = world
            .service
            .set_validator_note(&world.validator, id, "", annotated.version)
            .await
            .unwrap();
        assert_eq!(cleared.value.validator_note(), None);
    }

    #[tokio::test]
    async fn test_decide_unknown_item() {
        let world = TestWorld::new().await;
        let claim = world.submit_mixed().await;

        let err = world
            .service
            .decide_item(
                &world.validator,
                claim.value.id(),
                core_kernel::ExpenseItemId::new(),
                ItemDecision::Approve,
                None,
                claim.version,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ReimbursementError::NotFound { entity: "expense item", .. }));
    }
}

// ============================================================================
// CLARIFICATION
// ============================================================================

mod clarification {
    use super::*;

    #[tokio::test]
    async fn test_request_and_respond_round_trip() {
        let world = TestWorld::new().await;
        let claim = world.submit_mixed().await;
        let id = claim.value.id();
        let flagged = claim.value.items()[1].id;

        let requested = world
            .service
            .request_clarification(
                &world.validator,
                id,
                ClarificationInput {
                    flagged_items: vec![flagged, flagged],
                    message: String::new(),
                    reasons: vec![ClarificationReason::UnclearReceipt],
                },
                claim.version,
            )
            .await
            .unwrap();
        assert_status(&requested.value, ClaimStatus::NeedsClarification);
        assert!(requested.value.has_open_clarification());
        let request = requested.value.clarification_request().unwrap();
        assert_eq!(request.flagged_items, vec![flagged]);
        assert_eq!(request.message, None);
        assert_eq!(request.requested_by, world.validator.user_id);

        let answered = world
            .service
            .respond_to_clarification(&world.user, id, "Nota sudah diunggah ulang", requested.version)
            .await
            .unwrap();
        assert_status(&answered.value, ClaimStatus::Pending);
        assert!(!answered.value.has_open_clarification());
        assert_eq!(
            answered.value.clarification_response().unwrap().message,
            "Nota sudah diunggah ulang"
        );

        let again = world
            .service
            .request_clarification(&world.validator, id, message("Tanggal di nota berbeda"), answered.version)
            .await
            .unwrap();
        assert_status(&again.value, ClaimStatus::NeedsClarification);
        let rounds = again.value.clarifications();
        assert_eq!(rounds.len(), 2);
        assert!(rounds[0].is_resolved());
        assert!(!rounds[1].is_resolved());
        assert_eq!(rounds[1].request.message.as_deref(), Some("Tanggal di nota berbeda"));
        assert_total_consistent(&again.value);
    }

    #[tokio::test]
    async fn test_second_request_without_response_fails() {
        let world = TestWorld::new().await;
        let claim = world.submit_needing_clarification("Mohon nota hotel").await;

        let err = world
            .service
            .request_clarification(&world.validator, claim.value.id(), message("Dan tiket"), claim.version)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ReimbursementError::InvalidTransition {
                from: ClaimStatus::NeedsClarification,
                action: ClaimAction::RequestClarification
            }
        ));
        assert_eq!(err.to_string(), "Cannot request clarification: claim is needs_clarification");
    }

    #[tokio::test]
    async fn test_request_must_carry_information() {
        let world = TestWorld::new().await;
        let claim = world.submit_mixed().await;

        let input = ClarificationInput {
            reasons: vec![ClarificationReason::MissingReceipt],
            ..ClarificationInput::default()
        };
        let err = world
            .service
            .request_clarification(&world.validator, claim.value.id(), input, claim.version)
            .await
            .unwrap_err();
        assert!(matches!(err, ReimbursementError::Validation(_)));
    }

    #[tokio::test]
    async fn test_only_submitter_may_respond() {
        let world = TestWorld::new().await;
        let claim = world.submit_needing_clarification("Mohon nota").await;

        let err = world
            .service
            .respond_to_clarification(&world.validator, claim.value.id(), "Saya jawab", claim.version)
            .await
            .unwrap_err();
        assert!(matches!(err, ReimbursementError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_response_requires_message() {
        let world = TestWorld::new().await;
        let claim = world.submit_needing_clarification("Mohon nota").await;

        let err = world
            .service
            .respond_to_clarification(&world.user, claim.value.id(), " ", claim.version)
            .await
            .unwrap_err();
        assert!(matches!(err, ReimbursementError::Validation(_)));
    }

    #[tokio::test]
    async fn test_cannot_decide_while_waiting_for_answer() {
        let world = TestWorld::new().await;
        let claim = world.submit_needing_clarification("Mohon nota").await;

        let err = world
            .service
            .approve(&world.validator, claim.value.id(), claim.version)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReimbursementError::InvalidTransition {
                from: ClaimStatus::NeedsClarification,
                ..
            }
        ));
    }
}

// ============================================================================
// CONCURRENCY
// ============================================================================

mod concurrency {
    use super::*;

    #[tokio::test]
    async fn test_stale_version_is_refused() {
        let world = TestWorld::new().await;
        let claim = world.submit_mixed().await;
        let id = claim.value.id();
        let other_validator = world.add_user("Rina Validator", Role::Validator).await;

        // both validators read version 1; the first one wins
        let noted = world
            .service
            .set_validator_note(&other_validator, id, "Sedang dicek", claim.version)
            .await
            .unwrap();
        let err = world
            .service
            .approve(&world.validator, id, claim.version)
            .await
            .unwrap_err();

        match &err {
            ReimbursementError::StaleState { expected, actual, .. } => {
                assert_eq!(*expected, 1);
                assert_eq!(*actual, 2);
            }
            other => panic!("expected StaleState, got {other:?}"),
        }
        assert!(err.is_retryable());
        assert_eq!(err.kind(), ErrorKind::Concurrency);

        let current = world.service.get_claim(&world.validator, id).await.unwrap();
        assert_eq!(current, noted);

        let approved = world.service.approve(&world.validator, id, current.version).await.unwrap();
        assert_status(&approved.value, ClaimStatus::Approved);
    }

    #[tokio::test]
    async fn test_concurrent_approve_and_reject_one_wins() {
        let world = TestWorld::new().await;
        let claim = world.submit_mixed().await;
        let id = claim.value.id();
        let other_validator = world.add_user("Rina Validator", Role::Validator).await;

        let (approve, reject) = tokio::join!(
            world.service.approve(&world.validator, id, claim.version),
            world.service.reject(&other_validator, id, "Ganda", claim.version),
        );

        assert!(approve.is_ok() != reject.is_ok(), "exactly one write must succeed");
        let loser = approve.err().or(reject.err()).unwrap();
        assert!(matches!(loser, ReimbursementError::StaleState { .. }));
        let current = world.service.get_claim(&world.validator, id).await.unwrap();
        assert_eq!(current.version, 2);
    }

    #[tokio::test]
    async fn test_storage_unavailable_is_retryable_and_distinct() {
        let world = TestWorld::new().await;
        let claim = world.submit_mixed().await;

        world.store.set_unavailable(true);
        let err = world
            .service
            .approve(&world.validator, claim.value.id(), claim.version)
            .await
            .unwrap_err();
        world.store.set_unavailable(false);

        assert!(matches!(err, ReimbursementError::StorageUnavailable(_)));
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(err.is_retryable());

        let current = world.service.get_claim(&world.validator, claim.value.id()).await.unwrap();
        assert_eq!(current, claim);
    }

    #[tokio::test]
    async fn test_file_store_unavailable() {
        let world = TestWorld::new().await;
        world.files.set_unavailable(true);

        let err = world
            .service
            .upload_receipt(&world.user, "nota.jpg", "image/jpeg", vec![1, 2, 3])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }
}

// ============================================================================
// RESUBMISSION
// ============================================================================

mod resubmission {
    use super::*;

    #[tokio::test]
    async fn test_resubmit_creates_superseding_claim() {
        let world = TestWorld::new().await;
        let claim = world.submit_mixed().await;
        let old_id = claim.value.id();
        let rejected = world
            .service
            .reject(&world.validator, old_id, "Nota hotel tidak terbaca", claim.version)
            .await
            .unwrap();

        let fresh = world.service.resubmit_claim(&world.user, old_id, None).await.unwrap();

        assert_eq!(fresh.value.id(), old_id.resubmission());
        assert_eq!(fresh.value.supersedes(), Some(old_id));
        assert_status(&fresh.value, ClaimStatus::Pending);
        assert_money_eq(&fresh.value.total_amount(), &MoneyFixtures::idr(3_200_000));
        assert!(fresh.value.items().iter().all(|i| i.is_pending()));

        let old = world.service.get_claim(&world.user, old_id).await.unwrap();
        assert_eq!(old, rejected);
        assert_eq!(world.store.count(Collection::Claims).await, 2);
    }

    #[tokio::test]
    async fn test_repeated_resubmit_files_once() {
        let world = TestWorld::new().await;
        let claim = world.submit_mixed().await;
        let old_id = claim.value.id();
        world
            .service
            .reject(&world.validator, old_id, "Nota hotel tidak terbaca", claim.version)
            .await
            .unwrap();

        let first = world.service.resubmit_claim(&world.user, old_id, None).await.unwrap();
        let err = world
            .service
            .resubmit_claim(&world.user, old_id, None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ReimbursementError::InvalidTransition {
                from: ClaimStatus::Rejected,
                action: ClaimAction::Resubmit
            }
        ));
        assert!(!err.is_retryable());
        assert_eq!(world.store.count(Collection::Claims).await, 2);
        let superseding = world
            .service
            .list_claims(&world.user, ClaimQuery::all())
            .await
            .unwrap()
            .into_iter()
            .filter(|c| c.value.supersedes() == Some(old_id))
            .count();
        assert_eq!(superseding, 1);
        assert_eq!(world.service.get_claim(&world.user, first.value.id()).await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_resubmit_with_new_items() {
        let world = TestWorld::new().await;
        let claim = world.submit_mixed().await;
        world
            .service
            .reject(&world.validator, claim.value.id(), "Terlalu besar", claim.version)
            .await
            .unwrap();

        let items = world
            .claim()
            .with_item(ExpenseCategory::Transportation, 850_000)
            .build()
            .items;
        let fresh = world
            .service
            .resubmit_claim(&world.user, claim.value.id(), Some(items))
            .await
            .unwrap();
        assert_eq!(fresh.value.total_amount(), Money::from_minor(850_000, Currency::IDR));
    }

    #[tokio::test]
    async fn test_only_rejected_claims_can_be_resubmitted() {
        let world = TestWorld::new().await;
        let claim = world.submit_mixed().await;

        let err = world
            .service
            .resubmit_claim(&world.user, claim.value.id(), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReimbursementError::InvalidTransition {
                from: ClaimStatus::Pending,
                action: ClaimAction::Resubmit
            }
        ));
    }

    #[tokio::test]
    async fn test_only_submitter_may_resubmit() {
        let world = TestWorld::new().await;
        let claim = world.submit_mixed().await;
        world
            .service
            .reject(&world.validator, claim.value.id(), "Ditolak", claim.version)
            .await
            .unwrap();

        let err = world
            .service
            .resubmit_claim(&world.validator, claim.value.id(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ReimbursementError::Unauthorized(_)));
    }
}

// ============================================================================
// ACCESS
// ============================================================================

mod access {
    use super::*;

    #[tokio::test]
    async fn test_user_cannot_review() {
        let world = TestWorld::new().await;
        let claim = world.submit_mixed().await;
        let colleague = world.add_user("Andi", Role::User).await;

        let err = world
            .service
            .approve(&colleague, claim.value.id(), claim.version)
            .await
            .unwrap_err();
        assert!(matches!(err, ReimbursementError::Unauthorized(_)));
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[tokio::test]
    async fn test_reviewer_cannot_decide_own_claim() {
        let world = TestWorld::new().await;
        let own = world
            .service
            .create_claim(
                &world.validator,
                world.claim().with_item(ExpenseCategory::Meals, 40_000).build(),
            )
            .await
            .unwrap();

        let err = world
            .service
            .approve(&world.validator, own.value.id(), own.version)
            .await
            .unwrap_err();
        assert!(matches!(err, ReimbursementError::Unauthorized(_)));

        let approved = world.service.approve(&world.admin, own.value.id(), own.version).await.unwrap();
        assert_status(&approved.value, ClaimStatus::Approved);
    }

    #[tokio::test]
    async fn test_users_only_see_their_own_claims() {
        let world = TestWorld::new().await;
        let colleague = world.add_user("Andi", Role::User).await;
        let mine = world.submit_mixed().await;
        let theirs = world
            .service
            .create_claim(&colleague, world.claim().with_item(ExpenseCategory::Meals, 75_000).build())
            .await
            .unwrap();

        let listed = world.service.list_claims(&world.user, ClaimQuery::all()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].value.id(), mine.value.id());

        let err = world
            .service
            .get_claim(&world.user, theirs.value.id())
            .await
            .unwrap_err();
        assert!(matches!(err, ReimbursementError::Unauthorized(_)));

        let everything = world.service.list_claims(&world.validator, ClaimQuery::all()).await.unwrap();
        assert_eq!(everything.len(), 2);
        let pending = world
            .service
            .list_claims(&world.validator, ClaimQuery::all().status(ClaimStatus::Approved))
            .await
            .unwrap();
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_inactive_user_cannot_submit() {
        let world = TestWorld::new().await;
        world
            .directory
            .deactivate_user(&world.admin, world.user.user_id)
            .await
            .unwrap();

        let err = world
            .service
            .create_claim(&world.user, world.claim().with_item(ExpenseCategory::Meals, 10_000).build())
            .await
            .unwrap_err();
        assert!(matches!(err, ReimbursementError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_receipt_upload_and_url() {
        let world = TestWorld::new().await;
        let file = world
            .service
            .upload_receipt(&world.user, "hotel.pdf", "application/pdf", b"%PDF-1.7".to_vec())
            .await
            .unwrap();
        assert_eq!(file.size, 8);

        let input = world
            .claim()
            .with_items(vec![domain_reimbursement::NewExpenseItem::new(
                ExpenseCategory::Accommodation,
                MoneyFixtures::idr(1_200_000),
                "Hotel",
                file.reference.clone(),
            )])
            .build();
        let claim = world.submit(input).await;
        let url = world
            .service
            .receipt_url(&world.validator, claim.value.id(), claim.value.items()[0].id)
            .await
            .unwrap();
        assert!(url.ends_with(file.reference.as_str()));
    }

    #[tokio::test]
    async fn test_empty_receipt_rejected() {
        let world = TestWorld::new().await;
        let err = world
            .service
            .upload_receipt(&world.user, "kosong.jpg", "image/jpeg", Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ReimbursementError::Validation(_)));
    }

    #[tokio::test]
    async fn test_event_with_claims_cannot_be_deleted() {
        let world = TestWorld::new().await;
        world.submit_mixed().await;

        let err = world
            .service
            .delete_event(&world.admin, world.event.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ReimbursementError::EventInUse(_)));
        assert!(world.directory.get_event(world.event.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_claim_filed_after_check_blocks_the_delete() {
        let world = TestWorld::new().await;
        let checked = world.directory.get_event(world.event.id).await.unwrap();

        world.submit_mixed().await;

        let err = world
            .directory
            .events()
            .delete(world.event.id, checked.version)
            .await
            .unwrap_err();
        assert!(matches!(err, DirectoryError::StaleState { .. }));
        assert!(world.directory.get_event(world.event.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_claim_withdrawn_when_event_deleted_during_submit() {
        let world = TestWorld::new().await;
        let store = Arc::new(EventDeletedOnClaimInsert {
            inner: world.store.as_ref().clone(),
            event: world.event.id,
        });
        let service = ReimbursementService::new(
            store,
            world.files.clone(),
            world.directory.clone(),
            LifecycleConfig::default(),
        );

        let err = service
            .create_claim(&world.user, world.claim().with_items(mixed_scenario_items()).build())
            .await
            .unwrap_err();

        assert!(matches!(err, ReimbursementError::NotFound { entity: "event", .. }));
        assert_eq!(world.store.count(Collection::Claims).await, 0);
        assert_eq!(world.store.count(Collection::Events).await, 0);
    }

    #[tokio::test]
    async fn test_unused_event_deleted_by_admin_only() {
        let world = TestWorld::new().await;
        let spare = world.add_event(EventBuilder::new()).await;

        let err = world.service.delete_event(&world.validator, spare.id).await.unwrap_err();
        assert!(matches!(err, ReimbursementError::Unauthorized(_)));

        world.service.delete_event(&world.admin, spare.id).await.unwrap();
        assert!(world.directory.get_event(spare.id).await.is_err());
    }
}

// ============================================================================
// INVARIANTS
// ============================================================================

mod invariants {
    use super::*;
    use chrono::{TimeZone, Utc};
    use domain_directory::Actor;
    use proptest::prelude::*;
    use test_utils::{assert_terminal, claim_strategy};

    proptest! {
        #[test]
        fn prop_total_matches_items(claim in claim_strategy()) {
            assert_total_consistent(&claim);
            prop_assert!(claim.approved_amount().unwrap().amount() <= claim.total_amount().amount());
        }

        #[test]
        fn prop_terminal_claims_stay_put(claim in claim_strategy()) {
            prop_assume!(claim.is_terminal());
            assert_terminal(&claim);

            let validator = Actor::new(core_kernel::UserId::new(), Role::Validator);
            let submitter = Actor::new(claim.submitted_by(), Role::User);
            let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
            let item = claim.items()[0].id;

            let mut attempt = claim.clone();
            prop_assert!(matches!(attempt.approve(&validator, now), Err(ReimbursementError::InvalidTransition { .. })), "expected InvalidTransition");
            prop_assert!(matches!(attempt.reject(&validator, "x", now), Err(ReimbursementError::InvalidTransition { .. })), "expected InvalidTransition");
            prop_assert!(matches!(
                attempt.request_clarification(&validator, message("?"), now),
                Err(ReimbursementError::InvalidTransition { .. })
            ), "expected InvalidTransition");
            prop_assert!(matches!(
                attempt.respond_to_clarification(&submitter, "ok", now),
                Err(ReimbursementError::InvalidTransition { .. })
            ), "expected InvalidTransition");
            prop_assert!(matches!(
                attempt.decide_item(&validator, item, ItemDecision::Approve, None, now),
                Err(ReimbursementError::InvalidTransition { .. })
            ), "expected InvalidTransition");
            prop_assert_eq!(attempt, claim);
        }

        #[test]
        fn prop_stored_document_round_trips(claim in claim_strategy()) {
            let json = serde_json::to_value(&claim).unwrap();
            let back: domain_reimbursement::ReimbursementClaim = serde_json::from_value(json).unwrap();
            prop_assert!(back.verify().is_ok());
            prop_assert_eq!(back.total_amount(), claim.total_amount());
            prop_assert_eq!(back.status(), claim.status());
        }
    }
}
