//! Typed claim repository over the record store

use std::sync::Arc;

use core_kernel::{ClaimId, Collection, EventId, RecordFilter, RecordStore, StoredRecord, UserId, Versioned};

use crate::claim::ReimbursementClaim;
use crate::error::ReimbursementError;
use crate::status::ClaimStatus;

/// Equality filters for listing claims
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClaimQuery {
    pub status: Option<ClaimStatus>,
    pub submitted_by: Option<UserId>,
    pub event_id: Option<EventId>,
}

impl ClaimQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: ClaimStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn submitted_by(mut self, user_id: UserId) -> Self {
        self.submitted_by = Some(user_id);
        self
    }

    pub fn event(mut self, event_id: EventId) -> Self {
        self.event_id = Some(event_id);
        self
    }

    fn to_filter(self) -> RecordFilter {
        let mut filter = RecordFilter::all();
        if let Some(status) = self.status {
            filter = filter.field_eq("status", status.as_str());
        }
        if let Some(user) = self.submitted_by {
            filter = filter.field_eq("submitted_by", user.storage_key());
        }
        if let Some(event) = self.event_id {
            filter = filter.field_eq("event_id", event.storage_key());
        }
        filter
    }
}

fn decode(record: StoredRecord) -> Result<Versioned<ReimbursementClaim>, ReimbursementError> {
    let claim: Versioned<ReimbursementClaim> = record.decode()?;
    claim.value.verify()?;
    Ok(claim)
}

/// Claims collection
#[derive(Clone)]
pub struct ClaimRepository {
    store: Arc<dyn RecordStore>,
}

impl ClaimRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn find(&self, id: ClaimId) -> Result<Option<Versioned<ReimbursementClaim>>, ReimbursementError> {
        self.store
            .get(Collection::Claims, &id.storage_key())
            .await?
            .map(decode)
            .transpose()
    }

    pub async fn get(&self, id: ClaimId) -> Result<Versioned<ReimbursementClaim>, ReimbursementError> {
        self.find(id)
            .await?
            .ok_or_else(|| ReimbursementError::claim_not_found(id))
    }

    pub async fn list(&self, query: ClaimQuery) -> Result<Vec<Versioned<ReimbursementClaim>>, ReimbursementError> {
        self.store
            .list(Collection::Claims, &query.to_filter())
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    /// True when at least one claim references the event
    pub async fn any_for_event(&self, event_id: EventId) -> Result<bool, ReimbursementError> {
        let filter = ClaimQuery::all().event(event_id).to_filter().limit(1);
        Ok(!self.store.list(Collection::Claims, &filter).await?.is_empty())
    }

    pub async fn insert(&self, claim: &ReimbursementClaim) -> Result<Versioned<ReimbursementClaim>, ReimbursementError> {
        let record = self
            .store
            .create(Collection::Claims, &claim.id().storage_key(), encode(claim)?)
            .await?;
        decode(record)
    }

    /// Removes a claim that was inserted but could not be tied to its event
    pub async fn remove(&self, id: ClaimId) -> Result<(), ReimbursementError> {
        self.store
            .delete(Collection::Claims, &id.storage_key())
            .await
            .map_err(ReimbursementError::from)
    }

    /// Writes the claim if the stored version is still `expected_version`
    pub async fn save(
        &self,
        claim: &ReimbursementClaim,
        expected_version: u64,
    ) -> Result<Versioned<ReimbursementClaim>, ReimbursementError> {
        let record = self
            .store
            .update(Collection::Claims, &claim.id().storage_key(), expected_version, encode(claim)?)
            .await?;
        decode(record)
    }
}

fn encode(claim: &ReimbursementClaim) -> Result<serde_json::Value, ReimbursementError> {
    serde_json::to_value(claim).map_err(|e| ReimbursementError::CorruptRecord(e.to_string()))
}
