//! Typed repositories for events and users over the record store

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use core_kernel::{Collection, EventId, RecordFilter, RecordStore, UserId, Versioned};

use crate::error::DirectoryError;
use crate::event::{Event, EventStatus};
use crate::user::{Role, User};

fn encode<T: Serialize>(value: &T) -> Result<serde_json::Value, DirectoryError> {
    serde_json::to_value(value).map_err(|e| DirectoryError::CorruptRecord(e.to_string()))
}

async fn load_all<T: DeserializeOwned>(
    store: &dyn RecordStore,
    collection: Collection,
    filter: &RecordFilter,
) -> Result<Vec<Versioned<T>>, DirectoryError> {
    store
        .list(collection, filter)
        .await?
        .into_iter()
        .map(|r| r.decode().map_err(DirectoryError::from))
        .collect()
}

/// Events collection
#[derive(Clone)]
pub struct EventRepository {
    store: Arc<dyn RecordStore>,
}

impl EventRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn find(&self, id: EventId) -> Result<Option<Versioned<Event>>, DirectoryError> {
        match self.store.get(Collection::Events, &id.storage_key()).await? {
            Some(record) => Ok(Some(record.decode()?)),
            None => Ok(None),
        }
    }

    pub async fn get(&self, id: EventId) -> Result<Versioned<Event>, DirectoryError> {
        self.find(id)
            .await?
            .ok_or_else(|| DirectoryError::event_not_found(id))
    }

    pub async fn list(&self, status: Option<EventStatus>) -> Result<Vec<Versioned<Event>>, DirectoryError> {
        let filter = match status {
            Some(s) => RecordFilter::all().field_eq("status", s.as_str()),
            None => RecordFilter::all(),
        };
        load_all(self.store.as_ref(), Collection::Events, &filter).await
    }

    pub async fn insert(&self, event: &Event) -> Result<Versioned<Event>, DirectoryError> {
        let record = self
            .store
            .create(Collection::Events, &event.id.storage_key(), encode(event)?)
            .await?;
        Ok(record.decode()?)
    }

    pub async fn save(&self, event: &Event, expected_version: u64) -> Result<Versioned<Event>, DirectoryError> {
        let record = self
            .store
            .update(Collection::Events, &event.id.storage_key(), expected_version, encode(event)?)
            .await?;
        Ok(record.decode()?)
    }

    /// Deletes the event if it is still at `expected_version`
    pub async fn delete(&self, id: EventId, expected_version: u64) -> Result<(), DirectoryError> {
        self.store
            .delete_at_version(Collection::Events, &id.storage_key(), expected_version)
            .await
            .map_err(DirectoryError::from)
    }
}

/// Users collection
#[derive(Clone)]
pub struct UserRepository {
    store: Arc<dyn RecordStore>,
}

impl UserRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn find(&self, id: UserId) -> Result<Option<Versioned<User>>, DirectoryError> {
        match self.store.get(Collection::Users, &id.storage_key()).await? {
            Some(record) => Ok(Some(record.decode()?)),
            None => Ok(None),
        }
    }

    pub async fn get(&self, id: UserId) -> Result<Versioned<User>, DirectoryError> {
        self.find(id)
            .await?
            .ok_or_else(|| DirectoryError::user_not_found(id))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Versioned<User>>, DirectoryError> {
        let filter = RecordFilter::all()
            .field_eq("email", email.trim().to_ascii_lowercase())
            .limit(1);
        Ok(load_all(self.store.as_ref(), Collection::Users, &filter)
            .await?
            .into_iter()
            .next())
    }

    pub async fn list(&self, role: Option<Role>) -> Result<Vec<Versioned<User>>, DirectoryError> {
        let filter = match role {
            Some(r) => RecordFilter::all().field_eq("role", r.as_str()),
            None => RecordFilter::all(),
        };
        load_all(self.store.as_ref(), Collection::Users, &filter).await
    }

    pub async fn insert(&self, user: &User) -> Result<Versioned<User>, DirectoryError> {
        let record = self
            .store
            .create(Collection::Users, &user.id.storage_key(), encode(user)?)
            .await?;
        Ok(record.decode()?)
    }

    pub async fn save(&self, user: &User, expected_version: u64) -> Result<Versioned<User>, DirectoryError> {
        let record = self
            .store
            .update(Collection::Users, &user.id.storage_key(), expected_version, encode(user)?)
            .await?;
        Ok(record.decode()?)
    }
}
