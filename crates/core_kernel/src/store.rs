//! Collaborator ports for persistence
//!
//! [`RecordStore`] is the document-store boundary the engines are written
//! against: plain JSON documents grouped in collections, each carrying a
//! version counter so writers can compare-and-set. [`FileStore`] holds the
//! receipt uploads; the engines only ever see the opaque [`ReceiptRef`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::identifiers::ReceiptRef;
use crate::ports::{DomainPort, HealthCheckable, PortError};

/// Named document collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Claims,
    Events,
    Users,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Claims => "claims",
            Collection::Events => "events",
            Collection::Users => "users",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document as held by the store, with the metadata the store owns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: String,
    /// Starts at 1 on create and increases by one on every update
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub data: Value,
}

impl StoredRecord {
    /// Deserializes the document into a typed value, keeping the store metadata
    pub fn decode<T: DeserializeOwned>(self) -> Result<Versioned<T>, PortError> {
        let value = serde_json::from_value(self.data).map_err(|e| {
            PortError::transformation(format!("record {} does not decode: {}", self.id, e))
        })?;
        Ok(Versioned {
            value,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// A typed document together with the version it was read at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub value: T,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Equality filters on top-level document fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub equals: Vec<(String, Value)>,
    pub limit: Option<usize>,
}

impl RecordFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn field_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.equals.push((field.into(), value.into()));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns true if `data` satisfies every equality clause
    pub fn matches(&self, data: &Value) -> bool {
        self.equals
            .iter()
            .all(|(field, expected)| data.get(field) == Some(expected))
    }
}

/// Document store port
///
/// Results of `list` are ordered by creation time, then id. Readers get a
/// snapshot; nothing here blocks a concurrent writer.
#[async_trait]
pub trait RecordStore: DomainPort + HealthCheckable {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<StoredRecord>, PortError>;

    async fn list(&self, collection: Collection, filter: &RecordFilter) -> Result<Vec<StoredRecord>, PortError>;

    /// Inserts a new document at version 1. An existing id is a `Conflict`.
    async fn create(&self, collection: Collection, id: &str, data: Value) -> Result<StoredRecord, PortError>;

    /// Replaces the document only if its stored version equals `expected_version`
    ///
    /// A mismatch returns `VersionConflict` and leaves the stored document unchanged.
    async fn update(
        &self,
        collection: Collection,
        id: &str,
        expected_version: u64,
        data: Value,
    ) -> Result<StoredRecord, PortError>;

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), PortError>;

    /// Removes the document only if its stored version equals `expected_version`
    ///
    /// A mismatch returns `VersionConflict` and leaves the document in place.
    async fn delete_at_version(
        &self,
        collection: Collection,
        id: &str,
        expected_version: u64,
    ) -> Result<(), PortError>;
}

/// Metadata for an uploaded file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub reference: ReceiptRef,
    pub file_name: String,
    pub content_type: String,
    pub size: usize,
}

/// Receipt storage port
#[async_trait]
pub trait FileStore: DomainPort {
    async fn upload(&self, file_name: &str, content_type: &str, bytes: Vec<u8>) -> Result<StoredFile, PortError>;

    async fn get_url(&self, reference: &ReceiptRef) -> Result<String, PortError>;

    async fn delete(&self, reference: &ReceiptRef) -> Result<(), PortError>;
}

#[cfg(any(test, feature = "mock"))]
pub mod mock {
    //! In-memory adapters for tests and the `memory` store backend

    use super::*;
    use crate::ports::HealthCheckResult;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    fn unavailable(service: &str) -> PortError {
        PortError::ServiceUnavailable {
            service: service.to_string(),
        }
    }

    /// In-memory implementation of RecordStore
    #[derive(Debug, Default, Clone)]
    pub struct InMemoryRecordStore {
        records: Arc<RwLock<HashMap<(Collection, String), StoredRecord>>>,
        offline: Arc<AtomicBool>,
    }

    impl InMemoryRecordStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes every subsequent call fail with `ServiceUnavailable` until reset
        pub fn set_unavailable(&self, offline: bool) {
            self.offline.store(offline, Ordering::SeqCst);
        }

        /// Number of documents in a collection
        pub async fn count(&self, collection: Collection) -> usize {
            self.records
                .read()
                .await
                .keys()
                .filter(|(c, _)| *c == collection)
                .count()
        }

        fn check_online(&self) -> Result<(), PortError> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(unavailable("in-memory record store"));
            }
            Ok(())
        }
    }

    impl DomainPort for InMemoryRecordStore {}

    #[async_trait]
    impl HealthCheckable for InMemoryRecordStore {
        async fn health_check(&self) -> HealthCheckResult {
            if self.offline.load(Ordering::SeqCst) {
                HealthCheckResult::unhealthy("memory-record-store", 0, "store marked unavailable")
            } else {
                HealthCheckResult::healthy("memory-record-store", 0)
            }
        }
    }

    #[async_trait]
    impl RecordStore for InMemoryRecordStore {
        async fn get(&self, collection: Collection, id: &str) -> Result<Option<StoredRecord>, PortError> {
            self.check_online()?;
            Ok(self
                .records
                .read()
                .await
                .get(&(collection, id.to_string()))
                .cloned())
        }

        async fn list(&self, collection: Collection, filter: &RecordFilter) -> Result<Vec<StoredRecord>, PortError> {
            self.check_online()?;
            let records = self.records.read().await;
            let mut found: Vec<StoredRecord> = records
                .iter()
                .filter(|((c, _), r)| *c == collection && filter.matches(&r.data))
                .map(|(_, r)| r.clone())
                .collect();
            found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
            if let Some(limit) = filter.limit {
                found.truncate(limit);
            }
            Ok(found)
        }

        async fn create(&self, collection: Collection, id: &str, data: Value) -> Result<StoredRecord, PortError> {
            self.check_online()?;
            let mut records = self.records.write().await;
            let key = (collection, id.to_string());
            if records.contains_key(&key) {
                return Err(PortError::conflict(format!("{collection}/{id} already exists")));
            }
            let now = Utc::now();
            let record = StoredRecord {
                id: id.to_string(),
                version: 1,
                created_at: now,
                updated_at: now,
                data,
            };
            records.insert(key, record.clone());
            Ok(record)
        }

        async fn update(
            &self,
            collection: Collection,
            id: &str,
            expected_version: u64,
            data: Value,
        ) -> Result<StoredRecord, PortError> {
            self.check_online()?;
            let mut records = self.records.write().await;
            let record = records
                .get_mut(&(collection, id.to_string()))
                .ok_or_else(|| PortError::not_found(collection.as_str(), id))?;
            if record.version != expected_version {
                return Err(PortError::VersionConflict {
                    id: id.to_string(),
                    expected: expected_version,
                    actual: record.version,
                });
            }
            record.version += 1;
            record.updated_at = Utc::now();
            record.data = data;
            Ok(record.clone())
        }

        async fn delete(&self, collection: Collection, id: &str) -> Result<(), PortError> {
            self.check_online()?;
            self.records
                .write()
                .await
                .remove(&(collection, id.to_string()))
                .map(|_| ())
                .ok_or_else(|| PortError::not_found(collection.as_str(), id))
        }

        async fn delete_at_version(
            &self,
            collection: Collection,
            id: &str,
            expected_version: u64,
        ) -> Result<(), PortError> {
            self.check_online()?;
            let mut records = self.records.write().await;
            let key = (collection, id.to_string());
            let actual = records
                .get(&key)
                .map(|r| r.version)
                .ok_or_else(|| PortError::not_found(collection.as_str(), id))?;
            if actual != expected_version {
                return Err(PortError::VersionConflict {
                    id: id.to_string(),
                    expected: expected_version,
                    actual,
                });
            }
            records.remove(&key);
            Ok(())
        }
    }

    /// In-memory implementation of FileStore
    #[derive(Debug, Clone)]
    pub struct InMemoryFileStore {
        files: Arc<RwLock<HashMap<String, (StoredFile, Vec<u8>)>>>,
        base_url: String,
        offline: Arc<AtomicBool>,
    }

    impl Default for InMemoryFileStore {
        fn default() -> Self {
            Self::new("memory://receipts")
        }
    }

    impl InMemoryFileStore {
        pub fn new(base_url: impl Into<String>) -> Self {
            Self {
                files: Arc::default(),
                base_url: base_url.into(),
                offline: Arc::default(),
            }
        }

        pub fn set_unavailable(&self, offline: bool) {
            self.offline.store(offline, Ordering::SeqCst);
        }

        fn check_online(&self) -> Result<(), PortError> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(unavailable("in-memory file store"));
            }
            Ok(())
        }
    }

    impl DomainPort for InMemoryFileStore {}

    #[async_trait]
    impl FileStore for InMemoryFileStore {
        async fn upload(&self, file_name: &str, content_type: &str, bytes: Vec<u8>) -> Result<StoredFile, PortError> {
            self.check_online()?;
            let reference = ReceiptRef::new(format!("receipts/{}/{}", uuid::Uuid::now_v7(), file_name));
            let stored = StoredFile {
                reference: reference.clone(),
                file_name: file_name.to_string(),
                content_type: content_type.to_string(),
                size: bytes.len(),
            };
            self.files
                .write()
                .await
                .insert(reference.as_str().to_string(), (stored.clone(), bytes));
            Ok(stored)
        }

        async fn get_url(&self, reference: &ReceiptRef) -> Result<String, PortError> {
            self.check_online()?;
            if !self.files.read().await.contains_key(reference.as_str()) {
                return Err(PortError::not_found("receipt", reference));
            }
            Ok(format!("{}/{}", self.base_url.trim_end_matches('/'), reference))
        }

        async fn delete(&self, reference: &ReceiptRef) -> Result<(), PortError> {
            self.check_online()?;
            self.files
                .write()
                .await
                .remove(reference.as_str())
                .map(|_| ())
                .ok_or_else(|| PortError::not_found("receipt", reference))
        }
    }
}
