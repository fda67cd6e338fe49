//! PostgreSQL Record Store Adapter
//!
//! Implements the [`RecordStore`] port over a single `records` table holding
//! JSONB documents keyed by `(collection, id)`. The `version` column is the
//! compare-and-set token: an update only matches the row when the caller's
//! expected version is still current.
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresRecordStore};
//!
//! let pool = create_pool(DatabaseConfig::new(url)).await?;
//! run_migrations(&pool).await?;
//! let store: Arc<dyn RecordStore> = Arc::new(PostgresRecordStore::new(pool));
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{
    Collection, DomainPort, HealthCheckResult, HealthCheckable, PortError, RecordFilter, RecordStore, StoredRecord,
};

use crate::error::DatabaseError;

#[derive(Debug, sqlx::FromRow)]
struct RecordRow {
    id: String,
    version: i64,
    data: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RecordRow {
    fn into_record(self) -> Result<StoredRecord, PortError> {
        let version = u64::try_from(self.version)
            .map_err(|_| PortError::transformation(format!("record {} has version {}", self.id, self.version)))?;
        Ok(StoredRecord {
            id: self.id,
            version,
            created_at: self.created_at,
            updated_at: self.updated_at,
            data: self.data,
        })
    }
}

/// Builds the JSONB document that `data @> $doc` uses to apply the filter
pub(crate) fn containment_document(filter: &RecordFilter) -> Value {
    let map: Map<String, Value> = filter.equals.iter().cloned().collect();
    Value::Object(map)
}

fn to_version(version: u64) -> Result<i64, PortError> {
    i64::try_from(version).map_err(|_| PortError::validation(format!("version {} out of range", version)))
}

/// PostgreSQL-backed implementation of the RecordStore port
#[derive(Debug, Clone)]
pub struct PostgresRecordStore {
    pool: PgPool,
}

impl PostgresRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn current_version(&self, collection: Collection, id: &str) -> Result<Option<i64>, PortError> {
        sqlx::query_scalar::<_, i64>("SELECT version FROM records WHERE collection = $1 AND id = $2")
            .bind(collection.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::from(e).into())
    }
}

impl DomainPort for PostgresRecordStore {}

#[async_trait]
impl HealthCheckable for PostgresRecordStore {
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();
        let result = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&self.pool).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult::healthy("postgres-record-store", latency_ms),
            Err(e) => HealthCheckResult::unhealthy("postgres-record-store", latency_ms, format!("Database error: {}", e)),
        }
    }
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    #[instrument(skip(self), fields(collection = %collection))]
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<StoredRecord>, PortError> {
        let row = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT id, version, data, created_at, updated_at
            FROM records
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        row.map(RecordRow::into_record).transpose()
    }

    #[instrument(skip(self, filter), fields(collection = %collection))]
    async fn list(&self, collection: Collection, filter: &RecordFilter) -> Result<Vec<StoredRecord>, PortError> {
        let limit = filter.limit.map(|l| l as i64);
        let rows = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT id, version, data, created_at, updated_at
            FROM records
            WHERE collection = $1 AND data @> $2
            ORDER BY created_at, id
            LIMIT $3
            "#,
        )
        .bind(collection.as_str())
        .bind(containment_document(filter))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        debug!(count = rows.len(), "records listed");
        rows.into_iter().map(RecordRow::into_record).collect()
    }

    #[instrument(skip(self, data), fields(collection = %collection))]
    async fn create(&self, collection: Collection, id: &str, data: Value) -> Result<StoredRecord, PortError> {
        let row = sqlx::query_as::<_, RecordRow>(
            r#"
            INSERT INTO records (collection, id, version, data, created_at, updated_at)
            VALUES ($1, $2, 1, $3, now(), now())
            RETURNING id, version, data, created_at, updated_at
            "#,
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(data)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        row.into_record()
    }

    #[instrument(skip(self, data), fields(collection = %collection))]
    async fn update(
        &self,
        collection: Collection,
        id: &str,
        expected_version: u64,
        data: Value,
    ) -> Result<StoredRecord, PortError> {
        let row = sqlx::query_as::<_, RecordRow>(
            r#"
            UPDATE records
            SET data = $4, version = version + 1, updated_at = now()
            WHERE collection = $1 AND id = $2 AND version = $3
            RETURNING id, version, data, created_at, updated_at
            "#,
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(to_version(expected_version)?)
        .bind(data)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        match row {
            Some(row) => row.into_record(),
            None => match self.current_version(collection, id).await? {
                Some(actual) => Err(PortError::VersionConflict {
                    id: id.to_string(),
                    expected: expected_version,
                    actual: actual.max(0) as u64,
                }),
                None => Err(PortError::not_found(collection.as_str(), id)),
            },
        }
    }

    #[instrument(skip(self), fields(collection = %collection))]
    async fn delete(&self, collection: Collection, id: &str) -> Result<(), PortError> {
        let result = sqlx::query("DELETE FROM records WHERE collection = $1 AND id = $2")
            .bind(collection.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        if result.rows_affected() == 0 {
            return Err(PortError::not_found(collection.as_str(), id));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(collection = %collection))]
    async fn delete_at_version(
        &self,
        collection: Collection,
        id: &str,
        expected_version: u64,
    ) -> Result<(), PortError> {
        let result = sqlx::query("DELETE FROM records WHERE collection = $1 AND id = $2 AND version = $3")
            .bind(collection.as_str())
            .bind(id)
            .bind(to_version(expected_version)?)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        if result.rows_affected() == 1 {
            return Ok(());
        }
        match self.current_version(collection, id).await? {
            Some(actual) => Err(PortError::VersionConflict {
                id: id.to_string(),
                expected: expected_version,
                actual: actual.max(0) as u64,
            }),
            None => Err(PortError::not_found(collection.as_str(), id)),
        }
    }
}
