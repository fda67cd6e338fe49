//! Infrastructure Database Layer
//!
//! PostgreSQL implementation of the record store port using SQLx.
//!
//! Every collection lives in one `records` table as JSONB documents. Equality
//! filters become a JSONB containment test (`data @> $filter`), and writes
//! compare-and-set on the `version` column so two reviewers racing on the
//! same claim cannot overwrite each other.

pub mod pool;
pub mod error;
pub mod record_store;

pub use pool::{create_pool, run_migrations, DatabaseConfig, DatabasePool, MIGRATOR};
pub use error::DatabaseError;
pub use record_store::PostgresRecordStore;
