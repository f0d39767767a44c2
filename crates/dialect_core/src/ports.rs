//! Port traits implemented by storage and coordination adapters.
//!
//! `dialect_postgres` provides the production implementations;
//! [`crate::memory::MemoryDialectStore`] and [`crate::leader::StaticLeaderGate`]
//! are the in-process doubles.

use async_trait::async_trait;

pub use crate::error::Result;
use crate::types::PersistedDialectRecord;

/// Durable dialect→parent table plus the one cross-table operation the engine
/// needs over the submission table.
#[async_trait]
pub trait DialectStore: Send + Sync {
    async fn find_all(&self) -> Result<Vec<PersistedDialectRecord>>;

    async fn insert_many(&self, records: &[PersistedDialectRecord]) -> Result<()>;

    /// Repoint one record in place. Returns `false` if no such record exists.
    async fn update_one(&self, dialect_name: &str, parent_language: &str) -> Result<bool>;

    /// Returns `false` if no such record exists.
    async fn delete_one(&self, dialect_name: &str) -> Result<bool>;

    /// Atomically retag every submission tagged `dialect_name` to
    /// `parent_language`, then delete the record. All-or-nothing, at least
    /// read-committed. Returns the number of retagged submissions.
    async fn delete_cascade(&self, dialect_name: &str, parent_language: &str) -> Result<u64>;

    /// Retag submissions without touching the dialect table.
    async fn retag_submissions(&self, from: &str, to: &str) -> Result<u64>;
}

/// Cluster single-writer check. Evaluated once at startup.
#[async_trait]
pub trait LeaderGate: Send + Sync {
    async fn is_write_eligible(&self) -> Result<bool>;
}
