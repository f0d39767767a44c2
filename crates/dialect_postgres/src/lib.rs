//! PostgreSQL adapters for the code dialect core: the `code_dialect` store and
//! an advisory-lock leader gate.

pub mod leader;
pub mod store;

pub use leader::{PgAdvisoryLeaderGate, DEFAULT_LOCK_KEY};
pub use store::{DialectTables, PgDialectStore};

use sqlx::PgPool;

/// All Postgres port implementations over one pool.
pub struct PgAdapters {
    pub store: PgDialectStore,
    pub leader: PgAdvisoryLeaderGate,
}

impl PgAdapters {
    pub fn new(pool: PgPool, tables: DialectTables, lock_key: i64) -> dialect_core::Result<Self> {
        Ok(Self {
            store: PgDialectStore::with_tables(pool.clone(), tables)?,
            leader: PgAdvisoryLeaderGate::with_key(pool, lock_key),
        })
    }
}
