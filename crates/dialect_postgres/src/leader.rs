//! Leader election over a Postgres session advisory lock.
//!
//! The first instance to take `pg_try_advisory_lock(key)` is the leader for as
//! long as its connection lives. The connection is detached from the pool so
//! it can never be handed to another task while it holds the lock; closing it
//! (or the process exiting) releases the lease.

use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::{Connection, PgConnection, PgPool};
use tokio::sync::Mutex;
use tracing::info;

use dialect_core::error::DialectError;
use dialect_core::ports::{LeaderGate, Result};

/// ASCII "codedial".
pub const DEFAULT_LOCK_KEY: i64 = 0x636f_6465_6469_616c;

pub struct PgAdvisoryLeaderGate {
    pool: PgPool,
    key: i64,
    lease: Mutex<Option<PgConnection>>,
}

impl PgAdvisoryLeaderGate {
    pub fn new(pool: PgPool) -> Self {
        Self::with_key(pool, DEFAULT_LOCK_KEY)
    }

    pub fn with_key(pool: PgPool, key: i64) -> Self {
        Self {
            pool,
            key,
            lease: Mutex::new(None),
        }
    }

    pub fn key(&self) -> i64 {
        self.key
    }

    /// Give up leadership explicitly. A no-op when not leader.
    pub async fn release(&self) -> Result<()> {
        let mut lease = self.lease.lock().await;
        if let Some(mut conn) = lease.take() {
            sqlx::query("SELECT pg_advisory_unlock($1)")
                .bind(self.key)
                .execute(&mut conn)
                .await
                .map_err(|e| DialectError::Store(anyhow!(e)))?;
            conn.close()
                .await
                .map_err(|e| DialectError::Store(anyhow!(e)))?;
            info!(target: "dialect.leader", key = self.key, "leader lease released");
        }
        Ok(())
    }
}

#[async_trait]
impl LeaderGate for PgAdvisoryLeaderGate {
    async fn is_write_eligible(&self) -> Result<bool> {
        let mut lease = self.lease.lock().await;
        if lease.is_some() {
            return Ok(true);
        }

        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| DialectError::Store(anyhow!(e)))?;

        let acquired: bool = sqlx::query_scalar("SELECT pg_try_advisory_lock($1)")
            .bind(self.key)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| DialectError::Store(anyhow!(e)))?;

        if acquired {
            info!(target: "dialect.leader", key = self.key, "acquired leader lease");
            *lease = Some(conn.detach());
        } else {
            info!(
                target: "dialect.leader",
                key = self.key,
                "leader lease held elsewhere, running as follower"
            );
        }
        Ok(acquired)
    }
}
