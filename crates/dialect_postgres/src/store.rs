//! Postgres implementation of `DialectStore`.
//!
//! All SQL is runtime-checked (sqlx::query, not sqlx::query!) so the crate
//! builds without a database. Table and column names are configurable and are
//! interpolated, so they are validated as plain identifiers up front.

use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use dialect_core::error::DialectError;
use dialect_core::ports::{DialectStore, Result};
use dialect_core::types::PersistedDialectRecord;

const SCHEMA_SQL: &str = include_str!("../migrations/0001_code_dialect.sql");

/// Where the dialect table and the submission language tag live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialectTables {
    pub dialect_table: String,
    pub submission_table: String,
    pub submission_language_column: String,
}

impl Default for DialectTables {
    fn default() -> Self {
        Self {
            dialect_table: "code_dialect".into(),
            submission_table: "submission".into(),
            submission_language_column: "code_language".into(),
        }
    }
}

impl DialectTables {
    /// Accepts `name` or `schema.name`, each part `[A-Za-z_][A-Za-z0-9_]*`.
    fn validate(&self) -> Result<()> {
        for (what, ident, allow_schema) in [
            ("dialect table", &self.dialect_table, true),
            ("submission table", &self.submission_table, true),
            ("submission language column", &self.submission_language_column, false),
        ] {
            let parts: Vec<&str> = ident.split('.').collect();
            let ok = (parts.len() == 1 || (allow_schema && parts.len() == 2))
                && parts.iter().all(|p| is_identifier(p));
            if !ok {
                return Err(DialectError::Config(format!(
                    "invalid {what} identifier '{ident}'"
                )));
            }
        }
        Ok(())
    }
}

/// Double-quote each dotted part; identifiers are validated first, so they
/// never contain quotes.
fn quoted(ident: &str) -> String {
    ident
        .split('.')
        .map(|part| format!("\"{part}\""))
        .collect::<Vec<_>>()
        .join(".")
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn store_err(e: sqlx::Error) -> DialectError {
    DialectError::Store(anyhow!(e))
}

/// Postgres-backed dialect store.
pub struct PgDialectStore {
    pool: PgPool,
    tables: DialectTables,
}

impl PgDialectStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            tables: DialectTables::default(),
        }
    }

    pub fn with_tables(pool: PgPool, tables: DialectTables) -> Result<Self> {
        tables.validate()?;
        Ok(Self { pool, tables })
    }

    pub fn tables(&self) -> &DialectTables {
        &self.tables
    }

    fn dialect_table(&self) -> String {
        quoted(&self.tables.dialect_table)
    }

    /// Create the dialect table if it does not exist. The submission table is
    /// owned elsewhere and is never created here.
    pub async fn ensure_schema(&self) -> Result<()> {
        let ddl = SCHEMA_SQL.replace("{dialect_table}", &self.dialect_table());
        sqlx::raw_sql(&ddl)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    fn retag_sql(&self) -> String {
        format!(
            "UPDATE {table} SET {col} = $1 WHERE {col} = $2",
            table = quoted(&self.tables.submission_table),
            col = quoted(&self.tables.submission_language_column),
        )
    }
}

#[async_trait]
impl DialectStore for PgDialectStore {
    async fn find_all(&self) -> Result<Vec<PersistedDialectRecord>> {
        let query = format!(
            "SELECT dialect_name, parent_language FROM {} ORDER BY dialect_name",
            self.dialect_table()
        );
        let rows = sqlx::query_as::<_, (String, String)>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(rows
            .into_iter()
            .map(|(name, parent)| PersistedDialectRecord::new(name, parent))
            .collect())
    }

    async fn insert_many(&self, records: &[PersistedDialectRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let names: Vec<&str> = records.iter().map(|r| r.dialect_name.as_str()).collect();
        let parents: Vec<&str> = records.iter().map(|r| r.parent_language.as_str()).collect();
        let query = format!(
            r#"
            INSERT INTO {} (dialect_name, parent_language)
            SELECT * FROM UNNEST($1::varchar[], $2::varchar[])
            "#,
            self.dialect_table()
        );
        sqlx::query(&query)
            .bind(names)
            .bind(parents)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn update_one(&self, dialect_name: &str, parent_language: &str) -> Result<bool> {
        let query = format!(
            "UPDATE {} SET parent_language = $2 WHERE dialect_name = $1",
            self.dialect_table()
        );
        let result = sqlx::query(&query)
            .bind(dialect_name)
            .bind(parent_language)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_one(&self, dialect_name: &str) -> Result<bool> {
        let query = format!(
            "DELETE FROM {} WHERE dialect_name = $1",
            self.dialect_table()
        );
        let result = sqlx::query(&query)
            .bind(dialect_name)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_cascade(&self, dialect_name: &str, parent_language: &str) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL READ COMMITTED")
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;

        let retagged = sqlx::query(&self.retag_sql())
            .bind(parent_language)
            .bind(dialect_name)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?
            .rows_affected();

        let delete = format!(
            "DELETE FROM {} WHERE dialect_name = $1",
            self.dialect_table()
        );
        sqlx::query(&delete)
            .bind(dialect_name)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;

        // Dropping `tx` on any early return above rolls back.
        tx.commit().await.map_err(store_err)?;

        debug!(
            target: "dialect.postgres",
            dialect = %dialect_name,
            parent = %parent_language,
            retagged,
            "cascade committed"
        );
        Ok(retagged)
    }

    async fn retag_submissions(&self, from: &str, to: &str) -> Result<u64> {
        let result = sqlx::query(&self.retag_sql())
            .bind(to)
            .bind(from)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(result.rows_affected())
    }
}
