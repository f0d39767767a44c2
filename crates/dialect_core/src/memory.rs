//! In-memory DialectStore for tests and single-process use.
//!
//! Holds both the dialect table and a flat list of submission language tags so
//! the cascade can be observed end to end. Every mutating call that changes
//! state bumps a write counter.

use std::collections::{BTreeMap, HashSet};
use std::sync::RwLock;

use anyhow::anyhow;
use async_trait::async_trait;

use crate::error::DialectError;
use crate::ports::{DialectStore, Result};
use crate::types::PersistedDialectRecord;

#[derive(Debug, Default)]
struct MemoryState {
    dialects: BTreeMap<String, String>,
    submissions: Vec<String>,
    writes: u64,
}

#[derive(Debug, Default)]
pub struct MemoryDialectStore {
    inner: RwLock<MemoryState>,
    failing_cascades: RwLock<HashSet<String>>,
}

impl MemoryDialectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = PersistedDialectRecord>) -> Self {
        let store = Self::new();
        if let Ok(mut state) = store.inner.write() {
            for r in records {
                state.dialects.insert(r.dialect_name, r.parent_language);
            }
        }
        store
    }

    /// Seed submissions, one entry per submission, by language tag.
    pub fn with_submissions<S: Into<String>>(self, tags: impl IntoIterator<Item = S>) -> Self {
        if let Ok(mut state) = self.inner.write() {
            state.submissions.extend(tags.into_iter().map(Into::into));
        }
        self
    }

    /// Make every subsequent cascade for `dialect_name` fail before any change
    /// is applied.
    pub fn fail_cascade_for(&self, dialect_name: &str) {
        if let Ok(mut failing) = self.failing_cascades.write() {
            failing.insert(dialect_name.to_string());
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut failing) = self.failing_cascades.write() {
            failing.clear();
        }
    }

    /// Insert a submission directly, as a request-path writer would.
    pub fn insert_submission(&self, tag: &str) -> Result<()> {
        self.write()?.submissions.push(tag.to_string());
        Ok(())
    }

    pub fn submission_count(&self, tag: &str) -> Result<usize> {
        Ok(self.read()?.submissions.iter().filter(|t| t.as_str() == tag).count())
    }

    pub fn submission_total(&self) -> Result<usize> {
        Ok(self.read()?.submissions.len())
    }

    pub fn snapshot(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.read()?.dialects.clone())
    }

    pub fn write_count(&self) -> Result<u64> {
        Ok(self.read()?.writes)
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, MemoryState>> {
        self.inner
            .read()
            .map_err(|e| DialectError::Store(anyhow!("Lock: {}", e)))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, MemoryState>> {
        self.inner
            .write()
            .map_err(|e| DialectError::Store(anyhow!("Lock: {}", e)))
    }

    fn cascade_should_fail(&self, dialect_name: &str) -> Result<bool> {
        let failing = self
            .failing_cascades
            .read()
            .map_err(|e| DialectError::Store(anyhow!("Lock: {}", e)))?;
        Ok(failing.contains(dialect_name))
    }
}

fn retag(submissions: &mut [String], from: &str, to: &str) -> u64 {
    let mut count = 0;
    for tag in submissions.iter_mut().filter(|t| t.as_str() == from) {
        *tag = to.to_string();
        count += 1;
    }
    count
}

#[async_trait]
impl DialectStore for MemoryDialectStore {
    async fn find_all(&self) -> Result<Vec<PersistedDialectRecord>> {
        Ok(self
            .read()?
            .dialects
            .iter()
            .map(|(name, parent)| PersistedDialectRecord::new(name, parent))
            .collect())
    }

    async fn insert_many(&self, records: &[PersistedDialectRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut state = self.write()?;
        if let Some(dup) = records
            .iter()
            .find(|r| state.dialects.contains_key(&r.dialect_name))
        {
            return Err(DialectError::Store(anyhow!(
                "duplicate key: dialect '{}' already exists",
                dup.dialect_name
            )));
        }
        for r in records {
            state
                .dialects
                .insert(r.dialect_name.clone(), r.parent_language.clone());
        }
        state.writes += 1;
        Ok(())
    }

    async fn update_one(&self, dialect_name: &str, parent_language: &str) -> Result<bool> {
        let mut guard = self.write()?;
        let state = &mut *guard;
        match state.dialects.get_mut(dialect_name) {
            Some(parent) => {
                *parent = parent_language.to_string();
                state.writes += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_one(&self, dialect_name: &str) -> Result<bool> {
        let mut state = self.write()?;
        let removed = state.dialects.remove(dialect_name).is_some();
        if removed {
            state.writes += 1;
        }
        Ok(removed)
    }

    async fn delete_cascade(&self, dialect_name: &str, parent_language: &str) -> Result<u64> {
        if self.cascade_should_fail(dialect_name)? {
            return Err(DialectError::Store(anyhow!(
                "could not obtain lock on row in relation \"submission\" while cascading '{}'",
                dialect_name
            )));
        }
        // One guard for both steps: the memory equivalent of the transaction.
        let mut guard = self.write()?;
        let state = &mut *guard;
        let retagged = retag(&mut state.submissions, dialect_name, parent_language);
        state.dialects.remove(dialect_name);
        state.writes += 1;
        Ok(retagged)
    }

    async fn retag_submissions(&self, from: &str, to: &str) -> Result<u64> {
        let mut guard = self.write()?;
        let state = &mut *guard;
        let retagged = retag(&mut state.submissions, from, to);
        if retagged > 0 {
            state.writes += 1;
        }
        Ok(retagged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> MemoryDialectStore {
        MemoryDialectStore::with_records([PersistedDialectRecord::new("gnu17", "c")])
            .with_submissions(["gnu17", "gnu17", "c", "cpp"])
    }

    #[tokio::test]
    async fn cascade_retags_then_deletes() {
        let store = seeded();
        let retagged = store.delete_cascade("gnu17", "c").await.unwrap();
        assert_eq!(retagged, 2);
        assert_eq!(store.submission_count("gnu17").unwrap(), 0);
        assert_eq!(store.submission_count("c").unwrap(), 3);
        assert!(store.snapshot().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failing_cascade_changes_nothing() {
        let store = seeded();
        store.fail_cascade_for("gnu17");
        assert!(store.delete_cascade("gnu17", "c").await.is_err());
        assert_eq!(store.submission_count("gnu17").unwrap(), 2);
        assert_eq!(store.snapshot().unwrap().len(), 1);
        assert_eq!(store.write_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn insert_many_rejects_existing_key() {
        let store = seeded();
        let err = store
            .insert_many(&[PersistedDialectRecord::new("gnu17", "cpp")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("duplicate key"));
        assert_eq!(store.snapshot().unwrap()["gnu17"], "c");
    }

    #[tokio::test]
    async fn update_and_delete_report_presence() {
        let store = seeded();
        assert!(store.update_one("gnu17", "cpp").await.unwrap());
        assert!(!store.update_one("missing", "cpp").await.unwrap());
        assert!(store.delete_one("gnu17").await.unwrap());
        assert!(!store.delete_one("gnu17").await.unwrap());
        assert_eq!(store.write_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn empty_retag_is_not_a_write() {
        let store = seeded();
        assert_eq!(store.retag_submissions("rust", "c").await.unwrap(), 0);
        assert_eq!(store.write_count().unwrap(), 0);
    }
}
