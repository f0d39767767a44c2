//! Reconciliation of the persisted dialect table against the config catalog.
//!
//! Three phases, strictly in order:
//! 1. cascade-delete every persisted dialect that left the config (or whose
//!    parent changed, under [`ParentChangePolicy::RewriteHistory`]),
//! 2. bulk-insert every config dialect not present after phase 1,
//! 3. repoint in place any record whose parent still differs
//!    (only reachable under [`ParentChangePolicy::RepointOnly`]).
//!
//! Each cascade is its own transaction. A failing dialect is recorded in the
//! report and skipped; it keeps its old record and is retried next run.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use tracing::{debug, info, warn};

use crate::catalog::DialectCatalog;
use crate::ports::DialectStore;
use crate::types::PersistedDialectRecord;

/// What happens to history when a dialect's parent changes in config.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ParentChangePolicy {
    /// Retag submissions to the old parent, then recreate under the new one.
    #[default]
    RewriteHistory,
    /// Update the record in place; submissions keep the dialect tag.
    RepointOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileOptions {
    pub parent_change: ParentChangePolicy,
    /// Re-run the retag predicate once after each committed cascade.
    pub resweep_after_cascade: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            parent_change: ParentChangePolicy::RewriteHistory,
            resweep_after_cascade: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReconcilePhase {
    Read,
    Delete,
    Resweep,
    Insert,
    Update,
}

/// One skipped step. The pass carried on without it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileFailure {
    pub phase: ReconcilePhase,
    pub dialects: Vec<String>,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub deleted: Vec<String>,
    pub added: Vec<String>,
    pub updated: Vec<String>,
    /// Submissions retagged inside cascades.
    pub retagged: u64,
    /// Submissions caught by the post-cascade resweep.
    pub resweep_retagged: u64,
    pub failures: Vec<ReconcileFailure>,
}

impl ReconcileReport {
    /// True when the pass wrote nothing.
    pub fn is_noop(&self) -> bool {
        self.deleted.is_empty()
            && self.added.is_empty()
            && self.updated.is_empty()
            && self.retagged == 0
            && self.resweep_retagged == 0
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, phase: ReconcilePhase, dialects: Vec<String>, error: impl ToString) {
        self.failures.push(ReconcileFailure {
            phase,
            dialects,
            error: error.to_string(),
        });
    }
}

pub struct ReconciliationEngine {
    store: Arc<dyn DialectStore>,
    options: ReconcileOptions,
}

impl ReconciliationEngine {
    pub fn new(store: Arc<dyn DialectStore>, options: ReconcileOptions) -> Self {
        Self { store, options }
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// Run one full pass. Never fails; everything that went wrong is in the
    /// returned report's `failures`.
    pub async fn reconcile(&self, catalog: &DialectCatalog) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        let persisted_rows = match self.store.find_all().await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(
                    target: "dialect.reconcile",
                    error = %e,
                    "could not read persisted dialects, skipping reconciliation"
                );
                report.fail(ReconcilePhase::Read, Vec::new(), e);
                return report;
            }
        };

        let configured: BTreeMap<&str, &str> = catalog
            .descriptors()
            .iter()
            .map(|d| (d.name.as_str(), d.parent_language.as_str()))
            .collect();
        let mut persisted: BTreeMap<String, String> = persisted_rows
            .into_iter()
            .map(|r| (r.dialect_name, r.parent_language))
            .collect();

        // ── Phase 1: cascade deletes ──

        let doomed: BTreeMap<String, String> = persisted
            .iter()
            .filter(|(name, parent)| match configured.get(name.as_str()) {
                None => true,
                Some(wanted) => {
                    *wanted != parent.as_str()
                        && self.options.parent_change == ParentChangePolicy::RewriteHistory
                }
            })
            .map(|(n, p)| (n.clone(), p.clone()))
            .collect();

        for (name, parent) in deletion_order(&doomed) {
            match self.store.delete_cascade(&name, &parent).await {
                Ok(retagged) => {
                    info!(
                        target: "dialect.reconcile",
                        dialect = %name,
                        parent = %parent,
                        retagged,
                        "deleted dialect, submissions retagged to parent"
                    );
                    report.retagged += retagged;
                    persisted.remove(&name);
                    report.deleted.push(name.clone());

                    // A name that stays configured is re-inserted below, so
                    // later submissions under it belong to the new parent.
                    if self.options.resweep_after_cascade
                        && !configured.contains_key(name.as_str())
                    {
                        self.resweep(&name, &parent, &mut report).await;
                    }
                }
                Err(e) => {
                    warn!(
                        target: "dialect.reconcile",
                        dialect = %name,
                        parent = %parent,
                        error = %e,
                        "cascade failed, dialect left in place until next reconciliation"
                    );
                    report.fail(ReconcilePhase::Delete, vec![name], e);
                }
            }
        }

        // ── Phase 2: inserts ──

        let additions: Vec<PersistedDialectRecord> = catalog
            .descriptors()
            .iter()
            .filter(|d| !persisted.contains_key(&d.name))
            .map(|d| d.to_record())
            .collect();

        if !additions.is_empty() {
            let names: Vec<String> = additions.iter().map(|r| r.dialect_name.clone()).collect();
            match self.store.insert_many(&additions).await {
                Ok(()) => {
                    info!(
                        target: "dialect.reconcile",
                        dialects = %names.join(", "),
                        "added dialects"
                    );
                    for r in additions {
                        persisted.insert(r.dialect_name, r.parent_language);
                    }
                    report.added = names;
                }
                Err(e) => {
                    warn!(
                        target: "dialect.reconcile",
                        dialects = %names.join(", "),
                        error = %e,
                        "bulk insert failed"
                    );
                    report.fail(ReconcilePhase::Insert, names, e);
                }
            }
        }

        // ── Phase 3: in-place updates ──

        // Under RewriteHistory a mismatch here means the cascade failed; the
        // record must keep its old parent until a cascade succeeds.
        let repoint_allowed = self.options.parent_change == ParentChangePolicy::RepointOnly;
        let repoints: Vec<(&str, &str)> = catalog
            .descriptors()
            .iter()
            .filter(|_| repoint_allowed)
            .filter(|d| {
                persisted
                    .get(&d.name)
                    .is_some_and(|current| *current != d.parent_language)
            })
            .map(|d| (d.name.as_str(), d.parent_language.as_str()))
            .collect();

        for (name, parent) in repoints {
            match self.store.update_one(name, parent).await {
                Ok(true) => {
                    info!(
                        target: "dialect.reconcile",
                        dialect = %name,
                        parent = %parent,
                        "repointed dialect"
                    );
                    report.updated.push(name.to_string());
                }
                Ok(false) => {
                    warn!(
                        target: "dialect.reconcile",
                        dialect = %name,
                        "dialect vanished before repoint"
                    );
                    report.fail(
                        ReconcilePhase::Update,
                        vec![name.to_string()],
                        "record not found",
                    );
                }
                Err(e) => {
                    warn!(
                        target: "dialect.reconcile",
                        dialect = %name,
                        error = %e,
                        "repoint failed"
                    );
                    report.fail(ReconcilePhase::Update, vec![name.to_string()], e);
                }
            }
        }

        info!(
            target: "dialect.reconcile",
            deleted = report.deleted.len(),
            added = report.added.len(),
            updated = report.updated.len(),
            retagged = report.retagged + report.resweep_retagged,
            failures = report.failures.len(),
            "reconciliation finished"
        );

        report
    }

    async fn resweep(&self, name: &str, parent: &str, report: &mut ReconcileReport) {
        match self.store.retag_submissions(name, parent).await {
            Ok(0) => {}
            Ok(late) => {
                debug!(
                    target: "dialect.reconcile",
                    dialect = %name,
                    late,
                    "resweep retagged late submissions"
                );
                report.resweep_retagged += late;
            }
            Err(e) => {
                warn!(
                    target: "dialect.reconcile",
                    dialect = %name,
                    error = %e,
                    "resweep failed"
                );
                report.fail(ReconcilePhase::Resweep, vec![name.to_string()], e);
            }
        }
    }
}

/// Order deletions so a dialect whose name is the old parent of another
/// pending deletion is removed after it. Otherwise the child's submissions
/// would be retagged to an already-deleted name. Cycles keep name order.
fn deletion_order(doomed: &BTreeMap<String, String>) -> Vec<(String, String)> {
    let mut pending: Vec<(&String, &String)> = doomed.iter().collect();
    let mut ordered = Vec::with_capacity(pending.len());

    while !pending.is_empty() {
        let ready: Vec<usize> = (0..pending.len())
            .filter(|&i| !pending.iter().any(|(_, parent)| *parent == pending[i].0))
            .collect();

        if ready.is_empty() {
            let stranded: Vec<&str> = pending.iter().map(|(n, _)| n.as_str()).collect();
            warn!(
                target: "dialect.reconcile",
                dialects = %stranded.join(", "),
                "dialect parents form a cycle, their submissions will keep a tag that no longer resolves"
            );
            ordered.extend(pending.drain(..).map(|(n, p)| (n.clone(), p.clone())));
            break;
        }
        for &i in ready.iter().rev() {
            let (n, p) = pending.remove(i);
            ordered.push((n.clone(), p.clone()));
        }
    }

    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDialectStore;
    use crate::types::DialectDescriptor;

    fn catalog(entries: &[(&str, &str)]) -> DialectCatalog {
        DialectCatalog::from_descriptors(
            entries
                .iter()
                .map(|(n, p)| DialectDescriptor::new(*n, n.to_uppercase(), *p))
                .collect(),
        )
        .unwrap()
    }

    fn engine(store: &Arc<MemoryDialectStore>, options: ReconcileOptions) -> ReconciliationEngine {
        ReconciliationEngine::new(store.clone(), options)
    }

    #[tokio::test]
    async fn adds_into_empty_store() {
        let store = Arc::new(MemoryDialectStore::new());
        let report = engine(&store, ReconcileOptions::default())
            .reconcile(&catalog(&[("gnu17", "c")]))
            .await;
        assert_eq!(report.added, vec!["gnu17"]);
        assert!(report.is_complete());
        assert_eq!(store.snapshot().unwrap()["gnu17"], "c");
    }

    #[tokio::test]
    async fn parent_change_rewrites_history_to_old_parent() {
        let store = Arc::new(
            MemoryDialectStore::with_records([PersistedDialectRecord::new("gnu17", "c")])
                .with_submissions(["gnu17", "gnu17", "cpp"]),
        );
        let report = engine(&store, ReconcileOptions::default())
            .reconcile(&catalog(&[("gnu17", "cpp")]))
            .await;
        assert_eq!(report.deleted, vec!["gnu17"]);
        assert_eq!(report.added, vec!["gnu17"]);
        assert!(report.updated.is_empty());
        assert_eq!(report.retagged, 2);
        assert_eq!(store.submission_count("c").unwrap(), 2);
        assert_eq!(store.submission_count("gnu17").unwrap(), 0);
        assert_eq!(store.snapshot().unwrap()["gnu17"], "cpp");
    }

    #[tokio::test]
    async fn repoint_only_keeps_history() {
        let store = Arc::new(
            MemoryDialectStore::with_records([PersistedDialectRecord::new("gnu17", "c")])
                .with_submissions(["gnu17"]),
        );
        let options = ReconcileOptions {
            parent_change: ParentChangePolicy::RepointOnly,
            ..Default::default()
        };
        let report = engine(&store, options)
            .reconcile(&catalog(&[("gnu17", "cpp")]))
            .await;
        assert!(report.deleted.is_empty());
        assert_eq!(report.updated, vec!["gnu17"]);
        assert_eq!(store.submission_count("gnu17").unwrap(), 1);
        assert_eq!(store.snapshot().unwrap()["gnu17"], "cpp");
    }

    #[tokio::test]
    async fn read_failure_is_reported_not_raised() {
        struct Broken;
        #[async_trait::async_trait]
        impl DialectStore for Broken {
            async fn find_all(&self) -> crate::Result<Vec<PersistedDialectRecord>> {
                Err(crate::DialectError::Store(anyhow::anyhow!("connection refused")))
            }
            async fn insert_many(&self, _: &[PersistedDialectRecord]) -> crate::Result<()> {
                unreachable!()
            }
            async fn update_one(&self, _: &str, _: &str) -> crate::Result<bool> {
                unreachable!()
            }
            async fn delete_one(&self, _: &str) -> crate::Result<bool> {
                unreachable!()
            }
            async fn delete_cascade(&self, _: &str, _: &str) -> crate::Result<u64> {
                unreachable!()
            }
            async fn retag_submissions(&self, _: &str, _: &str) -> crate::Result<u64> {
                unreachable!()
            }
        }

        let engine = ReconciliationEngine::new(Arc::new(Broken), ReconcileOptions::default());
        let report = engine.reconcile(&catalog(&[("gnu17", "c")])).await;
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].phase, ReconcilePhase::Read);
        assert!(report.is_noop());
    }

    #[test]
    fn deletion_order_puts_parents_last() {
        let doomed: BTreeMap<String, String> = [
            ("a".to_string(), "z".to_string()),
            ("z".to_string(), "c".to_string()),
            ("m".to_string(), "c".to_string()),
        ]
        .into_iter()
        .collect();
        let order: Vec<String> = deletion_order(&doomed).into_iter().map(|(n, _)| n).collect();
        let pos = |n: &str| order.iter().position(|x| x == n).unwrap();
        assert!(pos("a") < pos("z"));
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn deletion_order_tolerates_cycles() {
        let doomed: BTreeMap<String, String> = [
            ("a".to_string(), "b".to_string()),
            ("b".to_string(), "a".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(deletion_order(&doomed).len(), 2);
    }

    #[test]
    fn policy_parses_from_kebab_case() {
        use std::str::FromStr;
        assert_eq!(
            ParentChangePolicy::from_str("repoint-only").unwrap(),
            ParentChangePolicy::RepointOnly
        );
        assert_eq!(ParentChangePolicy::default().as_ref(), "rewrite-history");
    }
}
