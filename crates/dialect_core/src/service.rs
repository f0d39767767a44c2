//! DialectService: startup orchestration and the request-time API.
//!
//! Every process loads the catalog. The process the [`LeaderGate`] elects also
//! reconciles the store before publishing its resolver; followers publish
//! straight from config and never touch the store.

use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::catalog::DialectCatalog;
use crate::error::{DialectError, Result};
use crate::ports::{DialectStore, LeaderGate};
use crate::reconcile::{ReconcileOptions, ReconcileReport, ReconciliationEngine};
use crate::resolver::LanguageResolver;
use crate::types::DialectDescriptor;
use crate::validation::{self, ValidationDispatchTable, Violation};

pub struct DialectService {
    catalog: DialectCatalog,
    table: ValidationDispatchTable,
    resolver: ArcSwap<LanguageResolver>,
    /// Present only when this instance was write-eligible at startup.
    engine: Option<ReconciliationEngine>,
    last_report: ArcSwapOption<ReconcileReport>,
    resync_lock: Mutex<()>,
}

impl DialectService {
    pub async fn start(
        catalog: DialectCatalog,
        gate: &dyn LeaderGate,
        store: Arc<dyn DialectStore>,
        table: ValidationDispatchTable,
        options: ReconcileOptions,
    ) -> Self {
        let leader = match gate.is_write_eligible().await {
            Ok(eligible) => eligible,
            Err(e) => {
                warn!(
                    target: "dialect.service",
                    error = %e,
                    "leader check failed, continuing as read-only follower"
                );
                false
            }
        };

        for d in catalog.descriptors() {
            if !table.is_canonical(&d.parent_language) {
                warn!(
                    target: "dialect.service",
                    dialect = %d.name,
                    parent = %d.parent_language,
                    "dialect parent has no registered options validator"
                );
            }
        }

        let service = Self {
            resolver: ArcSwap::from_pointee(LanguageResolver::default()),
            engine: leader.then(|| ReconciliationEngine::new(store, options)),
            last_report: ArcSwapOption::empty(),
            resync_lock: Mutex::new(()),
            catalog,
            table,
        };

        if let Some(engine) = &service.engine {
            info!(target: "dialect.service", "write-eligible, reconciling dialect store");
            let report = engine.reconcile(&service.catalog).await;
            service.last_report.store(Some(Arc::new(report)));
        } else {
            info!(target: "dialect.service", "follower, loading dialects from config only");
        }

        service.publish();
        service
    }

    /// Explicit resync trigger. Only valid on the instance elected at startup.
    pub async fn resync(&self) -> Result<Arc<ReconcileReport>> {
        let engine = self.engine.as_ref().ok_or(DialectError::NotLeader)?;
        let _guard = self.resync_lock.lock().await;
        let report = Arc::new(engine.reconcile(&self.catalog).await);
        self.last_report.store(Some(Arc::clone(&report)));
        self.publish();
        Ok(report)
    }

    fn publish(&self) {
        let resolver = LanguageResolver::from_catalog(&self.catalog);
        info!(
            target: "dialect.service",
            dialects = resolver.len(),
            "language resolver refreshed"
        );
        self.resolver.store(Arc::new(resolver));
    }

    pub fn is_leader(&self) -> bool {
        self.engine.is_some()
    }

    pub fn last_report(&self) -> Option<Arc<ReconcileReport>> {
        self.last_report.load_full()
    }

    /// Current resolver snapshot. Cheap; hold it for the duration of a request.
    pub fn resolver(&self) -> Arc<LanguageResolver> {
        self.resolver.load_full()
    }

    pub fn catalog(&self) -> &DialectCatalog {
        &self.catalog
    }

    pub fn dispatch_table(&self) -> &ValidationDispatchTable {
        &self.table
    }

    pub fn is_dialect(&self, language: &str) -> bool {
        self.resolver.load().is_dialect(language)
    }

    pub fn resolve_parent(&self, language: &str) -> String {
        self.resolver.load().resolve_parent(language).to_string()
    }

    /// Registered canonical languages followed by dialect names.
    pub fn list_all_valid_languages(&self) -> Vec<String> {
        self.resolver
            .load()
            .list_all_valid_languages(self.table.canonical_languages())
    }

    pub fn dialects(&self) -> Vec<DialectDescriptor> {
        self.resolver.load().dialects().to_vec()
    }

    pub fn validate_options(&self, language: &str, options: &Value) -> Vec<Violation> {
        self.table.validate(&self.resolver.load(), language, options)
    }

    pub fn validate_submission_content(&self, content: &Value) -> Vec<Violation> {
        validation::validate_submission_content(&self.table, &self.resolver.load(), content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leader::StaticLeaderGate;
    use crate::memory::MemoryDialectStore;
    use crate::types::PersistedDialectRecord;
    use async_trait::async_trait;
    use serde_json::json;

    fn catalog() -> DialectCatalog {
        DialectCatalog::from_descriptors(vec![DialectDescriptor::new("gnu17", "GNU C17", "c")])
            .unwrap()
    }

    #[tokio::test]
    async fn leader_reconciles_before_publishing() {
        let store = Arc::new(MemoryDialectStore::new());
        let service = DialectService::start(
            catalog(),
            &StaticLeaderGate::leader(),
            store.clone(),
            ValidationDispatchTable::with_builtins(),
            ReconcileOptions::default(),
        )
        .await;

        assert!(service.is_leader());
        assert_eq!(store.snapshot().unwrap()["gnu17"], "c");
        assert_eq!(service.resolve_parent("gnu17"), "c");
        assert_eq!(service.last_report().unwrap().added, vec!["gnu17"]);
    }

    #[tokio::test]
    async fn follower_never_touches_the_store() {
        let store = Arc::new(MemoryDialectStore::with_records([PersistedDialectRecord::new(
            "stale", "c",
        )]));
        let service = DialectService::start(
            catalog(),
            &StaticLeaderGate::follower(),
            store.clone(),
            ValidationDispatchTable::with_builtins(),
            ReconcileOptions::default(),
        )
        .await;

        assert!(!service.is_leader());
        assert_eq!(store.write_count().unwrap(), 0);
        assert!(store.snapshot().unwrap().contains_key("stale"));
        assert!(service.is_dialect("gnu17"));
        assert!(service.last_report().is_none());
        assert!(matches!(service.resync().await, Err(DialectError::NotLeader)));
    }

    #[tokio::test]
    async fn failing_leader_check_degrades_to_follower() {
        struct Flaky;
        #[async_trait]
        impl LeaderGate for Flaky {
            async fn is_write_eligible(&self) -> Result<bool> {
                Err(DialectError::Store(anyhow::anyhow!("lock table unreachable")))
            }
        }

        let store = Arc::new(MemoryDialectStore::new());
        let service = DialectService::start(
            catalog(),
            &Flaky,
            store.clone(),
            ValidationDispatchTable::with_builtins(),
            ReconcileOptions::default(),
        )
        .await;
        assert!(!service.is_leader());
        assert!(store.snapshot().unwrap().is_empty());
        assert!(service.is_dialect("gnu17"));
    }

    #[tokio::test]
    async fn resync_is_idempotent() {
        let store = Arc::new(MemoryDialectStore::new());
        let service = DialectService::start(
            catalog(),
            &StaticLeaderGate::leader(),
            store.clone(),
            ValidationDispatchTable::with_builtins(),
            ReconcileOptions::default(),
        )
        .await;
        let writes = store.write_count().unwrap();
        let report = service.resync().await.unwrap();
        assert!(report.is_noop());
        assert_eq!(store.write_count().unwrap(), writes);
    }

    #[tokio::test]
    async fn request_api_goes_through_the_resolver() {
        let service = DialectService::start(
            catalog(),
            &StaticLeaderGate::follower(),
            Arc::new(MemoryDialectStore::new()),
            ValidationDispatchTable::with_builtins(),
            ReconcileOptions::default(),
        )
        .await;

        let languages = service.list_all_valid_languages();
        assert_eq!(languages.first().map(String::as_str), Some("cpp"));
        assert_eq!(languages.last().map(String::as_str), Some("gnu17"));
        assert_eq!(service.dialects()[0].display_name, "GNU C17");

        let v = service.validate_options("gnu17", &json!({"std": "17", "extraField": "x"}));
        assert_eq!(v.len(), 1);

        let v = service.validate_submission_content(&json!({
            "language": "gnu17",
            "code": "",
            "compileAndRunOptions": {"O": "2"}
        }));
        assert!(v.is_empty());
    }
}
