//! Property tests: convergence, conservation of submissions, idempotence,
//! resolver fixed points and the options whitelist.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use proptest::prelude::*;
use serde_json::{json, Map, Value};

use dialect_core::validation::builtin::schema_for;
use dialect_core::{
    CodeLanguage, DialectCatalog, DialectDescriptor, LanguageResolver, MemoryDialectStore,
    PersistedDialectRecord, ReconcileOptions, ReconciliationEngine, ValidationDispatchTable,
    ViolationKind,
};

const CANONICAL: [&str; 4] = ["c", "cpp", "rust", "go"];

fn dialect_name() -> impl Strategy<Value = String> {
    (0..6usize).prop_map(|i| format!("d{i}"))
}

fn canonical() -> impl Strategy<Value = String> {
    prop::sample::select(CANONICAL.to_vec()).prop_map(str::to_string)
}

fn mapping() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map(dialect_name(), canonical(), 0..6)
}

fn submissions() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop_oneof![dialect_name(), canonical()],
        0..30,
    )
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

fn count(tags: &[String]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for t in tags {
        *counts.entry(t.clone()).or_insert(0) += 1;
    }
    counts
}

proptest! {
    #[test]
    fn reconciliation_converges_without_losing_submissions(
        config in mapping(),
        persisted in mapping(),
        tags in submissions(),
    ) {
        let catalog = DialectCatalog::from_descriptors(
            config.iter().map(|(n, p)| DialectDescriptor::new(n, n, p)).collect(),
        ).unwrap();
        let store = Arc::new(
            MemoryDialectStore::with_records(
                persisted.iter().map(|(n, p)| PersistedDialectRecord::new(n, p)),
            )
            .with_submissions(tags.clone()),
        );
        let engine = ReconciliationEngine::new(store.clone(), ReconcileOptions::default());
        let rt = runtime();

        let report = rt.block_on(engine.reconcile(&catalog));
        prop_assert!(report.is_complete());
        prop_assert_eq!(store.snapshot().unwrap(), config.clone());

        // Every cascaded dialect's submissions land on its old parent.
        let mut expected = count(&tags);
        for name in &report.deleted {
            let moved = expected.remove(name).unwrap_or(0);
            *expected.entry(persisted[name].clone()).or_insert(0) += moved;
        }
        for (tag, n) in &expected {
            prop_assert_eq!(store.submission_count(tag).unwrap(), *n);
        }
        prop_assert_eq!(store.submission_total().unwrap(), tags.len());

        let writes = store.write_count().unwrap();
        let second = rt.block_on(engine.reconcile(&catalog));
        prop_assert!(second.is_noop());
        prop_assert_eq!(store.write_count().unwrap(), writes);
    }

    #[test]
    fn non_dialects_resolve_to_themselves(
        config in mapping(),
        name in "[a-z+]{1,8}",
    ) {
        let catalog = DialectCatalog::from_descriptors(
            config.iter().map(|(n, p)| DialectDescriptor::new(n, n, p)).collect(),
        ).unwrap();
        let resolver = LanguageResolver::from_catalog(&catalog);
        prop_assume!(!config.contains_key(&name));
        prop_assert!(!resolver.is_dialect(&name));
        prop_assert_eq!(resolver.resolve_parent(&name), name.as_str());
    }

    #[test]
    fn unknown_option_keys_are_always_reported(
        extra in prop::collection::btree_set("[a-z]{2,10}_x", 1..5),
    ) {
        let table = ValidationDispatchTable::with_builtins();
        let resolver = LanguageResolver::default();
        let mut options = Map::new();
        options.insert("std".into(), json!("17"));
        for key in &extra {
            options.insert(key.clone(), json!("anything"));
        }

        let violations = table.validate(&resolver, "c", &Value::Object(options));

        prop_assert_eq!(violations.len(), extra.len());
        for v in &violations {
            prop_assert_eq!(v.kind, ViolationKind::NotWhitelisted);
            prop_assert!(extra.contains(&v.property));
        }
    }

    #[test]
    fn payloads_of_recognized_valid_fields_pass(
        compiler in prop::option::of(prop::sample::select(vec!["gcc", "clang"])),
        standard in prop::option::of(prop::sample::select(vec!["89", "99", "11", "17", "23"])),
        opt in prop::option::of(prop::sample::select(vec!["0", "1", "2", "3", "fast"])),
        arch in prop::option::of(prop::sample::select(vec!["64", "32", "x32"])),
    ) {
        let mut options = Map::new();
        for (k, v) in [("compiler", compiler), ("std", standard), ("O", opt), ("m", arch)] {
            if let Some(v) = v {
                options.insert(k.into(), json!(v));
            }
        }
        let table = ValidationDispatchTable::with_builtins();
        let resolver = LanguageResolver::from_catalog(
            &DialectCatalog::from_descriptors(vec![DialectDescriptor::new("gnu17", "GNU C17", "c")])
                .unwrap(),
        );
        let payload = Value::Object(options);
        prop_assert!(table.validate(&resolver, "c", &payload).is_empty());
        prop_assert!(table.validate(&resolver, "gnu17", &payload).is_empty());
    }
}

#[test]
fn every_builtin_schema_accepts_an_empty_payload() {
    let table = ValidationDispatchTable::with_builtins();
    let resolver = LanguageResolver::default();
    for language in CodeLanguage::all() {
        assert!(schema_for(language).field_names().count() <= 4);
        assert!(
            table.validate(&resolver, language.as_ref(), &json!({})).is_empty(),
            "{language} rejected empty options"
        );
    }
}
