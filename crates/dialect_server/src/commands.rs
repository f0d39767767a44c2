//! Subcommand bodies. Everything except `sync` works from the catalog alone.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use dialect_core::validation::validate_submission_content;
use dialect_core::{
    CatalogLoader, DialectCatalog, DialectDescriptor, DialectService, DialectStore, LanguageResolver,
    LeaderGate, ReconcileOptions, ReconcileReport, StaticLeaderGate, ValidationDispatchTable, Violation,
};
use dialect_postgres::{PgAdapters, PgAdvisoryLeaderGate, PgDialectStore};

use crate::settings::{LeaderMode, SyncArgs, ValidateArgs};

pub fn load_catalog(path: &Path) -> Result<DialectCatalog> {
    CatalogLoader::load_path(path)
        .with_context(|| format!("Failed to load dialect catalog from {}", path.display()))
}

#[derive(Debug, Serialize)]
pub struct SyncOutcome {
    pub leader: bool,
    pub report: Option<ReconcileReport>,
}

impl SyncOutcome {
    pub fn is_complete(&self) -> bool {
        self.report.as_ref().map_or(true, ReconcileReport::is_complete)
    }
}

pub async fn sync(catalog: DialectCatalog, args: &SyncArgs) -> Result<SyncOutcome> {
    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .connect(&args.database_url)
        .await
        .context("Failed to connect to database")?;
    info!("Connected to database");

    let adapters = PgAdapters::new(pool, (&args.tables).into(), args.lock_key)
        .context("Invalid table configuration")?;
    adapters
        .store
        .ensure_schema()
        .await
        .context("Failed to create dialect table")?;

    run_sync(
        catalog,
        adapters.store,
        adapters.leader,
        args.leader,
        args.reconcile_options(),
    )
    .await
}

async fn run_sync(
    catalog: DialectCatalog,
    store: PgDialectStore,
    advisory: PgAdvisoryLeaderGate,
    mode: LeaderMode,
    options: ReconcileOptions,
) -> Result<SyncOutcome> {
    let always = StaticLeaderGate::leader();
    let never = StaticLeaderGate::follower();
    let gate: &dyn LeaderGate = match mode {
        LeaderMode::Advisory => &advisory,
        LeaderMode::Always => &always,
        LeaderMode::Never => &never,
    };
    let store: Arc<dyn DialectStore> = Arc::new(store);

    let service = DialectService::start(
        catalog,
        gate,
        store,
        ValidationDispatchTable::with_builtins(),
        options,
    )
    .await;

    let outcome = SyncOutcome {
        leader: service.is_leader(),
        report: service.last_report().map(|r| (*r).clone()),
    };

    if mode == LeaderMode::Advisory {
        advisory
            .release()
            .await
            .context("Failed to release leader lease")?;
    }
    Ok(outcome)
}

pub fn languages(catalog: &DialectCatalog) -> Vec<String> {
    let table = ValidationDispatchTable::with_builtins();
    LanguageResolver::from_catalog(catalog).list_all_valid_languages(table.canonical_languages())
}

pub fn dialects(catalog: &DialectCatalog) -> Vec<DialectDescriptor> {
    catalog.descriptors().to_vec()
}

pub fn validate(catalog: &DialectCatalog, args: &ValidateArgs) -> Result<Vec<Violation>> {
    let table = ValidationDispatchTable::with_builtins();
    let resolver = LanguageResolver::from_catalog(catalog);

    if let Some(body) = &args.submission {
        let content: Value =
            serde_json::from_str(body).context("Submission body is not valid JSON")?;
        return Ok(validate_submission_content(&table, &resolver, &content));
    }

    let language = args
        .language
        .as_deref()
        .context("Either --language or --submission is required")?;
    let options: Value =
        serde_json::from_str(&args.options).context("Options payload is not valid JSON")?;
    Ok(table.validate(&resolver, language, &options))
}
