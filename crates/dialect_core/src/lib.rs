//! Code dialect core.
//!
//! Keeps the persisted `code_dialect` table in step with the configured
//! dialect catalog, and resolves which options schema governs a submission
//! tagged with a canonical language or a dialect.
//!
//! Storage and leader election sit behind the traits in [`ports`]; the
//! Postgres implementations live in `dialect_postgres`.

pub mod catalog;
pub mod error;
pub mod leader;
pub mod memory;
pub mod ports;
pub mod reconcile;
pub mod resolver;
pub mod service;
pub mod types;
pub mod validation;

pub use catalog::{CatalogLoader, DialectCatalog};
pub use error::{DialectError, Result};
pub use leader::StaticLeaderGate;
pub use memory::MemoryDialectStore;
pub use ports::{DialectStore, LeaderGate};
pub use reconcile::{
    ParentChangePolicy, ReconcileFailure, ReconcileOptions, ReconcilePhase, ReconcileReport,
    ReconciliationEngine,
};
pub use resolver::LanguageResolver;
pub use service::DialectService;
pub use types::{CodeLanguage, DialectDescriptor, PersistedDialectRecord};
pub use validation::{OptionsValidator, ValidationDispatchTable, Violation, ViolationKind};
