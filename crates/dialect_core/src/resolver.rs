//! Read-only dialect → parent lookup.

use std::collections::HashMap;

use crate::catalog::DialectCatalog;
use crate::types::DialectDescriptor;
use crate::validation::ValidationDispatchTable;

/// Immutable snapshot of the dialect catalog. Rebuilt, never mutated.
#[derive(Debug, Clone, Default)]
pub struct LanguageResolver {
    parents: HashMap<String, String>,
    dialects: Vec<DialectDescriptor>,
}

impl LanguageResolver {
    pub fn from_catalog(catalog: &DialectCatalog) -> Self {
        let dialects = catalog.descriptors().to_vec();
        let parents = dialects
            .iter()
            .map(|d| (d.name.clone(), d.parent_language.clone()))
            .collect();
        Self { parents, dialects }
    }

    pub fn is_dialect(&self, name: &str) -> bool {
        self.parents.contains_key(name)
    }

    /// Parent language for a dialect; any other name maps to itself.
    pub fn resolve_parent<'a>(&'a self, name: &'a str) -> &'a str {
        self.parents.get(name).map(String::as_str).unwrap_or(name)
    }

    /// `base_languages` followed by every dialect name, in catalog order.
    pub fn list_all_valid_languages<S: AsRef<str>>(&self, base_languages: &[S]) -> Vec<String> {
        base_languages
            .iter()
            .map(|s| s.as_ref().to_string())
            .chain(self.dialects.iter().map(|d| d.name.clone()))
            .collect()
    }

    pub fn dialects(&self) -> &[DialectDescriptor] {
        &self.dialects
    }

    /// Accepts canonical languages known to `table` and known dialect names.
    pub fn is_code_language_or_dialect(&self, name: &str, table: &ValidationDispatchTable) -> bool {
        table.is_canonical(name) || self.is_dialect(name)
    }

    pub fn len(&self) -> usize {
        self.dialects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dialects.is_empty()
    }
}
