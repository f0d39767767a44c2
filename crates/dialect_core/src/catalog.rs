//! Configuration catalog loader
//!
//! Reads the `preference.codeDialects.dialects` list out of the application
//! config file and validates it. Any malformed descriptor fails the whole
//! load; nothing downstream ever sees a partial catalog.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::{DialectError, Result};
use crate::types::{DialectDescriptor, MAX_DIALECT_NAME_LEN};

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    preference: Option<PreferenceSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreferenceSection {
    #[serde(default)]
    code_dialects: Option<CodeDialectsSection>,
}

#[derive(Debug, Default, Deserialize)]
struct CodeDialectsSection {
    #[serde(default)]
    dialects: Vec<RawDescriptor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDescriptor {
    name: Option<String>,
    display_name: Option<String>,
    parent_language: Option<String>,
}

/// The validated, ordered descriptor set declared in configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialectCatalog {
    descriptors: Vec<DialectDescriptor>,
}

impl DialectCatalog {
    /// Build a catalog from already-constructed descriptors, applying the same
    /// checks as the file loader.
    pub fn from_descriptors(descriptors: Vec<DialectDescriptor>) -> Result<Self> {
        let mut seen = HashSet::new();
        for (index, d) in descriptors.iter().enumerate() {
            check_identifier(index, "name", &d.name)?;
            check_identifier(index, "parentLanguage", &d.parent_language)?;
            if !seen.insert(d.name.as_str()) {
                return Err(DialectError::InvalidDescriptor {
                    index,
                    reason: format!("duplicate dialect name '{}'", d.name),
                });
            }
        }
        Ok(Self { descriptors })
    }

    pub fn descriptors(&self) -> &[DialectDescriptor] {
        &self.descriptors
    }

    pub fn get(&self, name: &str) -> Option<&DialectDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

fn check_identifier(index: usize, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DialectError::InvalidDescriptor {
            index,
            reason: format!("missing {field}"),
        });
    }
    if value.chars().count() > MAX_DIALECT_NAME_LEN {
        return Err(DialectError::InvalidDescriptor {
            index,
            reason: format!("{field} '{value}' exceeds {MAX_DIALECT_NAME_LEN} characters"),
        });
    }
    Ok(())
}

pub struct CatalogLoader;

impl CatalogLoader {
    /// Parse a YAML (or JSON) config document.
    pub fn parse(content: &str) -> Result<DialectCatalog> {
        // An empty document deserializes to unit, not to an empty mapping.
        if content.trim().is_empty() {
            return Ok(DialectCatalog::default());
        }

        let file: ConfigFile =
            serde_yaml::from_str(content).map_err(|e| DialectError::Config(e.to_string()))?;

        let raw = file
            .preference
            .and_then(|p| p.code_dialects)
            .map(|c| c.dialects)
            .unwrap_or_default();

        let descriptors = raw
            .into_iter()
            .enumerate()
            .map(|(index, r)| {
                let name = r.name.ok_or_else(|| DialectError::InvalidDescriptor {
                    index,
                    reason: "missing name".into(),
                })?;
                let parent_language =
                    r.parent_language
                        .ok_or_else(|| DialectError::InvalidDescriptor {
                            index,
                            reason: "missing parentLanguage".into(),
                        })?;
                let display_name = r.display_name.unwrap_or_else(|| name.clone());
                Ok(DialectDescriptor {
                    name,
                    display_name,
                    parent_language,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        DialectCatalog::from_descriptors(descriptors)
    }

    pub fn load_path(path: impl AsRef<Path>) -> Result<DialectCatalog> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DialectError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let catalog = Self::parse(&content)?;
        info!(
            target: "dialect.catalog",
            path = %path.display(),
            dialects = catalog.len(),
            "loaded dialect catalog"
        );
        Ok(catalog)
    }
}
