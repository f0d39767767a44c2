//! Domain types shared by the catalog, the store port and the engine.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

/// Column width of `code_dialect.dialect_name` / `parent_language`.
pub const MAX_DIALECT_NAME_LEN: usize = 50;

/// A dialect as declared in configuration. Authoritative for the lifetime of
/// the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialectDescriptor {
    pub name: String,
    pub display_name: String,
    pub parent_language: String,
}

impl DialectDescriptor {
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        parent_language: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            parent_language: parent_language.into(),
        }
    }

    pub fn to_record(&self) -> PersistedDialectRecord {
        PersistedDialectRecord::new(&self.name, &self.parent_language)
    }
}

/// Durable mirror of a reconciled descriptor (`code_dialect` row).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedDialectRecord {
    pub dialect_name: String,
    pub parent_language: String,
}

impl PersistedDialectRecord {
    pub fn new(dialect_name: impl Into<String>, parent_language: impl Into<String>) -> Self {
        Self {
            dialect_name: dialect_name.into(),
            parent_language: parent_language.into(),
        }
    }
}

/// Canonical languages with a built-in options schema.
///
/// The validator registry is keyed by string, so this list is not closed:
/// anything registered at runtime is canonical too.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumIter,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CodeLanguage {
    Cpp,
    C,
    Cuda,
    Java,
    Kotlin,
    Pascal,
    Python,
    Rust,
    Swift,
    Go,
    Haskell,
    #[serde(rename = "csharp")]
    #[strum(serialize = "csharp")]
    CSharp,
    #[serde(rename = "fsharp")]
    #[strum(serialize = "fsharp")]
    FSharp,
}

impl CodeLanguage {
    pub fn all() -> impl Iterator<Item = CodeLanguage> {
        Self::iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn code_language_round_trips_through_strings() {
        assert_eq!(CodeLanguage::CSharp.as_ref(), "csharp");
        assert_eq!(CodeLanguage::from_str("fsharp").unwrap(), CodeLanguage::FSharp);
        assert_eq!(CodeLanguage::Cpp.to_string(), "cpp");
        assert!(CodeLanguage::from_str("gnu17").is_err());
    }

    #[test]
    fn thirteen_builtin_languages() {
        assert_eq!(CodeLanguage::all().count(), 13);
    }

    #[test]
    fn descriptor_uses_camel_case_fields() {
        let d = DialectDescriptor::new("gnu17", "GNU C17", "c");
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["displayName"], "GNU C17");
        assert_eq!(json["parentLanguage"], "c");
        assert_eq!(d.to_record(), PersistedDialectRecord::new("gnu17", "c"));
    }
}
