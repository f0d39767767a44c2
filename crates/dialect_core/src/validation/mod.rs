//! Compile-and-run options validation.
//!
//! [`ValidationDispatchTable`] maps canonical language identifiers to an
//! [`OptionsValidator`]. Dialects are resolved to their parent first, so a
//! dialect never needs its own registration. Validation is strict: keys a
//! validator does not recognize are violations in their own right.

pub mod builtin;
pub mod schema;
pub mod submission;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display};

use crate::resolver::LanguageResolver;

pub use schema::{FieldRule, SchemaValidator};
pub use submission::{validate_submission_content, MAX_CODE_LENGTH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ViolationKind {
    UnknownLanguage,
    NotWhitelisted,
    InvalidValue,
    Missing,
    NotAnObject,
}

/// One structured validation failure, suitable for returning to the caller
/// as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub property: String,
    pub kind: ViolationKind,
    pub message: String,
}

impl Violation {
    pub fn new(property: impl Into<String>, kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn unknown_language(language: &str) -> Self {
        Self::new(
            "language",
            ViolationKind::UnknownLanguage,
            format!("Unknown language: {language}"),
        )
    }

    pub fn not_whitelisted(property: &str) -> Self {
        Self::new(
            property,
            ViolationKind::NotWhitelisted,
            format!("property {property} should not exist"),
        )
    }

    /// Prefix the property path, for violations of a nested object.
    pub fn nested_under(mut self, parent: &str) -> Self {
        self.property = format!("{parent}.{}", self.property);
        self
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.property, self.message)
    }
}

/// Validation capability for one canonical language's options object.
pub trait OptionsValidator: Send + Sync {
    /// Whether `field` is part of this language's options schema.
    fn recognizes(&self, field: &str) -> bool;

    /// Check the recognized fields of `options`. Unrecognized keys are
    /// reported by the dispatch table and may be ignored here.
    fn validate_fields(&self, options: &Map<String, Value>) -> Vec<Violation>;
}

#[derive(Clone, Default)]
pub struct ValidationDispatchTable {
    validators: HashMap<String, Arc<dyn OptionsValidator>>,
    order: Vec<String>,
}

impl ValidationDispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with every built-in language schema registered.
    pub fn with_builtins() -> Self {
        let mut table = Self::new();
        for (language, validator) in builtin::builtin_validators() {
            table.register(language.as_ref(), validator);
        }
        table
    }

    /// Register or replace the validator for `language`.
    pub fn register(&mut self, language: &str, validator: impl OptionsValidator + 'static) {
        self.register_arc(language, Arc::new(validator));
    }

    pub fn register_arc(&mut self, language: &str, validator: Arc<dyn OptionsValidator>) {
        if self
            .validators
            .insert(language.to_string(), validator)
            .is_none()
        {
            self.order.push(language.to_string());
        }
    }

    pub fn is_canonical(&self, language: &str) -> bool {
        self.validators.contains_key(language)
    }

    /// Registered languages, in registration order.
    pub fn canonical_languages(&self) -> &[String] {
        &self.order
    }

    /// Validate `options` as the compile-and-run options of a submission in
    /// `language`, which may be a dialect name.
    pub fn validate(
        &self,
        resolver: &LanguageResolver,
        language: &str,
        options: &Value,
    ) -> Vec<Violation> {
        let actual = if resolver.is_dialect(language) {
            resolver.resolve_parent(language)
        } else {
            language
        };

        let Some(validator) = self.validators.get(actual) else {
            return vec![Violation::unknown_language(language)];
        };

        let Some(map) = options.as_object() else {
            return vec![Violation::new(
                "compileAndRunOptions",
                ViolationKind::NotAnObject,
                "compileAndRunOptions must be an object",
            )];
        };

        let mut violations: Vec<Violation> = map
            .keys()
            .filter(|k| !validator.recognizes(k))
            .map(|k| Violation::not_whitelisted(k))
            .collect();
        violations.extend(validator.validate_fields(map));
        violations.sort_by(|a, b| a.property.cmp(&b.property));
        violations
    }
}

impl std::fmt::Debug for ValidationDispatchTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationDispatchTable")
            .field("languages", &self.order)
            .finish()
    }
}
