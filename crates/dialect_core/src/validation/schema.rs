//! Declarative field schemas, the common shape of every built-in validator.

use serde_json::{Map, Value};

use super::{OptionsValidator, Violation, ViolationKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRule {
    /// A string from a fixed set.
    OneOf(Vec<String>),
    Bool,
    /// Any string up to `max_len` bytes.
    Text { max_len: usize },
}

impl FieldRule {
    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::OneOf(values.into_iter().map(Into::into).collect())
    }

    fn check(&self, field: &str, value: &Value) -> Option<Violation> {
        let message = match (self, value) {
            (Self::OneOf(allowed), Value::String(s)) if allowed.contains(s) => return None,
            (Self::OneOf(allowed), _) => {
                format!("{field} must be one of the following values: {}", allowed.join(", "))
            }
            (Self::Bool, Value::Bool(_)) => return None,
            (Self::Bool, _) => format!("{field} must be a boolean value"),
            (Self::Text { max_len }, Value::String(s)) if s.len() <= *max_len => return None,
            (Self::Text { max_len }, Value::String(_)) => {
                format!("{field} must be shorter than or equal to {max_len} characters")
            }
            (Self::Text { .. }, _) => format!("{field} must be a string"),
        };
        Some(Violation::new(field, ViolationKind::InvalidValue, message))
    }
}

#[derive(Debug, Clone)]
struct FieldSpec {
    name: String,
    rule: FieldRule,
    required: bool,
}

/// Options validator described as a list of named fields.
#[derive(Debug, Clone, Default)]
pub struct SchemaValidator {
    fields: Vec<FieldSpec>,
}

impl SchemaValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an optional field.
    pub fn field(mut self, name: &str, rule: FieldRule) -> Self {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            rule,
            required: false,
        });
        self
    }

    pub fn required(mut self, name: &str, rule: FieldRule) -> Self {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            rule,
            required: true,
        });
        self
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

impl OptionsValidator for SchemaValidator {
    fn recognizes(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f.name == field)
    }

    fn validate_fields(&self, options: &Map<String, Value>) -> Vec<Violation> {
        self.fields
            .iter()
            .filter_map(|spec| match options.get(&spec.name) {
                Some(value) => spec.rule.check(&spec.name, value),
                None if spec.required => Some(Violation::new(
                    &spec.name,
                    ViolationKind::Missing,
                    format!("{} should not be empty", spec.name),
                )),
                None => None,
            })
            .collect()
    }
}
