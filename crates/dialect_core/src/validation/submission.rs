//! Whole-submission content check: language, code, options, flags.

use serde_json::Value;

use super::{ValidationDispatchTable, Violation, ViolationKind};
use crate::resolver::LanguageResolver;

/// Upper bound on submitted source size, in bytes.
pub const MAX_CODE_LENGTH: usize = 1024 * 1024;

const OPTIONS_FIELD: &str = "compileAndRunOptions";
const KNOWN_FIELDS: [&str; 4] = ["language", "code", OPTIONS_FIELD, "skipSamples"];

/// Validate submission content for a code problem. Options are dispatched on
/// the (possibly dialect) language and reported under
/// `compileAndRunOptions.<field>`.
pub fn validate_submission_content(
    table: &ValidationDispatchTable,
    resolver: &LanguageResolver,
    content: &Value,
) -> Vec<Violation> {
    let Some(map) = content.as_object() else {
        return vec![Violation::new(
            "content",
            ViolationKind::NotAnObject,
            "submission content must be an object",
        )];
    };

    let mut violations: Vec<Violation> = map
        .keys()
        .filter(|k| !KNOWN_FIELDS.contains(&k.as_str()))
        .map(|k| Violation::not_whitelisted(k))
        .collect();

    let language = match map.get("language") {
        Some(Value::String(l)) if resolver.is_code_language_or_dialect(l, table) => Some(l.as_str()),
        Some(Value::String(l)) => {
            violations.push(Violation::new(
                "language",
                ViolationKind::InvalidValue,
                format!("language must be a code language or dialect, got '{l}'"),
            ));
            None
        }
        Some(_) => {
            violations.push(Violation::new(
                "language",
                ViolationKind::InvalidValue,
                "language must be a string",
            ));
            None
        }
        None => {
            violations.push(Violation::new(
                "language",
                ViolationKind::Missing,
                "language should not be empty",
            ));
            None
        }
    };

    match map.get("code") {
        Some(Value::String(code)) if code.len() <= MAX_CODE_LENGTH => {}
        Some(Value::String(_)) => violations.push(Violation::new(
            "code",
            ViolationKind::InvalidValue,
            format!("code must be shorter than or equal to {MAX_CODE_LENGTH} characters"),
        )),
        Some(_) => violations.push(Violation::new(
            "code",
            ViolationKind::InvalidValue,
            "code must be a string",
        )),
        None => violations.push(Violation::new(
            "code",
            ViolationKind::Missing,
            "code should not be empty",
        )),
    }

    match map.get(OPTIONS_FIELD) {
        Some(options @ Value::Object(_)) => {
            // An invalid language was already reported; its options can't be checked.
            if let Some(language) = language {
                violations.extend(
                    table
                        .validate(resolver, language, options)
                        .into_iter()
                        .map(|v| match v.kind {
                            // Reported against the submission's own language field.
                            ViolationKind::UnknownLanguage => v,
                            _ => v.nested_under(OPTIONS_FIELD),
                        }),
                );
            }
        }
        Some(_) => violations.push(Violation::new(
            OPTIONS_FIELD,
            ViolationKind::NotAnObject,
            "compileAndRunOptions must be an object",
        )),
        None => violations.push(Violation::new(
            OPTIONS_FIELD,
            ViolationKind::Missing,
            "compileAndRunOptions should not be empty",
        )),
    }

    match map.get("skipSamples") {
        None | Some(Value::Bool(_)) => {}
        Some(_) => violations.push(Violation::new(
            "skipSamples",
            ViolationKind::InvalidValue,
            "skipSamples must be a boolean value",
        )),
    }

    violations
}
