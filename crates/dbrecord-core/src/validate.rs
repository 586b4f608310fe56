//! Schema-driven validation of candidate data.
//!
//! Validation runs immediately before persistence. It never throws for
//! expected failures: every problem is appended to the caller's error
//! list and the overall verdict is simply whether that list ended up
//! empty, so errors merged in earlier (e.g. from a failed cascade save)
//! also veto the write.

use std::sync::OnceLock;

use regex::Regex;

use crate::field::FieldSchema;
use crate::row::Row;

/// Process-wide cache of compiled validation patterns.
///
/// Schemas re-validate the same handful of patterns on every write;
/// compiling each once for the lifetime of the program keeps the hot
/// path to a hash lookup.
struct RegexCache {
    cache: std::sync::RwLock<std::collections::HashMap<String, Regex>>,
}

impl RegexCache {
    fn new() -> Self {
        Self {
            cache: std::sync::RwLock::new(std::collections::HashMap::new()),
        }
    }

    fn get_or_compile(&self, pattern: &str) -> Result<Regex, regex::Error> {
        {
            let cache = self.cache.read().unwrap();
            if let Some(regex) = cache.get(pattern) {
                return Ok(regex.clone());
            }
        }

        let regex = Regex::new(pattern)?;
        {
            let mut cache = self.cache.write().unwrap();
            cache.insert(pattern.to_string(), regex.clone());
        }
        Ok(regex)
    }
}

fn regex_cache() -> &'static RegexCache {
    static CACHE: OnceLock<RegexCache> = OnceLock::new();
    CACHE.get_or_init(RegexCache::new)
}

/// Check a rendered value against a validation pattern.
///
/// An invalid pattern (possible for author-supplied tags) logs a warning
/// and counts as a non-match rather than panicking, so validation stays
/// resilient to a bad schema.
pub fn matches_pattern(value: &str, pattern: &str) -> bool {
    match regex_cache().get_or_compile(pattern) {
        Ok(regex) => regex.is_match(value),
        Err(e) => {
            tracing::warn!(
                pattern = pattern,
                error = %e,
                "invalid validation pattern, treating as non-match"
            );
            false
        }
    }
}

/// Knobs for [`validate_row`].
///
/// The schema shape carries a `required` flag per field, but enforcement
/// is off by default: a null value passes whether or not the field is
/// required. Flip `enforce_required` to get the stricter behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidateOptions {
    /// Reject null values for fields declared `required`.
    pub enforce_required: bool,
}

/// Validate candidate data against a field schema.
///
/// Appends one human-readable entry to `errors` per failure, keyed by
/// `table.field`, and keeps checking the remaining fields. Candidate data
/// with fewer than two entries is rejected outright: only the primary
/// key would be written. Composite (list/map) values and nulls skip
/// pattern checks.
///
/// Returns `true` iff `errors` is empty after the full pass.
pub fn validate_row(
    table: &str,
    schema: &FieldSchema,
    data: &Row,
    options: ValidateOptions,
    errors: &mut Vec<String>,
) -> bool {
    if data.len() < 2 {
        errors.push(format!(
            "invalid field count: {}",
            data.to_json_value()
        ));
        return false;
    }

    for field in schema.iter() {
        let value = data.get(&field.name);

        if value.is_some_and(|v| v.is_composite()) {
            continue;
        }

        let Some(value) = value.filter(|v| !v.is_null()) else {
            if options.enforce_required && field.required {
                errors.push(format!("{table}.{}: is required", field.name));
            }
            continue;
        };

        let Some(pattern) = field.field_type.pattern() else {
            continue;
        };

        let rendered = value.render().unwrap_or_default();
        if !matches_pattern(&rendered, pattern) {
            errors.push(format!(
                "{table}.{}: {} validation failed",
                field.name,
                field.field_type.label()
            ));
        }
    }

    errors.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldDef, FieldType};
    use crate::value::Value;

    fn schema() -> FieldSchema {
        [
            FieldDef::new("login", FieldType::Text),
            FieldDef::new("age", FieldType::Int).required(),
            FieldDef::new("active", FieldType::Bool),
            FieldDef::new("seen", FieldType::DateTime),
        ]
        .into_iter()
        .collect()
    }

    fn candidate(pairs: &[(&str, Value)]) -> Row {
        pairs.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    #[test]
    fn test_rejects_sparse_candidate() {
        let mut errors = Vec::new();
        let data = candidate(&[("id", Value::Int(1))]);
        assert!(!validate_row(
            "users",
            &schema(),
            &data,
            ValidateOptions::default(),
            &mut errors
        ));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("invalid field count"));
    }

    #[test]
    fn test_bad_int_records_single_keyed_error() {
        let mut errors = Vec::new();
        let data = candidate(&[("id", Value::Int(1)), ("age", Value::Text("12a".into()))]);
        assert!(!validate_row(
            "users",
            &schema(),
            &data,
            ValidateOptions::default(),
            &mut errors
        ));
        assert_eq!(errors, vec!["users.age: int validation failed".to_string()]);
    }

    #[test]
    fn test_good_int_passes() {
        let mut errors = Vec::new();
        let data = candidate(&[("id", Value::Int(1)), ("age", Value::Text("12".into()))]);
        assert!(validate_row(
            "users",
            &schema(),
            &data,
            ValidateOptions::default(),
            &mut errors
        ));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_failures_do_not_short_circuit() {
        let mut errors = Vec::new();
        let data = candidate(&[
            ("age", Value::Text("nope".into())),
            ("active", Value::Text("maybe".into())),
            ("seen", Value::Text("2024|01".into())),
        ]);
        assert!(!validate_row(
            "users",
            &schema(),
            &data,
            ValidateOptions::default(),
            &mut errors
        ));
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_bool_enumeration_is_case_insensitive() {
        for ok in ["yes", "NO", "0", "1", "True", "false"] {
            let mut errors = Vec::new();
            let data = candidate(&[("id", Value::Int(1)), ("active", Value::Text(ok.into()))]);
            assert!(
                validate_row("users", &schema(), &data, ValidateOptions::default(), &mut errors),
                "{ok} should pass"
            );
        }
    }

    #[test]
    fn test_null_and_composite_values_skip() {
        let mut errors = Vec::new();
        let data = candidate(&[
            ("id", Value::Int(1)),
            ("age", Value::Null),
            ("active", Value::List(vec![Value::Text("x".into())])),
        ]);
        assert!(validate_row(
            "users",
            &schema(),
            &data,
            ValidateOptions::default(),
            &mut errors
        ));
    }

    #[test]
    fn test_required_enforcement_is_opt_in() {
        let data = candidate(&[("id", Value::Int(1)), ("login", Value::Text("x".into()))]);

        let mut errors = Vec::new();
        assert!(validate_row(
            "users",
            &schema(),
            &data,
            ValidateOptions::default(),
            &mut errors
        ));

        let mut errors = Vec::new();
        let strict = ValidateOptions {
            enforce_required: true,
        };
        assert!(!validate_row("users", &schema(), &data, strict, &mut errors));
        assert_eq!(errors, vec!["users.age: is required".to_string()]);
    }

    #[test]
    fn test_preexisting_errors_veto_the_pass() {
        let mut errors = vec!["avatar.url: text validation failed".to_string()];
        let data = candidate(&[("id", Value::Int(1)), ("age", Value::Text("12".into()))]);
        assert!(!validate_row(
            "users",
            &schema(),
            &data,
            ValidateOptions::default(),
            &mut errors
        ));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_custom_pattern_and_invalid_pattern() {
        let schema: FieldSchema = [FieldDef::new(
            "code",
            FieldType::Pattern("^[a-f]+$".into()),
        )]
        .into_iter()
        .collect();

        let mut errors = Vec::new();
        let data = candidate(&[("id", Value::Int(1)), ("code", Value::Text("abc".into()))]);
        assert!(validate_row("t", &schema, &data, ValidateOptions::default(), &mut errors));

        let mut errors = Vec::new();
        let data = candidate(&[("id", Value::Int(1)), ("code", Value::Text("xyz".into()))]);
        assert!(!validate_row("t", &schema, &data, ValidateOptions::default(), &mut errors));
        assert_eq!(errors, vec!["t.code: ^[a-f]+$ validation failed".to_string()]);

        // unparsable author pattern counts as a non-match, not a panic
        let broken: FieldSchema = [FieldDef::new("code", FieldType::Pattern("[oops".into()))]
            .into_iter()
            .collect();
        let mut errors = Vec::new();
        let data = candidate(&[("id", Value::Int(1)), ("code", Value::Text("abc".into()))]);
        assert!(!validate_row("t", &broken, &data, ValidateOptions::default(), &mut errors));
    }
}
