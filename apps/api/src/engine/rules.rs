//! Field rules and the single-update evaluator.
//!
//! Evaluation order for one update: allow-list gate → semantic
//! normalization → required → minLength → maxLength → pattern. The first
//! constraint failure rejects the update; nothing is partially written.

use std::collections::{HashMap, HashSet};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::normalize::{normalize, value_to_string, SemanticKind};

pub const MSG_KEY_NOT_ALLOWED: &str = "İzinli olmayan alan anahtarı.";

/// Widget hint for the client question flow. Not interpreted by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    #[default]
    Text,
    Textarea,
    Number,
    Date,
    Select,
}

/// Hard constraints checked after normalization. All optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validation {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Regular expression source. An uncompilable pattern degrades to a
    /// warning and the check is skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// Declarative per-field rule from the catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRule {
    pub input_kind: InputKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<Validation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic: Option<SemanticKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Warning,
    Error,
}

/// One warning or error attached to a field key after a merge attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub key: String,
    #[serde(rename = "type")]
    pub severity: IssueSeverity,
    pub message: String,
}

impl Issue {
    pub fn warning(key: &str, message: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            severity: IssueSeverity::Warning,
            message: message.into(),
        }
    }

    pub fn error(key: &str, message: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            severity: IssueSeverity::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == IssueSeverity::Error
    }
}

/// A staged write that passed every check, with any advisory warnings.
#[derive(Debug, Clone)]
pub struct AcceptedUpdate {
    pub value: Value,
    pub warnings: Vec<Issue>,
}

/// Evaluates one `(key, value)` update against the catalog and allow-list.
/// Returns the staged write or the single blocking error.
pub fn evaluate_update(
    key: &str,
    value: &Value,
    catalog: &HashMap<String, FieldRule>,
    allowed_keys: &HashSet<String>,
) -> Result<AcceptedUpdate, Issue> {
    if !allowed_keys.contains(key) {
        return Err(Issue::error(key, MSG_KEY_NOT_ALLOWED));
    }

    // No rule means no normalization and no constraints.
    let Some(rule) = catalog.get(key) else {
        return Ok(AcceptedUpdate {
            value: value.clone(),
            warnings: Vec::new(),
        });
    };

    let normalized = normalize(rule.semantic.unwrap_or_default(), value);
    let mut warnings = Vec::new();
    if let Some(message) = &normalized.warning {
        warnings.push(Issue::warning(key, message.clone()));
    }

    if let Some(validation) = &rule.validation {
        check_constraints(key, &normalized.value, validation, &mut warnings)?;
    }

    Ok(AcceptedUpdate {
        value: normalized.value,
        warnings,
    })
}

fn check_constraints(
    key: &str,
    value: &Value,
    validation: &Validation,
    warnings: &mut Vec<Issue>,
) -> Result<(), Issue> {
    let text = value_to_string(value);

    if validation.required && text.trim().is_empty() {
        return Err(Issue::error(key, "Bu alan zorunludur."));
    }

    let length = text.chars().count();
    if let Some(min) = validation.min_length {
        if length < min {
            return Err(Issue::error(key, format!("En az {min} karakter olmalı.")));
        }
    }
    if let Some(max) = validation.max_length {
        if length > max {
            return Err(Issue::error(
                key,
                format!("En fazla {max} karakter olmalı."),
            ));
        }
    }

    if let Some(pattern) = &validation.pattern {
        match Regex::new(pattern) {
            Ok(re) => {
                if !re.is_match(&text) {
                    return Err(Issue::error(key, "Değer beklenen formatta değil."));
                }
            }
            // Authoring bug in the catalog, not a data problem.
            Err(_) => warnings.push(Issue::warning(
                key,
                "Desen kuralı geçersiz, kontrol atlandı.",
            )),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog_with(key: &str, rule: FieldRule) -> (HashMap<String, FieldRule>, HashSet<String>) {
        let mut catalog = HashMap::new();
        catalog.insert(key.to_string(), rule);
        let allowed = catalog.keys().cloned().collect();
        (catalog, allowed)
    }

    #[test]
    fn test_disallowed_key_rejected_before_normalization() {
        let (catalog, _) = catalog_with("contact.phone", FieldRule::default());
        let err = evaluate_update("secret.field", &json!("x"), &catalog, &HashSet::new())
            .unwrap_err();
        assert!(err.is_error());
        assert_eq!(err.message, MSG_KEY_NOT_ALLOWED);
    }

    #[test]
    fn test_missing_rule_passes_value_through() {
        let catalog = HashMap::new();
        let allowed: HashSet<String> = ["free.field".to_string()].into_iter().collect();
        let accepted = evaluate_update("free.field", &json!("  raw  "), &catalog, &allowed).unwrap();
        assert_eq!(accepted.value, json!("  raw  "));
        assert!(accepted.warnings.is_empty());
    }

    #[test]
    fn test_required_blocks_whitespace_only() {
        let rule = FieldRule {
            validation: Some(Validation {
                required: true,
                ..Default::default()
            }),
            ..Default::default()
        };
        let (catalog, allowed) = catalog_with("personal.fullName", rule);
        let err =
            evaluate_update("personal.fullName", &json!("   "), &catalog, &allowed).unwrap_err();
        assert!(err.is_error());
    }

    #[test]
    fn test_min_length_counts_chars_after_normalization() {
        let rule = FieldRule {
            validation: Some(Validation {
                min_length: Some(5),
                ..Default::default()
            }),
            ..Default::default()
        };
        let (catalog, allowed) = catalog_with("personal.fullName", rule);
        // collapses to "ab c" = 4 chars
        let err =
            evaluate_update("personal.fullName", &json!(" ab   c "), &catalog, &allowed)
                .unwrap_err();
        assert!(err.message.contains("En az 5"));
    }

    #[test]
    fn test_max_length_blocks() {
        let rule = FieldRule {
            validation: Some(Validation {
                max_length: Some(3),
                ..Default::default()
            }),
            ..Default::default()
        };
        let (catalog, allowed) = catalog_with("k", rule);
        assert!(evaluate_update("k", &json!("abcd"), &catalog, &allowed).is_err());
    }

    #[test]
    fn test_pattern_mismatch_blocks() {
        let rule = FieldRule {
            validation: Some(Validation {
                pattern: Some(r"^\d+$".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let (catalog, allowed) = catalog_with("k", rule);
        assert!(evaluate_update("k", &json!("abc"), &catalog, &allowed).is_err());
        assert!(evaluate_update("k", &json!("123"), &catalog, &allowed).is_ok());
    }

    #[test]
    fn test_invalid_pattern_degrades_to_warning() {
        let rule = FieldRule {
            validation: Some(Validation {
                pattern: Some("([unclosed".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let (catalog, allowed) = catalog_with("k", rule);
        let accepted = evaluate_update("k", &json!("anything"), &catalog, &allowed).unwrap();
        assert_eq!(accepted.warnings.len(), 1);
        assert!(!accepted.warnings[0].is_error());
    }

    #[test]
    fn test_normalizer_warning_carried_on_accept() {
        let rule = FieldRule {
            semantic: Some(SemanticKind::Date),
            ..Default::default()
        };
        let (catalog, allowed) = catalog_with("personal.birthDate", rule);
        let accepted =
            evaluate_update("personal.birthDate", &json!("1985"), &catalog, &allowed).unwrap();
        assert_eq!(accepted.value, json!("1985-01-01"));
        assert_eq!(accepted.warnings.len(), 1);
    }

    #[test]
    fn test_required_checks_normalized_value_not_raw() {
        // phone normalization strips letters; required then sees an empty string
        let rule = FieldRule {
            semantic: Some(SemanticKind::Phone),
            validation: Some(Validation {
                required: true,
                ..Default::default()
            }),
            ..Default::default()
        };
        let (catalog, allowed) = catalog_with("contact.phone", rule);
        let err = evaluate_update("contact.phone", &json!("yok"), &catalog, &allowed).unwrap_err();
        assert!(err.is_error());
    }

    #[test]
    fn test_issue_serde_type_field() {
        let issue = Issue::error("k", "m");
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["type"], "error");
    }
}
