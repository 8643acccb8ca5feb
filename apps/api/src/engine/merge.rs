//! Batch merge engine — the engine's public entry point.
//!
//! Applies a batch of `(key, value)` updates against a document snapshot
//! and returns a new flat document plus the aggregated issue list. The
//! caller's snapshot is never mutated; the merge builds a fresh flat map.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::flatten::{flatten, FlatDocument};
use crate::engine::normalize::value_to_string;
use crate::engine::rules::{evaluate_update, FieldRule, Issue};

/// One proposed field write. Ephemeral, lives for a single merge call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldUpdate {
    pub key: String,
    pub value: Value,
}

/// Outcome of one merge call. `changed` is true iff at least one accepted
/// update altered the stringified value at its key.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub document: FlatDocument,
    pub changed: bool,
    pub issues: Vec<Issue>,
}

impl MergeOutcome {
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(Issue::is_error)
    }

    /// Keys that were written by this merge (no error issue recorded).
    /// Callers union these into the session's filled-key set.
    pub fn accepted_keys<'a>(&self, updates: &'a [FieldUpdate]) -> Vec<&'a str> {
        let rejected: HashSet<&str> = self
            .issues
            .iter()
            .filter(|i| i.is_error())
            .map(|i| i.key.as_str())
            .collect();
        let mut seen = HashSet::new();
        updates
            .iter()
            .map(|u| u.key.as_str())
            .filter(|k| !rejected.contains(k) && seen.insert(*k))
            .collect()
    }
}

/// Merges `updates` into `document` under the catalog's rules.
///
/// Updates are processed in order; a later update for the same key in the
/// same batch overwrites the earlier one. Every update is attempted — an
/// error for one key never aborts the batch — and a best-effort merged
/// document is returned even when some updates failed. Persisting a result
/// that carries error issues is the caller's decision, not the engine's.
pub fn apply_field_rules(
    document: &Value,
    updates: &[FieldUpdate],
    catalog: &HashMap<String, FieldRule>,
    allowed_keys: &HashSet<String>,
) -> MergeOutcome {
    let mut flat = flatten(document);
    let mut issues = Vec::new();
    let mut changed = false;

    for update in updates {
        match evaluate_update(&update.key, &update.value, catalog, allowed_keys) {
            Ok(accepted) => {
                issues.extend(accepted.warnings);
                let new_text = value_to_string(&accepted.value);
                let prior_text = flat.get(&update.key).map(value_to_string);
                if prior_text.as_deref() != Some(new_text.as_str()) {
                    changed = true;
                }
                flat.insert(update.key.clone(), accepted.value);
            }
            Err(issue) => issues.push(issue),
        }
    }

    MergeOutcome {
        document: flat,
        changed,
        issues,
    }
}
