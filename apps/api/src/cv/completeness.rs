//! Completeness reporting over the flat document and the field catalog.

use serde::{Deserialize, Serialize};

use crate::catalog::{FieldCatalog, SECTION_WEIGHTS};
use crate::engine::flatten::FlatDocument;
use crate::engine::normalize::value_to_string;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    Strong,
    Moderate,
    Weak,
    Missing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionHealth {
    pub section: String,
    pub score: f64,
    pub filled_count: usize,
    pub field_count: usize,
    pub status: SectionStatus,
    pub missing_required: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletenessReport {
    pub overall_score: f64,
    pub sections: Vec<SectionHealth>,
    pub filled_fields: usize,
    pub total_fields: usize,
}

fn is_filled(document: &FlatDocument, key: &str) -> bool {
    document
        .get(key)
        .map(|v| !value_to_string(v).trim().is_empty())
        .unwrap_or(false)
}

/// Computes per-section fill ratios weighted into an overall score.
pub fn compute_completeness_report(
    document: &FlatDocument,
    catalog: &FieldCatalog,
) -> CompletenessReport {
    let mut sections = Vec::new();
    let mut weighted_score_sum = 0.0;
    let mut filled_fields = 0;
    let mut total_fields = 0;

    for (section_key, weight) in SECTION_WEIGHTS {
        let keys = catalog.section_keys(section_key);
        let field_count = keys.len();
        let filled_count = keys.iter().filter(|k| is_filled(document, k)).count();
        let missing_required: Vec<String> = keys
            .iter()
            .filter(|k| catalog.is_required(k) && !is_filled(document, k))
            .map(|k| k.to_string())
            .collect();

        let score = if field_count == 0 {
            0.0
        } else {
            (filled_count as f64 / field_count as f64).clamp(0.0, 1.0)
        };

        let status = match score {
            s if s >= 0.8 => SectionStatus::Strong,
            s if s >= 0.5 => SectionStatus::Moderate,
            s if s > 0.0 => SectionStatus::Weak,
            _ => SectionStatus::Missing,
        };

        weighted_score_sum += score * weight;
        filled_fields += filled_count;
        total_fields += field_count;
        sections.push(SectionHealth {
            section: section_key.to_string(),
            score,
            filled_count,
            field_count,
            status,
            missing_required,
        });
    }

    let total_weight: f64 = SECTION_WEIGHTS.iter().map(|(_, w)| w).sum();
    let overall_score = if total_weight > 0.0 {
        (weighted_score_sum / total_weight).clamp(0.0, 1.0)
    } else {
        0.0
    };

    CompletenessReport {
        overall_score,
        sections,
        filled_fields,
        total_fields,
    }
}
