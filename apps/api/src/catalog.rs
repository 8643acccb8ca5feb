//! Static field catalog for the CV interview flow.
//!
//! Declares every field the voice flow may fill: its section, prompt,
//! input kind, semantic kind, and hard validation constraints. The
//! allow-list handed to the merge engine is derived from these keys.
//! Built once at startup and threaded explicitly into every engine call —
//! never ambient mutable state.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::engine::normalize::SemanticKind;
use crate::engine::rules::{FieldRule, InputKind, Validation};

/// One field definition as exposed to clients via `GET /api/v1/catalog`.
#[derive(Debug, Clone, Serialize)]
pub struct FieldDefinition {
    pub key: String,
    pub section: String,
    pub prompt: String,
    #[serde(flatten)]
    pub rule: FieldRule,
}

/// Relative weight of each CV section in the completeness score.
pub const SECTION_WEIGHTS: &[(&str, f64)] = &[
    ("personal", 0.30),
    ("contact", 0.25),
    ("experience", 0.25),
    ("education", 0.15),
    ("skills", 0.05),
];

/// The catalog plus the derived allow-list, held in app state.
#[derive(Debug, Clone)]
pub struct FieldCatalog {
    fields: Vec<FieldDefinition>,
    rules: HashMap<String, FieldRule>,
    allowed_keys: HashSet<String>,
}

impl FieldCatalog {
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn rules(&self) -> &HashMap<String, FieldRule> {
        &self.rules
    }

    pub fn allowed_keys(&self) -> &HashSet<String> {
        &self.allowed_keys
    }

    /// Keys belonging to a section, in catalog order.
    pub fn section_keys(&self, section: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.section == section)
            .map(|f| f.key.as_str())
            .collect()
    }

    pub fn is_required(&self, key: &str) -> bool {
        self.rules
            .get(key)
            .and_then(|r| r.validation.as_ref())
            .map(|v| v.required)
            .unwrap_or(false)
    }
}

fn field(
    key: &str,
    prompt: &str,
    input_kind: InputKind,
    semantic: Option<SemanticKind>,
    validation: Option<Validation>,
) -> FieldDefinition {
    let section = key.split('.').next().unwrap_or(key).to_string();
    FieldDefinition {
        key: key.to_string(),
        section,
        prompt: prompt.to_string(),
        rule: FieldRule {
            input_kind,
            validation,
            semantic,
        },
    }
}

fn required(min: usize, max: usize) -> Option<Validation> {
    Some(Validation {
        required: true,
        min_length: Some(min),
        max_length: Some(max),
        ..Default::default()
    })
}

fn bounded(max: usize) -> Option<Validation> {
    Some(Validation {
        max_length: Some(max),
        ..Default::default()
    })
}

/// Builds the deployment's question catalog.
pub fn default_catalog() -> FieldCatalog {
    let fields = vec![
        field(
            "personal.fullName",
            "Adınız ve soyadınız nedir?",
            InputKind::Text,
            Some(SemanticKind::Text),
            required(2, 120),
        ),
        field(
            "personal.birthDate",
            "Doğum tarihiniz nedir?",
            InputKind::Date,
            Some(SemanticKind::Date),
            None,
        ),
        field(
            "personal.city",
            "Hangi şehirde yaşıyorsunuz?",
            InputKind::Text,
            Some(SemanticKind::Text),
            bounded(80),
        ),
        field(
            "personal.summary",
            "Kendinizi kısaca tanıtır mısınız?",
            InputKind::Textarea,
            Some(SemanticKind::Text),
            bounded(600),
        ),
        field(
            "contact.phone",
            "Telefon numaranız nedir?",
            InputKind::Text,
            Some(SemanticKind::Phone),
            required(8, 20),
        ),
        field(
            "contact.email",
            "E-posta adresiniz nedir?",
            InputKind::Text,
            Some(SemanticKind::Email),
            bounded(254),
        ),
        field(
            "contact.linkedin",
            "LinkedIn profiliniz var mı?",
            InputKind::Text,
            Some(SemanticKind::Url),
            bounded(300),
        ),
        field(
            "contact.website",
            "Kişisel web siteniz var mı?",
            InputKind::Text,
            Some(SemanticKind::Url),
            bounded(300),
        ),
        field(
            "experience.lastCompany",
            "Son çalıştığınız şirket hangisiydi?",
            InputKind::Text,
            Some(SemanticKind::Text),
            bounded(160),
        ),
        field(
            "experience.lastRole",
            "Son pozisyonunuz neydi?",
            InputKind::Text,
            Some(SemanticKind::Text),
            bounded(160),
        ),
        field(
            "experience.startDate",
            "Bu işe ne zaman başladınız?",
            InputKind::Date,
            Some(SemanticKind::Date),
            None,
        ),
        field(
            "experience.totalYears",
            "Toplam kaç yıllık iş deneyiminiz var?",
            InputKind::Number,
            Some(SemanticKind::Years),
            None,
        ),
        field(
            "education.school",
            "Hangi okuldan mezun oldunuz?",
            InputKind::Text,
            Some(SemanticKind::Text),
            bounded(160),
        ),
        field(
            "education.degree",
            "Hangi bölümü okudunuz?",
            InputKind::Text,
            Some(SemanticKind::Text),
            bounded(160),
        ),
        field(
            "education.graduationYear",
            "Ne zaman mezun oldunuz?",
            InputKind::Date,
            Some(SemanticKind::Date),
            None,
        ),
        field(
            "skills.summary",
            "Öne çıkan yetkinlikleriniz neler?",
            InputKind::Textarea,
            Some(SemanticKind::Text),
            bounded(400),
        ),
    ];

    let rules = fields
        .iter()
        .map(|f| (f.key.clone(), f.rule.clone()))
        .collect::<HashMap<_, _>>();
    let allowed_keys = rules.keys().cloned().collect();

    FieldCatalog {
        fields,
        rules,
        allowed_keys,
    }
}
