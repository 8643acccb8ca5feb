//! Semantic normalizers — one pure function per semantic kind.
//!
//! Answers arrive from voice transcription, so normalizers are
//! advisory-first: they return a best-effort cleaned value with a warning
//! instead of rejecting. Only the allow-list gate and the hard validation
//! constraints (required/minLength/maxLength/pattern) can block an update.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Country code prepended to national phone numbers by this deployment.
pub const DEFAULT_COUNTRY_CODE: &str = "90";

/// Closed set of semantic kinds. Adding a kind is a compile-time-checked
/// extension; an unknown kind on the wire deserializes to `Text`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticKind {
    Email,
    Phone,
    Years,
    Date,
    Url,
    // must stay last: #[serde(other)] is only accepted on the final variant
    #[default]
    #[serde(other)]
    Text,
}

/// Result of normalizing one raw value.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub value: Value,
    pub changed: bool,
    pub warning: Option<String>,
}

impl Normalized {
    fn clean(value: Value, changed: bool) -> Self {
        Self {
            value,
            changed,
            warning: None,
        }
    }

    fn flagged(value: Value, changed: bool, warning: impl Into<String>) -> Self {
        Self {
            value,
            changed,
            warning: Some(warning.into()),
        }
    }
}

static EMAIL_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static regex"));
static URL_SCHEME: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^https?://").expect("static regex"));
static URL_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^https?://[A-Za-z0-9\-._~%]+\.[A-Za-z]{2,}(?:[:/?#].*)?$")
        .expect("static regex")
});
static MONTHS_PHRASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(\d+(?:[.,]\d+)?)\s*ay\b").expect("static regex"));
static YEARS_PHRASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(\d+(?:[.,]\d+)?)\s*(?:yıl|yil|sene)\b").expect("static regex")
});
static DATE_ISO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("static regex"));
static DATE_DMY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})[./-](\d{1,2})[./-](\d{4})$").expect("static regex"));
static DATE_MY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})[./-](\d{4})$").expect("static regex"));
static DATE_Y: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})$").expect("static regex"));

/// Dispatches a raw value to the normalizer for `kind`.
pub fn normalize(kind: SemanticKind, raw: &Value) -> Normalized {
    match kind {
        SemanticKind::Text => normalize_text(raw),
        SemanticKind::Email => normalize_email(raw),
        SemanticKind::Phone => normalize_phone(raw),
        SemanticKind::Years => normalize_years(raw),
        SemanticKind::Date => normalize_date(raw),
        SemanticKind::Url => normalize_url(raw),
    }
}

/// Raw scalar as text. Non-string scalars keep their typed form but are
/// compared through their string representation.
fn raw_text(raw: &Value) -> String {
    value_to_string(raw)
}

fn emit(raw: &Value, cleaned: String) -> (Value, bool) {
    let changed = cleaned != raw_text(raw);
    if changed {
        (Value::String(cleaned), true)
    } else {
        (raw.clone(), false)
    }
}

/// Trims and collapses internal whitespace.
fn normalize_text(raw: &Value) -> Normalized {
    let cleaned = collapse_whitespace(&raw_text(raw));
    let (value, changed) = emit(raw, cleaned);
    Normalized::clean(value, changed)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lower-cases and trims; warns (without blocking) when the result does not
/// look like `local@domain.tld`.
fn normalize_email(raw: &Value) -> Normalized {
    let cleaned = raw_text(raw).trim().to_lowercase();
    let warning = if cleaned.is_empty() || EMAIL_SHAPE.is_match(&cleaned) {
        None
    } else {
        Some("E-posta adresi geçersiz görünüyor.".to_string())
    };
    let (value, changed) = emit(raw, cleaned);
    Normalized {
        value,
        changed,
        warning,
    }
}

/// Keeps digits and a single leading `+`; rewrites national forms
/// (`0` + 10 digits, or `90` + 10 digits) to `+90...`. Warns when the digit
/// count falls outside 8–15, but never blocks.
fn normalize_phone(raw: &Value) -> Normalized {
    let text = raw_text(raw);
    let has_plus = text.trim_start().starts_with('+');
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();

    let cleaned = if has_plus {
        format!("+{digits}")
    } else if digits.len() == 11 && digits.starts_with('0') {
        // national trunk prefix: 05321234567 -> +905321234567
        format!("+{DEFAULT_COUNTRY_CODE}{}", &digits[1..])
    } else if digits.len() == 12 && digits.starts_with(DEFAULT_COUNTRY_CODE) {
        format!("+{digits}")
    } else {
        digits.clone()
    };

    let digit_count = cleaned.chars().filter(char::is_ascii_digit).count();
    let warning = if !cleaned.is_empty() && !(8..=15).contains(&digit_count) {
        Some("Telefon numarası uzunluğu beklenen aralıkta değil.".to_string())
    } else {
        None
    };
    let (value, changed) = emit(raw, cleaned);
    Normalized {
        value,
        changed,
        warning,
    }
}

/// Duration-as-number. Direct (decimal-comma-tolerant) numbers are clamped
/// to ≥ 0; "18 ay" style month phrases divide by 12 (one decimal place);
/// "2 yıl" / "3 sene" style year phrases pass the number through. Anything
/// else is returned trimmed with a suggest-numeric warning.
fn normalize_years(raw: &Value) -> Normalized {
    if let Value::Number(n) = raw {
        let x = n.as_f64().unwrap_or(0.0);
        if x < 0.0 {
            return Normalized::clean(json_number(0.0), true);
        }
        return Normalized::clean(raw.clone(), false);
    }

    let text = raw_text(raw);
    let trimmed = text.trim();

    if let Some(x) = parse_decimal(trimmed) {
        let clamped = x.max(0.0);
        let value = json_number(clamped);
        let changed = value_to_string(&value) != raw_text(raw);
        return Normalized::clean(value, changed);
    }

    if let Some(caps) = MONTHS_PHRASE.captures(trimmed) {
        if let Some(months) = parse_decimal(&caps[1]) {
            let years = ((months.max(0.0) / 12.0) * 10.0).round() / 10.0;
            return Normalized::clean(json_number(years), true);
        }
    }

    if let Some(caps) = YEARS_PHRASE.captures(trimmed) {
        if let Some(years) = parse_decimal(&caps[1]) {
            return Normalized::clean(json_number(years.max(0.0)), true);
        }
    }

    Normalized::flagged(
        Value::String(trimmed.to_string()),
        trimmed != text,
        "Süre anlaşılamadı, sayısal bir değer girmeniz önerilir.",
    )
}

fn parse_decimal(text: &str) -> Option<f64> {
    let normalized = text.trim().replace(',', ".");
    if normalized.is_empty() {
        return None;
    }
    normalized.parse::<f64>().ok().filter(|x| x.is_finite())
}

fn json_number(x: f64) -> Value {
    if x.fract() == 0.0 && x.abs() < i64::MAX as f64 {
        Value::from(x as i64)
    } else {
        serde_json::Number::from_f64(x).map_or(Value::Null, Value::Number)
    }
}

/// Canonicalizes dates to `YYYY-MM-DD`. Month-only and year-only inputs are
/// padded with warnings; unrecognized shapes pass through with an
/// ambiguous-format warning. Never blocks.
fn normalize_date(raw: &Value) -> Normalized {
    let text = raw_text(raw);
    let trimmed = text.trim().to_string();

    if DATE_ISO.is_match(&trimmed) {
        let (value, changed) = emit(raw, trimmed);
        return Normalized::clean(value, changed);
    }

    if let Some(caps) = DATE_DMY.captures(&trimmed) {
        let (d, m, y) = (int(&caps[1]), int(&caps[2]), int(&caps[3]));
        if chrono::NaiveDate::from_ymd_opt(y as i32, m, d).is_some() {
            let (value, changed) = emit(raw, format!("{y:04}-{m:02}-{d:02}"));
            return Normalized::clean(value, changed);
        }
    }

    if let Some(caps) = DATE_MY.captures(&trimmed) {
        let (m, y) = (int(&caps[1]), int(&caps[2]));
        if (1..=12).contains(&m) {
            return Normalized::flagged(
                Value::String(format!("{y:04}-{m:02}-01")),
                true,
                "Gün bilgisi 01 olarak varsayıldı.",
            );
        }
    }

    if let Some(caps) = DATE_Y.captures(&trimmed) {
        let y = int(&caps[1]);
        return Normalized::flagged(
            Value::String(format!("{y:04}-01-01")),
            true,
            "Ay ve gün 01 olarak varsayıldı.",
        );
    }

    let (value, changed) = emit(raw, trimmed);
    Normalized::flagged(value, changed, "Tarih formatı anlaşılamadı.")
}

fn int(text: &str) -> u32 {
    text.parse().unwrap_or(0)
}

/// Trims and forces an `https://` scheme; warns if the result still does
/// not look like `scheme://host.tld`.
fn normalize_url(raw: &Value) -> Normalized {
    let trimmed = raw_text(raw).trim().to_string();
    if trimmed.is_empty() {
        let (value, changed) = emit(raw, trimmed);
        return Normalized::clean(value, changed);
    }
    let cleaned = if URL_SCHEME.is_match(&trimmed) {
        trimmed
    } else {
        format!("https://{trimmed}")
    };
    let warning = if URL_SHAPE.is_match(&cleaned) {
        None
    } else {
        Some("URL geçersiz görünüyor.".to_string())
    };
    let (value, changed) = emit(raw, cleaned);
    Normalized {
        value,
        changed,
        warning,
    }
}

/// String representation used for change detection and length checks.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
