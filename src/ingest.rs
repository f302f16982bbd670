//! Normalizes upstream analysis documents into [`AnalysisBundle`]s.
//!
//! Upstream producers disagree on field names (`emotion_counts` vs
//! `emotions`, `results` vs `tweets`) and on label casing. All of that is
//! resolved here so the scorer only ever sees canonical labels.

use std::collections::{BTreeMap, HashMap};
use std::io::Read;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::AssessError;
use crate::models::{AnalysisBundle, AnalyzedPost, EmotionProfile};

/// Labels emitted by the upstream classifier, in canonical spelling.
pub const KNOWN_LABELS: [&str; 19] = [
    "Anxiety",
    "Bipolar",
    "Depression",
    "Personality disorder",
    "Stress",
    "Suicidal",
    "anger",
    "boredom",
    "empty",
    "enthusiasm",
    "fun",
    "happiness",
    "hate",
    "love",
    "neutral",
    "relief",
    "sadness",
    "surprise",
    "worry",
];

const RESERVED_COLUMNS: [&str; 4] = ["username", "distress", "hopelessness", "polarity"];

pub fn canonical_label(label: &str) -> String {
    let trimmed = label.trim();
    KNOWN_LABELS
        .iter()
        .find(|known| known.eq_ignore_ascii_case(trimmed))
        .map(|known| known.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

/// Lenient numeric coercion. Anything that is not a finite number is 0.
pub fn coerce_number(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(number) => number.as_f64().unwrap_or(0.0),
        Value::String(text) => parse_lenient(text),
        _ => 0.0,
    };
    if parsed.is_finite() {
        parsed
    } else {
        0.0
    }
}

/// Parses the longest leading decimal number, so `"12.5 posts"` and
/// `"30%"` both yield their numbers. No numeric prefix yields 0.
fn parse_lenient(text: &str) -> f64 {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let digits_from = |mut at: usize| {
        let start = at;
        while at < bytes.len() && bytes[at].is_ascii_digit() {
            at += 1;
        }
        (at, at - start)
    };

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let (after_int, int_digits) = digits_from(end);
    end = after_int;
    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        let (after_frac, count) = digits_from(end + 1);
        if int_digits > 0 || count > 0 {
            end = after_frac;
            frac_digits = count;
        }
    }
    if int_digits == 0 && frac_digits == 0 {
        return 0.0;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let (after_exp, count) = digits_from(exp);
        if count > 0 {
            end = after_exp;
        }
    }

    text[..end].parse::<f64>().unwrap_or(0.0)
}

fn is_reserved(column: &str) -> bool {
    RESERVED_COLUMNS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(column.trim()))
}

/// Builds a weight map with canonical labels. On a casing collision the
/// entry already spelled canonically wins, otherwise the first one seen.
pub fn normalize_weights<'a, I>(entries: I) -> BTreeMap<String, f64>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut weights: BTreeMap<String, f64> = BTreeMap::new();
    let mut exact: Vec<String> = Vec::new();

    for (raw, value) in entries {
        let label = canonical_label(raw);
        let is_exact = raw.trim() == label;
        let seen = weights.contains_key(&label);
        if seen && !(is_exact && !exact.contains(&label)) {
            debug!(raw, label = %label, "dropping duplicate label variant");
            continue;
        }
        if seen {
            debug!(label = %label, "canonical spelling replaces variant");
        }
        weights.insert(label.clone(), value);
        if is_exact {
            exact.push(label);
        }
    }

    weights
}

pub fn bundle_from_value(value: &Value) -> Result<AnalysisBundle, AssessError> {
    let doc = match value {
        Value::Object(doc) => doc,
        Value::Null => {
            return Err(AssessError::InvalidInput(
                "analysis document is null".to_string(),
            ))
        }
        _ => {
            return Err(AssessError::InvalidInput(
                "analysis document is not a JSON object".to_string(),
            ))
        }
    };

    let emotion_map = doc
        .get("emotion_counts")
        .and_then(Value::as_object)
        .or_else(|| doc.get("emotions").and_then(Value::as_object));
    let emotion_weights = match emotion_map {
        Some(map) => normalize_weights(map.iter().map(|(k, v)| (k.as_str(), coerce_number(v)))),
        None => BTreeMap::new(),
    };

    let dimensions = doc.get("emotion_dimensions").and_then(Value::as_object);
    let dimension = |name: &str| {
        dimensions
            .and_then(|dims| dims.get(name))
            .map(coerce_number)
            .unwrap_or(0.0)
    };

    let profile = EmotionProfile {
        emotion_weights,
        distress: dimension("distress"),
        hopelessness: dimension("hopelessness"),
        polarity: doc.get("polarity").map(coerce_number).unwrap_or(0.0),
    };

    let posts = doc
        .get("results")
        .or_else(|| doc.get("tweets"))
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_object).map(post_from_object).collect())
        .unwrap_or_default();

    let username = doc
        .get("username")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    Ok(AnalysisBundle {
        username,
        profile,
        posts,
    })
}

fn post_from_object(object: &Map<String, Value>) -> AnalyzedPost {
    let text = ["original_text", "text", "post"]
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string();

    let created_at = ["created_at", "date"]
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .and_then(parse_timestamp);

    AnalyzedPost {
        text,
        created_at,
        prediction: object
            .get("prediction")
            .and_then(Value::as_str)
            .map(canonical_label),
        confidence: object.get("confidence").map(coerce_number).unwrap_or(0.0),
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(parsed) => Some(parsed.with_timezone(&Utc)),
        Err(err) => {
            warn!(raw, %err, "ignoring unparseable post timestamp");
            None
        }
    }
}

pub fn read_bundle<R: Read>(reader: R) -> anyhow::Result<AnalysisBundle> {
    let value: Value =
        serde_json::from_reader(reader).context("analysis document is not valid JSON")?;
    Ok(bundle_from_value(&value)?)
}

pub fn load_bundle(path: &std::path::Path) -> anyhow::Result<AnalysisBundle> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open analysis document {}", path.display()))?;
    read_bundle(std::io::BufReader::new(file))
        .with_context(|| format!("failed to ingest {}", path.display()))
}

/// Reads one subject per CSV row. Columns other than the reserved ones are
/// treated as emotion labels.
pub fn read_csv_profiles<R: Read>(reader: R) -> anyhow::Result<Vec<(String, EmotionProfile)>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut subjects = Vec::new();

    for (index, result) in reader.deserialize::<HashMap<String, String>>().enumerate() {
        let row = result.with_context(|| format!("malformed CSV row {}", index + 1))?;
        let column = |name: &str| {
            row.iter()
                .find(|(header, _)| header.trim().eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        };
        let cell = |name: &str| column(name).map(|v| parse_lenient(v)).unwrap_or(0.0);
        let finite = |value: f64| if value.is_finite() { value } else { 0.0 };

        let username = column("username")
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("row-{}", index + 1));

        let mut labels: Vec<(&str, f64)> = row
            .iter()
            .filter(|(header, _)| !is_reserved(header))
            .map(|(header, value)| (header.as_str(), finite(parse_lenient(value))))
            .collect();
        // HashMap order is arbitrary; sort so collisions resolve the same way every run.
        labels.sort_by(|a, b| a.0.cmp(b.0));

        subjects.push((
            username,
            EmotionProfile {
                emotion_weights: normalize_weights(labels),
                distress: finite(cell("distress")),
                hopelessness: finite(cell("hopelessness")),
                polarity: finite(cell("polarity")),
            },
        ));
    }

    Ok(subjects)
}

pub fn load_csv_profiles(path: &std::path::Path) -> anyhow::Result<Vec<(String, EmotionProfile)>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open CSV {}", path.display()))?;
    read_csv_profiles(file)
}
