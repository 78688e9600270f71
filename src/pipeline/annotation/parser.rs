use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use super::prompt::SENTENCES_KEY;
use super::types::{AnnotatedRecord, Entity};

/// Result of parsing an extraction reply. Always branch on the tag before use.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionReply {
    /// Well-shaped reply. `dropped` items in the list were not records.
    Parsed {
        records: Vec<AnnotatedRecord>,
        dropped: usize,
    },
    /// Not JSON, or JSON without a `sentences` list.
    Malformed { raw: String, reason: String },
}

/// Remove a surrounding ```json ... ``` (or bare ```) fence and whitespace.
pub fn strip_code_fences(raw: &str) -> &str {
    static OPEN_FENCE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^```[A-Za-z]*[ \t]*\r?\n?").expect("valid regex"));

    let mut text = raw.trim();
    if let Some(m) = OPEN_FENCE_RE.find(text) {
        text = &text[m.end()..];
    }
    if let Some(stripped) = text.strip_suffix("```") {
        text = stripped;
    }
    text.trim()
}

/// Parse an extraction reply into records.
pub fn parse_extraction_reply(raw: &str) -> ExtractionReply {
    let malformed = |reason: String| ExtractionReply::Malformed {
        raw: raw.to_string(),
        reason,
    };

    let value: serde_json::Value = match serde_json::from_str(strip_code_fences(raw)) {
        Ok(v) => v,
        Err(e) => return malformed(format!("not JSON: {e}")),
    };

    let items = match value.get(SENTENCES_KEY) {
        Some(serde_json::Value::Array(items)) => items,
        Some(_) => return malformed(format!("'{SENTENCES_KEY}' is not a list")),
        None => {
            let keys = match &value {
                serde_json::Value::Object(map) => map.keys().cloned().collect::<Vec<_>>().join(", "),
                other => format!("top-level {}", json_type_name(other)),
            };
            return malformed(format!("missing '{SENTENCES_KEY}' key (found: {keys})"));
        }
    };

    let mut records = Vec::with_capacity(items.len());
    let mut dropped = 0;
    for item in items {
        match record_from_value(item) {
            Some(record) => records.push(record),
            None => dropped += 1,
        }
    }

    ExtractionReply::Parsed { records, dropped }
}

/// Parse a correction reply into a single record.
///
/// Accepts either the bare record or a `{"sentences": [record]}` wrapper.
pub fn parse_correction_reply(raw: &str) -> Result<AnnotatedRecord, String> {
    let value: serde_json::Value = serde_json::from_str(strip_code_fences(raw))
        .map_err(|e| format!("correction reply is not JSON: {e}"))?;

    let candidate = match value.get(SENTENCES_KEY) {
        Some(serde_json::Value::Array(items)) if value.get("text").is_none() => {
            items.first().ok_or("correction reply has an empty 'sentences' list")?
        }
        _ => &value,
    };

    record_from_value(candidate).ok_or_else(|| "correction reply is not a record".to_string())
}

/// Lenient record shape: missing `entities` means none, missing `label` means "".
#[derive(Deserialize)]
struct RawRecord {
    text: String,
    #[serde(default)]
    entities: Option<Vec<serde_json::Value>>,
}

#[derive(Deserialize)]
struct RawEntity {
    text: String,
    #[serde(default)]
    label: Option<String>,
}

fn record_from_value(value: &serde_json::Value) -> Option<AnnotatedRecord> {
    let raw: RawRecord = serde_json::from_value(value.clone()).ok()?;
    let entities = raw
        .entities
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| serde_json::from_value::<RawEntity>(v).ok())
        .map(|e| Entity {
            text: e.text,
            label: e.label.unwrap_or_default(),
        })
        .collect();

    Some(AnnotatedRecord {
        text: raw.text,
        entities,
    })
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
