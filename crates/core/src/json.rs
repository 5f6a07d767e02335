//! Resilient JSON field extraction with smart defaults.
//!
//! Model output and tool arguments are only ever best-effort JSON; these
//! helpers read what is there and fall back instead of erroring, so one
//! malformed field never aborts a turn.

use rust_decimal::Decimal;
use serde_json::Value;

/// Parses JSON text, yielding `None` instead of an error on failure.
pub fn safe_parse(text: &str) -> Option<Value> {
    serde_json::from_str(text).ok()
}

/// Trimmed text that is plausibly a JSON document: `{..}` or `[..]`.
pub fn looks_like_json(text: &str) -> bool {
    let trimmed = text.trim();
    (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'))
}

pub fn extract_string(value: &Value, field: &str, default: &str) -> String {
    match value.get(field) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        _ => default.to_string(),
    }
}

pub fn extract_i64(value: &Value, field: &str, default: i64) -> i64 {
    match value.get(field) {
        Some(Value::Number(number)) => number.as_i64().unwrap_or(default),
        Some(Value::String(text)) => text.trim().parse().unwrap_or(default),
        _ => default,
    }
}

pub fn extract_f64(value: &Value, field: &str, default: f64) -> f64 {
    match value.get(field) {
        Some(Value::Number(number)) => number.as_f64().unwrap_or(default),
        Some(Value::String(text)) => text.trim().parse().unwrap_or(default),
        _ => default,
    }
}

pub fn extract_bool(value: &Value, field: &str, default: bool) -> bool {
    match value.get(field) {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(text)) => text.trim().parse().unwrap_or(default),
        _ => default,
    }
}

pub fn extract_decimal(value: &Value, field: &str, default: Decimal) -> Decimal {
    match value.get(field) {
        Some(Value::Number(number)) => number.to_string().parse().unwrap_or(default),
        Some(Value::String(text)) => text.trim().trim_start_matches('$').parse().unwrap_or(default),
        _ => default,
    }
}

/// String items of an array field; non-string items are skipped.
pub fn extract_string_array(value: &Value, field: &str) -> Vec<String> {
    value
        .get(field)
        .and_then(Value::as_array)
        .map(|items| {
            items.iter().filter_map(Value::as_str).map(str::to_string).collect()
        })
        .unwrap_or_default()
}
