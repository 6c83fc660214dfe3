//! Value coercion to text before encryption and back to the declared type after.
//!
//! Sensitive values are always encrypted as UTF-8 text. The field's declared
//! [`FieldType`] decides how the decrypted text is handed back to callers.

use chrono::{DateTime, NaiveDate};
use serde_json::{Number, Value};
use thiserror::Error;

use crate::registry::FieldType;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Decrypted text did not parse as the declared type.
///
/// Carries the text so the caller can fall back to it. The text is never part
/// of the `Display` output.
#[derive(Debug, Error)]
#[error("decrypted value does not parse as {expected:?}")]
pub struct CoercionError {
    /// Declared type that failed to parse.
    pub expected: FieldType,
    text: String,
}

impl CoercionError {
    /// Return the decrypted text unchanged as a JSON string.
    pub fn into_fallback(self) -> Value {
        Value::String(self.text)
    }
}

/// Convert a field value to the text that gets encrypted.
///
/// Strings pass through unchanged whatever the field's declared type. Numbers
/// and booleans use their JSON text and compound values are serialised
/// compactly.
pub fn to_plaintext(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Restore decrypted text to the field's declared type.
///
/// A `Date` field comes back as the exact text that was written when it is an
/// RFC 3339 timestamp or a `YYYY-MM-DD` date, and as an integer when it was
/// written as epoch milliseconds.
///
/// # Errors
///
/// Returns [`CoercionError`] if a `Numeric` or `Date` field does not parse.
/// `Text` fields never fail.
pub fn restore(text: String, kind: FieldType) -> Result<Value, CoercionError> {
    let parsed = match kind {
        FieldType::Text => return Ok(Value::String(text)),
        FieldType::Numeric => parse_number(text.trim()).map(Value::Number),
        FieldType::Date if is_date_text(&text) => return Ok(Value::String(text)),
        FieldType::Date => text.trim().parse::<i64>().ok().map(|ms| Value::Number(ms.into())),
    };
    parsed.ok_or(CoercionError {
        expected: kind,
        text,
    })
}

fn parse_number(s: &str) -> Option<Number> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Number::from(i));
    }
    if let Ok(u) = s.parse::<u64>() {
        return Some(Number::from(u));
    }
    s.parse::<f64>().ok().and_then(Number::from_f64)
}

fn is_date_text(s: &str) -> bool {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s).is_ok() || NaiveDate::parse_from_str(s, DATE_FORMAT).is_ok()
}
