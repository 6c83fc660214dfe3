//! Envelope detection: is a stored value already ciphertext, or plaintext?

use common::envelope::ENVELOPE_KEYS;
use serde_json::{Map, Value};

/// Return `true` if `value` has the envelope shape.
///
/// Accepts a JSON object whose `encrypted`, `iv` and `authTag` members are all
/// present and non-null, or a string that after trimming starts with `{` and
/// parses as such an object. Everything else counts as plaintext.
pub fn is_envelope(value: &Value) -> bool {
    match value {
        Value::Object(map) => has_envelope_keys(map),
        Value::String(s) => parse_envelope_string(s).is_some(),
        _ => false,
    }
}

/// Return the envelope-shaped object carried by `value`, if any.
///
/// Shape detection only; member types and byte lengths are checked when the
/// envelope is decoded.
pub fn envelope_object(value: &Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) if has_envelope_keys(map) => Some(map.clone()),
        Value::String(s) => parse_envelope_string(s),
        _ => None,
    }
}

fn has_envelope_keys(map: &Map<String, Value>) -> bool {
    ENVELOPE_KEYS
        .iter()
        .all(|key| map.get(*key).is_some_and(|v| !v.is_null()))
}

fn parse_envelope_string(s: &str) -> Option<Map<String, Value>> {
    let trimmed = s.trim();
    if !trimmed.starts_with('{') {
        return None;
    }
    match serde_json::from_str(trimmed) {
        Ok(Value::Object(map)) if has_envelope_keys(&map) => Some(map),
        _ => None,
    }
}
