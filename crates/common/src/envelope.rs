//! Envelope wire format, as persisted in a text-typed storage column.
//!
//! ```text
//! {"encrypted":"<base64(ciphertext)>","iv":"<base64(12-byte nonce)>","authTag":"<base64(16-byte tag)>"}
//! ```
//!
//! Base64 is the standard alphabet with padding. No other keys are permitted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key holding the base64 ciphertext.
pub const ENCRYPTED_KEY: &str = "encrypted";
/// Key holding the base64 nonce.
pub const IV_KEY: &str = "iv";
/// Key holding the base64 authentication tag.
pub const AUTH_TAG_KEY: &str = "authTag";

/// The three keys every envelope carries, in wire order.
pub const ENVELOPE_KEYS: [&str; 3] = [ENCRYPTED_KEY, IV_KEY, AUTH_TAG_KEY];

/// An encrypted field value in its persisted form.
///
/// All members are base64 text; byte-length checks happen when the envelope
/// is turned back into raw cipher input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Envelope {
    /// Base64 ciphertext (tag excluded).
    pub encrypted: String,
    /// Base64 96-bit nonce.
    pub iv: String,
    /// Base64 128-bit authentication tag.
    #[serde(rename = "authTag")]
    pub auth_tag: String,
}

impl Envelope {
    /// Build the native JSON object form of this envelope.
    pub fn to_object(&self) -> Value {
        let mut map = Map::with_capacity(ENVELOPE_KEYS.len());
        map.insert(ENCRYPTED_KEY.into(), Value::String(self.encrypted.clone()));
        map.insert(IV_KEY.into(), Value::String(self.iv.clone()));
        map.insert(AUTH_TAG_KEY.into(), Value::String(self.auth_tag.clone()));
        Value::Object(map)
    }

    /// Build the JSON-string form of this envelope, for text columns.
    pub fn to_json_string(&self) -> Value {
        Value::String(self.to_object().to_string())
    }

    /// Decode an envelope from a JSON object.
    ///
    /// # Errors
    ///
    /// Fails if a member is missing, is not a string, or an unknown key is present.
    pub fn from_object(map: Map<String, Value>) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(map))
    }
}
