//! [`FieldKey`] and [`StaticKey`]: the symmetric key loaded once at start-up.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

use crate::crypto::KEY_LEN;

/// Errors produced by the key layer.
#[derive(Debug, Error)]
pub enum KeyError {
    /// No key has been provisioned.
    #[error("field encryption key not configured")]
    NotConfigured,

    /// The key material has an unexpected length.
    #[error("field encryption key has invalid length: expected {KEY_LEN} bytes, got {0}")]
    InvalidLength(usize),

    /// The key material is not valid base64.
    #[error("field encryption key is not valid base64")]
    InvalidEncoding,
}

/// Fixed-size key buffer that holds exactly [`KEY_LEN`] bytes.
///
/// When this type is dropped, the memory is overwritten with zeroes to
/// minimise the window during which plaintext key material lives in RAM.
#[derive(Clone)]
pub struct FieldKey(Box<[u8; KEY_LEN]>);

impl FieldKey {
    /// Copy key material from a slice.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidLength`] if the slice is not [`KEY_LEN`] bytes.
    pub fn from_slice(key_bytes: &[u8]) -> Result<Self, KeyError> {
        if key_bytes.len() != KEY_LEN {
            return Err(KeyError::InvalidLength(key_bytes.len()));
        }
        let mut buf = Box::new([0u8; KEY_LEN]);
        buf.copy_from_slice(key_bytes);
        Ok(Self(buf))
    }

    /// Decode key material from standard base64.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidEncoding`] for bad base64 and
    /// [`KeyError::InvalidLength`] if the decoded key is not [`KEY_LEN`] bytes.
    pub fn from_base64(encoded: &str) -> Result<Self, KeyError> {
        let mut decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|_| KeyError::InvalidEncoding)?;
        let key = Self::from_slice(&decoded);
        decoded.iter_mut().for_each(|b| *b = 0);
        key
    }

    /// Borrow the raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }
}

impl Drop for FieldKey {
    fn drop(&mut self) {
        // Zero the key material on drop.
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for FieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material — not even in debug builds.
        f.write_str("FieldKey([REDACTED])")
    }
}

/// Key provider backed by one key fixed for the life of the process.
///
/// There is no rotation; the key is read-only after construction, so the
/// provider can be shared across threads without locking.
#[derive(Clone, Debug)]
pub struct StaticKey {
    key: FieldKey,
}

impl StaticKey {
    /// Wrap a key loaded at start-up.
    pub fn new(key: FieldKey) -> Self {
        Self { key }
    }
}

impl super::KeyProvider for StaticKey {
    fn current(&self) -> Result<FieldKey, KeyError> {
        Ok(self.key.clone())
    }
}
