//! Field-level error taxonomy shared across crates.

use thiserror::Error;

/// Failure to convert one sensitive field, tagged with its entity and field.
///
/// Only [`FieldError::Encryption`] ever reaches a caller, and only under the
/// reject write policy. The read-path variants are logged, never returned.
#[derive(Debug, Error)]
pub enum FieldError {
    /// Key missing/invalid or AEAD failure at write time.
    #[error("encryption failed for {entity}.{field}: {reason}")]
    Encryption {
        entity: String,
        field: String,
        reason: String,
    },

    /// Authentication-tag mismatch or malformed envelope at read time.
    #[error("decryption failed for {entity}.{field}: {reason}")]
    Decryption {
        entity: String,
        field: String,
        reason: String,
    },

    /// Decrypted text does not parse as the declared type.
    #[error("coercion failed for {entity}.{field}: {reason}")]
    Coercion {
        entity: String,
        field: String,
        reason: String,
    },
}

impl FieldError {
    /// Short machine-readable code, suitable as a log field.
    pub fn code(&self) -> &'static str {
        match self {
            FieldError::Encryption { .. } => "encryption_error",
            FieldError::Decryption { .. } => "decryption_error",
            FieldError::Coercion { .. } => "coercion_error",
        }
    }
}
