//! AES-256-GCM-SIV field encryption primitives and envelope detection.
//!
//! This module is intentionally free of registry and lifecycle dependencies.
//! It provides the low-level operations the interceptor composes.
//!
//! # Ciphertext format
//!
//! ```text
//! {"encrypted":"<base64(ciphertext)>","iv":"<base64(nonce)>","authTag":"<base64(tag)>"}
//! ```

pub mod cipher;
pub mod detect;

pub use cipher::{decrypt_field, encrypt_field, CipherError, SealedField, KEY_LEN};
pub use detect::{envelope_object, is_envelope};
