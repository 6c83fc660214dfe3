//! AES-256-GCM-SIV encryption and decryption of individual field values.
//!
//! **Algorithm choice:** AES-256-GCM-SIV (RFC 8452) is an AEAD with a 96-bit
//! nonce and a 128-bit tag, the same shape as AES-256-GCM, but it degrades
//! gracefully instead of catastrophically if a nonce ever repeats.
//!
//! Every call to [`encrypt_field`] still draws a fresh random nonce; reuse
//! under one key is a correctness bug regardless of the mode.

use aes_gcm_siv::{
    aead::{Aead, KeyInit, OsRng},
    Aes256GcmSiv, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::Envelope;
use thiserror::Error;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of an AES-GCM-SIV nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of the authentication tag (16 bytes = 128 bits).
pub const TAG_LEN: usize = 16;

/// A sealed field value in raw byte form.
///
/// Converts to and from the base64 [`Envelope`] wire object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedField {
    /// Raw nonce bytes.
    pub nonce: [u8; NONCE_LEN],
    /// Raw ciphertext bytes, tag excluded.
    pub ciphertext: Vec<u8>,
    /// Raw authentication tag bytes.
    pub tag: [u8; TAG_LEN],
}

impl SealedField {
    /// Encode this value as its wire envelope.
    pub fn to_envelope(&self) -> Envelope {
        Envelope {
            encrypted: STANDARD.encode(&self.ciphertext),
            iv: STANDARD.encode(self.nonce),
            auth_tag: STANDARD.encode(self.tag),
        }
    }

    /// Decode a wire envelope back into raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidFormat`] if any member is not valid base64
    /// or the nonce or tag has the wrong byte length.
    pub fn from_envelope(envelope: &Envelope) -> Result<Self, CipherError> {
        let nonce = decode_fixed::<NONCE_LEN>(&envelope.iv)?;
        let tag = decode_fixed::<TAG_LEN>(&envelope.auth_tag)?;
        let ciphertext = STANDARD
            .decode(&envelope.encrypted)
            .map_err(|_| CipherError::InvalidFormat)?;
        Ok(Self {
            nonce,
            ciphertext,
            tag,
        })
    }
}

fn decode_fixed<const N: usize>(b64: &str) -> Result<[u8; N], CipherError> {
    let bytes = STANDARD.decode(b64).map_err(|_| CipherError::InvalidFormat)?;
    bytes.try_into().map_err(|_| CipherError::InvalidFormat)
}

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The key is the wrong length (must be [`KEY_LEN`] bytes).
    #[error("invalid key length: expected {KEY_LEN} bytes")]
    InvalidKeyLength,

    /// The AEAD primitive failed while sealing.
    #[error("aead operation failed")]
    AeadFailure,

    /// The tag did not verify: tampered data or the wrong key.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// The envelope is structurally malformed.
    #[error("invalid envelope format")]
    InvalidFormat,

    /// The authenticated plaintext is not UTF-8 text.
    #[error("decrypted plaintext is not valid UTF-8")]
    InvalidUtf8,
}

/// Encrypt a plaintext field using AES-256-GCM-SIV with no associated data.
///
/// A random 96-bit nonce is generated per call via the OS CSPRNG, which is
/// safe to call concurrently from any number of threads.
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyLength`] if `key` is not [`KEY_LEN`] bytes.
/// Returns [`CipherError::AeadFailure`] on an internal AEAD error (should be unreachable
/// with a valid key and nonce).
pub fn encrypt_field(plaintext: &str, key: &[u8]) -> Result<SealedField, CipherError> {
    let cipher = build_cipher(key)?;

    use aes_gcm_siv::aead::rand_core::RngCore;
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let mut sealed = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|_| CipherError::AeadFailure)?;

    // The AEAD output is ciphertext || tag.
    let split = sealed
        .len()
        .checked_sub(TAG_LEN)
        .ok_or(CipherError::AeadFailure)?;
    let tag: [u8; TAG_LEN] = sealed[split..]
        .try_into()
        .map_err(|_| CipherError::AeadFailure)?;
    sealed.truncate(split);

    Ok(SealedField {
        nonce: nonce_bytes,
        ciphertext: sealed,
        tag,
    })
}

/// Decrypt a [`SealedField`] back to plaintext text.
///
/// The tag is verified before any plaintext is released.
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyLength`] if `key` is not [`KEY_LEN`] bytes.
/// Returns [`CipherError::AuthenticationFailed`] if the tag does not verify.
/// Returns [`CipherError::InvalidUtf8`] if the plaintext is not text.
pub fn decrypt_field(field: &SealedField, key: &[u8]) -> Result<String, CipherError> {
    let cipher = build_cipher(key)?;
    let nonce = Nonce::from_slice(&field.nonce);

    let mut combined = Vec::with_capacity(field.ciphertext.len() + TAG_LEN);
    combined.extend_from_slice(&field.ciphertext);
    combined.extend_from_slice(&field.tag);

    let plaintext = cipher
        .decrypt(nonce, combined.as_slice())
        .map_err(|_| CipherError::AuthenticationFailed)?;
    String::from_utf8(plaintext).map_err(|_| CipherError::InvalidUtf8)
}

fn build_cipher(key: &[u8]) -> Result<Aes256GcmSiv, CipherError> {
    if key.len() != KEY_LEN {
        return Err(CipherError::InvalidKeyLength);
    }
    Aes256GcmSiv::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength)
}
