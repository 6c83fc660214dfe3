//! Field encryption key handling.
//!
//! Key provisioning (KMS, secret stores) is outside this crate. The host loads
//! the key once at start-up and hands it over through [`KeyProvider`]; the
//! interceptor asks the provider for the key every time it converts a record.
//!
//! # Security invariants
//!
//! - The key is **never** logged or included in traces.
//! - Copies handed out by a provider are zeroed when dropped.

pub mod store;

pub use store::{FieldKey, KeyError, StaticKey};

use std::sync::Arc;

/// Source of the field encryption key.
#[cfg_attr(test, mockall::automock)]
pub trait KeyProvider: Send + Sync {
    /// Return a short-lived copy of the current key.
    ///
    /// # Errors
    ///
    /// Returns a [`KeyError`] if no usable key is available.
    fn current(&self) -> Result<FieldKey, KeyError>;
}

impl<T: KeyProvider + ?Sized> KeyProvider for Arc<T> {
    fn current(&self) -> Result<FieldKey, KeyError> {
        (**self).current()
    }
}
