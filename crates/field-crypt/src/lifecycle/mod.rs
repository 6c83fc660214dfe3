//! Lifecycle interception: the two hooks the host persistence layer calls.
//!
//! ```text
//! before_write:  PRE_WRITE → ENCRYPTING → DONE
//! after_read:    POST_READ → DECRYPTING → DONE
//! ```
//!
//! Each path runs once per record, and once per record in input order for a
//! batch. Records never leave this module half-converted.
//!
//! # Failure policies
//!
//! - **Write** is governed by [`WritePolicy`]. The default, [`WritePolicy::FailOpen`],
//!   persists the plaintext when a field cannot be encrypted. [`WritePolicy::Reject`]
//!   stops the write instead.
//! - **Read** is always fail-closed: a field that cannot be decrypted becomes
//!   `null`, and the remaining fields and records are unaffected.

pub mod interceptor;

pub use interceptor::FieldInterceptor;

use common::{FieldError, Record, Rows};
use serde::Deserialize;

/// What to do when a field cannot be encrypted on the write path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// Leave the field in plaintext, log, and let the write proceed.
    #[default]
    FailOpen,
    /// Return the error and do not hand the record to storage.
    Reject,
}

/// How an envelope is stored in the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeFormat {
    /// Serialised JSON text, for text-typed columns.
    #[default]
    String,
    /// Native JSON object, for JSON-typed columns.
    Object,
}

/// Contract between the host persistence layer and the encryption layer.
///
/// The store calls [`RecordHooks::before_write`] immediately before a create or
/// update is sent to storage, and [`RecordHooks::after_read`] immediately after
/// storage returns rows.
///
/// Registration lives on [`FieldRegistry::register`](crate::registry::FieldRegistry::register),
/// not here. The host registers every entity first, then freezes the registry
/// behind an `Arc` and hands it to
/// [`FieldInterceptor::new`](crate::lifecycle::FieldInterceptor::new).
pub trait RecordHooks: Send + Sync {
    /// Encrypt the registered fields of `record`.
    ///
    /// # Errors
    ///
    /// Only returns an error under [`WritePolicy::Reject`].
    fn before_write(&self, entity: &str, record: Record) -> Result<Record, FieldError>;

    /// Decrypt the registered fields of every loaded row. Never fails.
    fn after_read(&self, entity: &str, rows: Rows) -> Rows;
}
