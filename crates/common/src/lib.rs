//! Common types, wire formats, and errors shared across `clinic-field-crypt` crates.

pub mod envelope;
pub mod error;
pub mod protocol;

pub use envelope::Envelope;
pub use error::FieldError;
pub use protocol::{Record, Rows};
