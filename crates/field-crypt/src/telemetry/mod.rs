//! Structured logging setup.
//!
//! The crate itself only emits `tracing` events and spans; the host decides
//! whether to install the subscriber provided here or its own.
//!
//! # Telemetry invariants
//!
//! - **No PHI or key material** must appear in any span attribute or log field.
//!   Events carry entity name, field name, and error code only.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`).

pub mod init;

pub use init::{init_tracing, LogFormat};
