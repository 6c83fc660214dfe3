//! `field-crypt`: transparent field-level encryption for regulated clinic records.
//!
//! Set-up sequence for a host:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise logging with [`telemetry::init_tracing`].
//! 3. Build the [`FieldRegistry`] (e.g. [`registry::defaults::clinic_registry`]).
//! 4. Build the interceptor with [`Config::build_interceptor`].
//! 5. Call [`RecordHooks::before_write`] before every create/update and
//!    [`RecordHooks::after_read`] after every load.

pub mod coerce;
pub mod config;
pub mod crypto;
pub mod key;
pub mod lifecycle;
pub mod registry;
pub mod telemetry;

pub use common::{Envelope, FieldError, Record, Rows};
pub use config::Config;
pub use key::{FieldKey, KeyProvider, StaticKey};
pub use lifecycle::{EnvelopeFormat, FieldInterceptor, RecordHooks, WritePolicy};
pub use registry::{FieldRegistry, FieldType, SensitiveField};
