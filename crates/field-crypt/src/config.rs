//! Configuration loading and validation for the field encryption layer.
//!
//! All values are read from environment variables at startup. The host should
//! refuse to start if any required variable is missing or invalid.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::key::{FieldKey, StaticKey};
use crate::lifecycle::{EnvelopeFormat, FieldInterceptor, WritePolicy};
use crate::registry::FieldRegistry;
use crate::telemetry::LogFormat;

/// Validated field encryption configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Standard base64 of the 32-byte field encryption key. **Required.**
    pub field_encryption_key: String,

    /// Behaviour when a field cannot be encrypted on write.
    #[serde(default)]
    pub write_failure_policy: WritePolicy,

    /// How envelopes are stored in the record.
    #[serde(default)]
    pub envelope_format: EnvelopeFormat,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_log_level() -> String {
    "info".into()
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("field_encryption_key", &"[REDACTED]")
            .field("write_failure_policy", &self.write_failure_policy)
            .field("envelope_format", &self.envelope_format)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::load(config::Environment::default())
    }

    fn load(source: config::Environment) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(source)
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        if self.field_encryption_key.trim().is_empty() {
            anyhow::bail!("FIELD_ENCRYPTION_KEY is required and must not be empty");
        }
        self.key().context("FIELD_ENCRYPTION_KEY is invalid")?;
        Ok(())
    }

    /// Decode the configured key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not base64 or not 32 bytes.
    pub fn key(&self) -> Result<FieldKey> {
        Ok(FieldKey::from_base64(&self.field_encryption_key)?)
    }

    /// Build an interceptor over `registry` using the configured key and policies.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured key cannot be decoded.
    pub fn build_interceptor(
        &self,
        registry: Arc<FieldRegistry>,
    ) -> Result<FieldInterceptor<StaticKey>> {
        let key = self.key().context("failed to load field encryption key")?;
        Ok(FieldInterceptor::new(registry, StaticKey::new(key))
            .with_write_policy(self.write_failure_policy)
            .with_envelope_format(self.envelope_format))
    }
}
