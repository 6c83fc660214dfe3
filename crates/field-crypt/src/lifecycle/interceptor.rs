//! [`FieldInterceptor`]: applies the registry, coercion, and cipher to records.

use std::sync::Arc;

use common::{Envelope, FieldError, Record, Rows};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, debug_span, warn};

use super::{EnvelopeFormat, RecordHooks, WritePolicy};
use crate::coerce;
use crate::crypto::{
    decrypt_field, encrypt_field, envelope_object, is_envelope, CipherError, SealedField,
};
use crate::key::{FieldKey, KeyError, KeyProvider};
use crate::registry::{FieldRegistry, FieldSpec, SensitiveField};

/// Why one field could not be converted.
#[derive(Debug, Error)]
enum ConvertError {
    #[error("key unavailable: {0}")]
    Key(String),

    #[error(transparent)]
    Cipher(#[from] CipherError),
}

/// Transparent field encryption around store writes and loads.
///
/// Holds a frozen [`FieldRegistry`] and a [`KeyProvider`]; every method takes
/// `&self`, so one interceptor can serve all requests concurrently.
pub struct FieldInterceptor<K> {
    registry: Arc<FieldRegistry>,
    keys: K,
    write_policy: WritePolicy,
    format: EnvelopeFormat,
}

impl<K: KeyProvider> FieldInterceptor<K> {
    /// Create an interceptor with the default policies: fail-open writes,
    /// envelopes stored as JSON strings.
    pub fn new(registry: Arc<FieldRegistry>, keys: K) -> Self {
        Self {
            registry,
            keys,
            write_policy: WritePolicy::default(),
            format: EnvelopeFormat::default(),
        }
    }

    /// Set the write-path failure policy.
    pub fn with_write_policy(mut self, policy: WritePolicy) -> Self {
        self.write_policy = policy;
        self
    }

    /// Set how envelopes are stored in the record.
    pub fn with_envelope_format(mut self, format: EnvelopeFormat) -> Self {
        self.format = format;
        self
    }

    /// Encrypt every registered field that is present, non-null, and not
    /// already an envelope. Unregistered entities pass through untouched.
    ///
    /// # Errors
    ///
    /// Under [`WritePolicy::Reject`], returns [`FieldError::Encryption`] for the
    /// first field that cannot be encrypted. Under [`WritePolicy::FailOpen`] this
    /// never fails; the field keeps its plaintext.
    pub fn before_write(&self, entity: &str, mut record: Record) -> Result<Record, FieldError> {
        let Some(spec) = self.registry.get(entity) else {
            return Ok(record);
        };
        let _span = debug_span!("before_write", entity).entered();

        let pending: Vec<&SensitiveField> = spec
            .fields()
            .iter()
            .filter(|f| {
                record
                    .get(&f.name)
                    .is_some_and(|v| !v.is_null() && !is_envelope(v))
            })
            .collect();
        if pending.is_empty() {
            return Ok(record);
        }

        let key = self.keys.current();
        let mut sealed_count = 0usize;
        for field in pending {
            let Some(value) = record.get_mut(&field.name) else {
                continue;
            };
            match self.seal(value, &key) {
                Ok(sealed) => {
                    *value = sealed;
                    sealed_count += 1;
                }
                Err(e) => {
                    let err = FieldError::Encryption {
                        entity: entity.to_owned(),
                        field: field.name.clone(),
                        reason: e.to_string(),
                    };
                    if self.write_policy == WritePolicy::Reject {
                        warn!(entity, field = %field.name, code = err.code(), error = %err, "write rejected");
                        return Err(err);
                    }
                    warn!(
                        entity,
                        field = %field.name,
                        code = err.code(),
                        error = %err,
                        "encryption failed; field persisted in plaintext"
                    );
                }
            }
        }

        debug!(entity, fields = sealed_count, "record encrypted");
        Ok(record)
    }

    /// Batch form of [`FieldInterceptor::before_write`]; output order matches input.
    ///
    /// # Errors
    ///
    /// Under [`WritePolicy::Reject`], the first failing record aborts the batch.
    pub fn before_write_many(
        &self,
        entity: &str,
        records: Vec<Record>,
    ) -> Result<Vec<Record>, FieldError> {
        records
            .into_iter()
            .map(|record| self.before_write(entity, record))
            .collect()
    }

    /// Decrypt the registered fields of loaded rows, preserving their shape and order.
    pub fn after_read(&self, entity: &str, rows: Rows) -> Rows {
        match rows {
            Rows::Empty => Rows::Empty,
            Rows::One(record) => Rows::One(self.after_read_one(entity, record)),
            Rows::Many(records) => Rows::Many(self.after_read_many(entity, records)),
        }
    }

    /// Decrypt a single loaded record.
    pub fn after_read_one(&self, entity: &str, record: Record) -> Record {
        match self.registry.get(entity) {
            Some(spec) => self.open_record(spec, record),
            None => record,
        }
    }

    /// Decrypt a batch of loaded records in input order.
    ///
    /// A corrupted field in one record never affects the others.
    pub fn after_read_many(&self, entity: &str, records: Vec<Record>) -> Vec<Record> {
        let Some(spec) = self.registry.get(entity) else {
            return records;
        };
        records
            .into_iter()
            .map(|record| self.open_record(spec, record))
            .collect()
    }

    fn seal(
        &self,
        value: &Value,
        key: &Result<FieldKey, KeyError>,
    ) -> Result<Value, ConvertError> {
        let key = key.as_ref().map_err(|e| ConvertError::Key(e.to_string()))?;
        let plaintext = coerce::to_plaintext(value);
        let envelope = encrypt_field(&plaintext, key.as_bytes())?.to_envelope();
        Ok(match self.format {
            EnvelopeFormat::String => envelope.to_json_string(),
            EnvelopeFormat::Object => envelope.to_object(),
        })
    }

    fn open(
        &self,
        object: Map<String, Value>,
        key: &Result<FieldKey, KeyError>,
    ) -> Result<String, ConvertError> {
        let key = key.as_ref().map_err(|e| ConvertError::Key(e.to_string()))?;
        let envelope = Envelope::from_object(object).map_err(|_| CipherError::InvalidFormat)?;
        let sealed = SealedField::from_envelope(&envelope)?;
        Ok(decrypt_field(&sealed, key.as_bytes())?)
    }

    fn open_record(&self, spec: &FieldSpec, mut record: Record) -> Record {
        let entity = spec.entity();
        let _span = debug_span!("after_read", entity).entered();

        let mut key = None;
        for field in spec.fields() {
            let Some(value) = record.get_mut(&field.name) else {
                continue;
            };
            // Plaintext (including null) is returned as stored.
            let Some(object) = envelope_object(value) else {
                continue;
            };
            let key = key.get_or_insert_with(|| self.keys.current());

            *value = match self.open(object, key) {
                Ok(text) => match coerce::restore(text, field.kind) {
                    Ok(restored) => restored,
                    Err(e) => {
                        let err = FieldError::Coercion {
                            entity: entity.to_owned(),
                            field: field.name.clone(),
                            reason: e.to_string(),
                        };
                        debug!(entity, field = %field.name, code = err.code(), error = %err, "returning decrypted text");
                        e.into_fallback()
                    }
                },
                Err(e) => {
                    let err = FieldError::Decryption {
                        entity: entity.to_owned(),
                        field: field.name.clone(),
                        reason: e.to_string(),
                    };
                    warn!(
                        entity,
                        field = %field.name,
                        code = err.code(),
                        error = %err,
                        "decryption failed; field returned as null"
                    );
                    Value::Null
                }
            };
        }
        record
    }
}

impl<K: KeyProvider> RecordHooks for FieldInterceptor<K> {
    fn before_write(&self, entity: &str, record: Record) -> Result<Record, FieldError> {
        FieldInterceptor::before_write(self, entity, record)
    }

    fn after_read(&self, entity: &str, rows: Rows) -> Rows {
        FieldInterceptor::after_read(self, entity, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KEY_LEN;
    use crate::key::{MockKeyProvider, StaticKey};
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use common::protocol::record_from_value;
    use serde_json::json;

    const VITALS: &str = "VitalSigns";

    fn registry() -> Arc<FieldRegistry> {
        let mut registry = FieldRegistry::new();
        registry
            .register(
                VITALS,
                [
                    SensitiveField::numeric("systolic_bp"),
                    SensitiveField::text("notes"),
                    SensitiveField::date("taken_on"),
                    SensitiveField::date("recorded_at"),
                ],
            )
            .unwrap();
        Arc::new(registry)
    }

    fn key(byte: u8) -> StaticKey {
        StaticKey::new(FieldKey::from_slice(&[byte; KEY_LEN]).unwrap())
    }

    fn interceptor() -> FieldInterceptor<StaticKey> {
        FieldInterceptor::new(registry(), key(0x42))
    }

    fn unavailable_key() -> MockKeyProvider {
        let mut keys = MockKeyProvider::new();
        keys.expect_current()
            .returning(|| Err(KeyError::NotConfigured));
        keys
    }

    fn record(v: Value) -> Record {
        record_from_value(v).unwrap()
    }

    fn vitals(id: u64, systolic: u64, notes: &str) -> Record {
        record(json!({"id": id, "systolic_bp": systolic, "notes": notes}))
    }

    fn flip_tag_bit(value: &mut Value) {
        let object = envelope_object(value).unwrap();
        let mut envelope = Envelope::from_object(object).unwrap();
        let mut tag = STANDARD.decode(&envelope.auth_tag).unwrap();
        tag[0] ^= 0x01;
        envelope.auth_tag = STANDARD.encode(tag);
        *value = envelope.to_json_string();
    }

    #[test]
    fn write_encrypts_registered_fields_only() {
        let out = interceptor()
            .before_write(VITALS, vitals(1, 120, "stable"))
            .unwrap();
        assert_eq!(out["id"], 1);
        assert!(out["systolic_bp"].is_string());
        assert!(is_envelope(&out["systolic_bp"]));
        assert!(is_envelope(&out["notes"]));
        assert!(!out["notes"].as_str().unwrap().contains("stable"));
    }

    #[test]
    fn object_format_writes_native_envelope() {
        let out = interceptor()
            .with_envelope_format(EnvelopeFormat::Object)
            .before_write(VITALS, vitals(1, 120, "stable"))
            .unwrap();
        let obj = out["systolic_bp"].as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert!(obj.contains_key("authTag"));
    }

    #[test]
    fn write_is_idempotent() {
        let hooks = interceptor();
        let once = hooks.before_write(VITALS, vitals(1, 120, "stable")).unwrap();
        let twice = hooks.before_write(VITALS, once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn absent_and_null_fields_untouched() {
        let out = interceptor()
            .before_write(VITALS, record(json!({"id": 1, "notes": null})))
            .unwrap();
        assert_eq!(out, record(json!({"id": 1, "notes": null})));
    }

    #[test]
    fn unregistered_entity_passes_through() {
        let hooks = interceptor();
        let rec = record(json!({"notes": "not sensitive here"}));
        assert_eq!(hooks.before_write("Appointment", rec.clone()).unwrap(), rec);
        assert_eq!(hooks.after_read_one("Appointment", rec.clone()), rec);
    }

    #[test]
    fn numeric_round_trip_restores_number() {
        let hooks = interceptor();
        let stored = hooks.before_write(VITALS, vitals(1, 120, "ok")).unwrap();
        let loaded = hooks.after_read_one(VITALS, stored);
        assert_eq!(loaded["systolic_bp"], json!(120));
        assert_eq!(loaded["notes"], json!("ok"));
    }

    #[test]
    fn date_round_trip_returns_value_as_written() {
        let hooks = interceptor();
        let input = record(json!({
            "taken_on": "2024-05-01T09:30:00.123456+01:00",
            "recorded_at": 1714552200123i64,
        }));
        let stored = hooks.before_write(VITALS, input.clone()).unwrap();
        assert!(is_envelope(&stored["taken_on"]));
        assert!(is_envelope(&stored["recorded_at"]));
        let loaded = hooks.after_read_one(VITALS, stored);
        assert_eq!(loaded, input);
    }

    #[test]
    fn plain_date_round_trip_is_unchanged() {
        let hooks = interceptor();
        let input = record(json!({"taken_on": "1984-03-07"}));
        let stored = hooks.before_write(VITALS, input.clone()).unwrap();
        assert_eq!(hooks.after_read_one(VITALS, stored), input);
    }

    #[test]
    fn numeric_parse_failure_returns_text() {
        let hooks = interceptor();
        let stored = hooks
            .before_write(VITALS, record(json!({"systolic_bp": "120/80"})))
            .unwrap();
        let loaded = hooks.after_read_one(VITALS, stored);
        assert_eq!(loaded["systolic_bp"], json!("120/80"));
    }

    #[test]
    fn batch_isolates_corrupted_record() {
        let hooks = interceptor();
        let mut stored = hooks
            .before_write_many(
                VITALS,
                vec![vitals(1, 118, "a"), vitals(2, 140, "b"), vitals(3, 125, "c")],
            )
            .unwrap();
        flip_tag_bit(stored[1].get_mut("systolic_bp").unwrap());

        let Rows::Many(loaded) = hooks.after_read(VITALS, Rows::Many(stored)) else {
            panic!("expected a batch back");
        };
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[0], vitals(1, 118, "a"));
        assert_eq!(loaded[1]["id"], 2);
        assert_eq!(loaded[1]["systolic_bp"], Value::Null);
        assert_eq!(loaded[1]["notes"], json!("b"));
        assert_eq!(loaded[2], vitals(3, 125, "c"));
    }

    #[test]
    fn plaintext_passes_through_on_read() {
        let hooks = interceptor();
        let rec = record(json!({"notes": "legacy plaintext", "systolic_bp": "{not json"}));
        assert_eq!(hooks.after_read_one(VITALS, rec.clone()), rec);
    }

    #[test]
    fn malformed_envelope_reads_as_null() {
        let hooks = interceptor();
        let rec = record(json!({
            "notes": {"encrypted": "AAAA", "iv": "AAAA", "authTag": "AAAA"}
        }));
        let loaded = hooks.after_read_one(VITALS, rec);
        assert_eq!(loaded["notes"], Value::Null);
    }

    #[test]
    fn envelope_with_extra_key_reads_as_null() {
        let hooks = interceptor();
        let stored = hooks
            .with_envelope_format(EnvelopeFormat::Object)
            .before_write(VITALS, vitals(1, 120, "x"))
            .unwrap();
        let mut tampered = stored;
        tampered["notes"]
            .as_object_mut()
            .unwrap()
            .insert("alg".into(), json!("none"));
        let loaded = interceptor().after_read_one(VITALS, tampered);
        assert_eq!(loaded["notes"], Value::Null);
        assert_eq!(loaded["systolic_bp"], json!(120));
    }

    #[test]
    fn wrong_key_reads_as_null() {
        let stored = interceptor()
            .before_write(VITALS, vitals(1, 120, "x"))
            .unwrap();
        let other = FieldInterceptor::new(registry(), key(0x07));
        let loaded = other.after_read_one(VITALS, stored);
        assert_eq!(loaded["systolic_bp"], Value::Null);
        assert_eq!(loaded["notes"], Value::Null);
        assert_eq!(loaded["id"], 1);
    }

    #[test]
    fn fail_open_keeps_plaintext_when_key_unavailable() {
        let hooks = FieldInterceptor::new(registry(), unavailable_key());
        let out = hooks.before_write(VITALS, vitals(1, 120, "x")).unwrap();
        assert_eq!(out, vitals(1, 120, "x"));
    }

    #[test]
    fn reject_policy_stops_write() {
        let hooks = FieldInterceptor::new(registry(), unavailable_key())
            .with_write_policy(WritePolicy::Reject);
        let err = hooks.before_write(VITALS, vitals(1, 120, "x")).unwrap_err();
        assert!(matches!(err, FieldError::Encryption { ref field, .. } if field == "systolic_bp"));
    }

    #[test]
    fn read_fails_closed_when_key_unavailable() {
        let stored = interceptor()
            .before_write(VITALS, vitals(1, 120, "x"))
            .unwrap();
        let hooks = FieldInterceptor::new(registry(), unavailable_key());
        let loaded = hooks.after_read_one(VITALS, stored);
        assert_eq!(loaded["systolic_bp"], Value::Null);
        assert_eq!(loaded["notes"], Value::Null);
    }

    #[test]
    fn key_not_requested_when_nothing_to_convert() {
        let mut keys = MockKeyProvider::new();
        keys.expect_current().never();
        let hooks = FieldInterceptor::new(registry(), keys);
        let rec = record(json!({"id": 9, "notes": "plain"}));
        assert_eq!(hooks.after_read_one(VITALS, rec.clone()), rec);
        let empty = record(json!({"id": 9}));
        assert_eq!(hooks.before_write(VITALS, empty.clone()).unwrap(), empty);
    }

    #[test]
    fn rows_shape_is_preserved() {
        let hooks = interceptor();
        assert_eq!(hooks.after_read(VITALS, Rows::Empty), Rows::Empty);
        let stored = hooks.before_write(VITALS, vitals(5, 130, "y")).unwrap();
        assert_eq!(
            hooks.after_read(VITALS, Rows::One(stored)),
            Rows::One(vitals(5, 130, "y"))
        );
    }

    #[test]
    fn hooks_usable_as_trait_object_across_threads() {
        let hooks: Arc<dyn RecordHooks> = Arc::new(interceptor());
        let ivs: Vec<String> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let hooks = Arc::clone(&hooks);
                    s.spawn(move || {
                        let out = hooks.before_write(VITALS, vitals(i, 140, "z")).unwrap();
                        let object = envelope_object(&out["systolic_bp"]).unwrap();
                        object["iv"].as_str().unwrap().to_owned()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        let mut unique = ivs.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), ivs.len());
    }
}
