//! Static registry of which entity fields are sensitive.
//!
//! # Responsibilities
//!
//! - Hold one [`FieldSpec`] per entity, built once at process start.
//! - Reject duplicate entities and duplicate field names at registration time.
//! - Serve read-only lookups to the interceptor; the registry is frozen behind
//!   an `Arc` before the first hook runs.
//!
//! # Module invariants
//!
//! - **No crypto dependencies.** This module must not import anything from `crate::crypto`
//!   or `crate::key`.

pub mod defaults;
pub mod spec;

pub use spec::{FieldSpec, FieldType, SensitiveField};

use std::collections::{HashMap, HashSet};

use thiserror::Error;

/// Errors from registry construction.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The entity name is empty or whitespace.
    #[error("entity name must not be empty")]
    EmptyEntityName,

    /// The entity was already registered.
    #[error("entity already registered: {0}")]
    DuplicateEntity(String),

    /// A field name appears twice in one entity's declaration.
    #[error("field {field} declared twice for entity {entity}")]
    DuplicateField { entity: String, field: String },

    /// The static JSON configuration could not be parsed.
    #[error("invalid registry configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Per-entity sensitive-field configuration.
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    entities: HashMap<String, FieldSpec>,
}

impl FieldRegistry {
    /// Create a new, empty [`FieldRegistry`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the sensitive fields of `entity`.
    ///
    /// Field order is preserved. An entity with no fields is allowed and
    /// behaves like an unregistered one.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateEntity`] if `entity` is already present,
    /// [`RegistryError::DuplicateField`] if a field name repeats, and
    /// [`RegistryError::EmptyEntityName`] for a blank entity name.
    pub fn register(
        &mut self,
        entity: impl Into<String>,
        fields: impl IntoIterator<Item = SensitiveField>,
    ) -> Result<(), RegistryError> {
        let entity = entity.into();
        if entity.trim().is_empty() {
            return Err(RegistryError::EmptyEntityName);
        }
        if self.entities.contains_key(&entity) {
            return Err(RegistryError::DuplicateEntity(entity));
        }

        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        for field in fields {
            if !seen.insert(field.name.clone()) {
                return Err(RegistryError::DuplicateField {
                    entity,
                    field: field.name,
                });
            }
            ordered.push(field);
        }

        self.entities
            .insert(entity.clone(), FieldSpec::new(entity, ordered));
        Ok(())
    }

    /// Build a registry from static JSON configuration.
    ///
    /// The document maps entity names to field lists:
    /// `{"VitalSigns": [{"name": "systolic_bp", "kind": "numeric"}]}`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Parse`] for malformed JSON, or any error
    /// [`FieldRegistry::register`] would return.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let raw: HashMap<String, Vec<SensitiveField>> = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for (entity, fields) in raw {
            registry.register(entity, fields)?;
        }
        Ok(registry)
    }

    /// Look up the spec for an entity.
    pub fn get(&self, entity: &str) -> Option<&FieldSpec> {
        self.entities.get(entity)
    }

    /// Return the number of registered entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Return `true` if no entities are registered.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initially_empty() {
        let registry = FieldRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get("Patient").is_none());
    }

    #[test]
    fn register_and_get_preserves_order() {
        let mut registry = FieldRegistry::new();
        registry
            .register(
                "VitalSigns",
                [
                    SensitiveField::numeric("systolic_bp"),
                    SensitiveField::numeric("diastolic_bp"),
                    SensitiveField::text("notes"),
                ],
            )
            .unwrap();
        let spec = registry.get("VitalSigns").unwrap();
        let names: Vec<_> = spec.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["systolic_bp", "diastolic_bp", "notes"]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_entity_rejected() {
        let mut registry = FieldRegistry::new();
        registry.register("Patient", [SensitiveField::text("ssn")]).unwrap();
        let err = registry
            .register("Patient", [SensitiveField::text("phone")])
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateEntity(ref e) if e == "Patient"));
    }

    #[test]
    fn duplicate_field_rejected() {
        let mut registry = FieldRegistry::new();
        let err = registry
            .register(
                "Patient",
                [SensitiveField::text("ssn"), SensitiveField::date("ssn")],
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateField { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn blank_entity_rejected() {
        let mut registry = FieldRegistry::new();
        assert!(matches!(
            registry.register("  ", Vec::<SensitiveField>::new()),
            Err(RegistryError::EmptyEntityName)
        ));
    }

    #[test]
    fn from_json_builds_registry() {
        let registry = FieldRegistry::from_json(
            r#"{
                "VitalSigns": [
                    {"name": "heart_rate", "kind": "numeric"},
                    {"name": "notes"}
                ],
                "Patient": [{"name": "date_of_birth", "kind": "date"}]
            }"#,
        )
        .unwrap();
        assert_eq!(registry.len(), 2);
        let vitals = registry.get("VitalSigns").unwrap();
        assert_eq!(vitals.kind_of("heart_rate"), Some(FieldType::Numeric));
        assert_eq!(vitals.kind_of("notes"), Some(FieldType::Text));
    }

    #[test]
    fn from_json_rejects_unknown_kind() {
        let err = FieldRegistry::from_json(r#"{"X": [{"name": "a", "kind": "blob"}]}"#);
        assert!(matches!(err, Err(RegistryError::Parse(_))));
    }
}
