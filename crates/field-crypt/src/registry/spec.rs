//! Per-entity sensitive-field declarations.

use serde::Deserialize;

/// Semantic type of a sensitive field, used to restore it after decryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Numeric clinical measurement; exposed to callers as a JSON number.
    Numeric,
    /// Free text.
    Text,
    /// Calendar date or timestamp, exposed as canonical text.
    Date,
}

/// One field that must be encrypted at rest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SensitiveField {
    /// Field name as it appears in the record.
    pub name: String,
    /// Declared semantic type.
    #[serde(default = "default_kind")]
    pub kind: FieldType,
}

fn default_kind() -> FieldType {
    FieldType::Text
}

impl SensitiveField {
    /// Declare a field with an explicit type.
    pub fn new(name: impl Into<String>, kind: FieldType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn numeric(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Numeric)
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Text)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Date)
    }
}

/// The sensitive fields of one entity, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    entity: String,
    fields: Vec<SensitiveField>,
}

impl FieldSpec {
    pub(crate) fn new(entity: String, fields: Vec<SensitiveField>) -> Self {
        Self { entity, fields }
    }

    /// Entity name this spec applies to.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Sensitive fields in declaration order.
    pub fn fields(&self) -> &[SensitiveField] {
        &self.fields
    }

    /// Look up the declared type of `name`, if it is sensitive.
    pub fn kind_of(&self, name: &str) -> Option<FieldType> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.kind)
    }
}
