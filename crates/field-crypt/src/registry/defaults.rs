//! Built-in registry for the clinic's regulated entities.

use super::{FieldRegistry, RegistryError, SensitiveField};

pub const PATIENT: &str = "Patient";
pub const VITAL_SIGNS: &str = "VitalSigns";
pub const CONSULTATION: &str = "Consultation";

/// Build the registry covering patient identity, vital signs, and consultation notes.
///
/// # Errors
///
/// Only fails if the declarations below contain a duplicate.
pub fn clinic_registry() -> Result<FieldRegistry, RegistryError> {
    let mut registry = FieldRegistry::new();

    registry.register(
        PATIENT,
        [
            SensitiveField::text("national_id"),
            SensitiveField::date("date_of_birth"),
            SensitiveField::text("phone"),
            SensitiveField::text("address"),
            SensitiveField::text("insurance_number"),
        ],
    )?;

    registry.register(
        VITAL_SIGNS,
        [
            SensitiveField::numeric("systolic_bp"),
            SensitiveField::numeric("diastolic_bp"),
            SensitiveField::numeric("heart_rate"),
            SensitiveField::numeric("temperature_c"),
            SensitiveField::numeric("weight_kg"),
            SensitiveField::text("notes"),
        ],
    )?;

    registry.register(
        CONSULTATION,
        [
            SensitiveField::text("chief_complaint"),
            SensitiveField::text("diagnosis"),
            SensitiveField::text("clinical_notes"),
            SensitiveField::text("prescription"),
            SensitiveField::date("follow_up_date"),
        ],
    )?;

    Ok(registry)
}
