//! Patient intake — turning submitted form values and an interpreted
//! analysis into stored records.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::{DatabaseError, RecordStore};
use crate::interpreter::DiagnosisResult;
use crate::models::NewPatient;

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Age must be a whole number of years, got {0:?}")]
    InvalidAge(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Raw patient form values as typed by the user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientForm {
    pub name: String,
    pub age: String,
    pub phone: String,
    pub email: String,
}

/// Ids assigned when an analysis is saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SavedRecord {
    pub patient_id: i64,
    pub diagnosis_id: i64,
}

impl PatientForm {
    /// Trim every field and check the name and age.
    ///
    /// A blank age means unknown. Phone and email are not format-checked.
    pub fn validate(&self) -> Result<NewPatient, IntakeError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(DatabaseError::Validation("patient name must not be empty".into()).into());
        }

        let age = match self.age.trim() {
            "" => None,
            text => Some(
                text.parse::<u32>()
                    .map_err(|_| IntakeError::InvalidAge(text.to_string()))?,
            ),
        };

        Ok(NewPatient {
            name: name.to_string(),
            age,
            phone: optional(&self.phone),
            email: optional(&self.email),
        })
    }
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Store the patient from `form` and the interpreted result against them.
///
/// Both rows are written in one transaction; on error neither exists.
///
/// The stored confidence is the interpreter's fraction, not a value
/// recovered from rendered text. An `Unknown` result is stored as-is;
/// deciding whether to save it is the caller's call.
pub fn save_analysis(
    store: &RecordStore,
    form: &PatientForm,
    result: &DiagnosisResult,
    image_path: Option<&str>,
) -> Result<SavedRecord, IntakeError> {
    let patient = form.validate()?;
    let (patient, diagnosis) = store.insert_patient_with_diagnosis(
        &patient,
        &result.label,
        result.confidence,
        image_path,
    )?;

    Ok(SavedRecord {
        patient_id: patient.id,
        diagnosis_id: diagnosis.id,
    })
}
