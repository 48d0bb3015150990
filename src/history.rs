//! Patient history browsing — read-only views over the record store.

use serde::Serialize;

use crate::db::{DatabaseError, RecordStore};
use crate::models::{Diagnosis, Patient};

/// One row of the history browser's patient list.
#[derive(Debug, Clone, Serialize)]
pub struct PatientSummary {
    pub patient: Patient,
    pub diagnosis_count: usize,
    /// Most recent diagnosis, if any.
    pub latest: Option<Diagnosis>,
}

pub struct HistoryQuery<'a> {
    store: &'a RecordStore,
}

impl<'a> HistoryQuery<'a> {
    pub fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }

    /// All patients, newest first.
    pub fn all_patients(&self) -> Result<Vec<Patient>, DatabaseError> {
        self.store.list_patients()
    }

    /// Diagnoses for one patient, newest first. Empty when the patient
    /// has none or does not exist.
    pub fn diagnoses_for(&self, patient_id: i64) -> Result<Vec<Diagnosis>, DatabaseError> {
        self.store.list_diagnoses(patient_id)
    }

    /// Every patient with their diagnosis count and latest diagnosis,
    /// in [`Self::all_patients`] order.
    pub fn summaries(&self) -> Result<Vec<PatientSummary>, DatabaseError> {
        self.all_patients()?
            .into_iter()
            .map(|patient| -> Result<PatientSummary, DatabaseError> {
                let diagnoses = self.diagnoses_for(patient.id)?;
                Ok(PatientSummary {
                    diagnosis_count: diagnoses.len(),
                    latest: diagnoses.into_iter().next(),
                    patient,
                })
            })
            .collect()
    }
}
