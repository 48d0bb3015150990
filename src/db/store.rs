//! `RecordStore` — the process-wide handle to patient records.
//!
//! One SQLite connection behind a mutex. Every call takes the lock for
//! its full duration, so id assignment and timestamp ordering are
//! decided by a single writer. Construct it once at startup, share it
//! through `Arc`, and call [`RecordStore::close`] at shutdown.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;

use super::{repository, sqlite, DatabaseError};
use crate::models::{Diagnosis, NewDiagnosis, NewPatient, Patient};

pub struct RecordStore {
    conn: Mutex<Connection>,
    /// `None` for in-memory stores.
    path: Option<PathBuf>,
}

impl RecordStore {
    /// Open (or create) the record database at `path` and run migrations.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        let conn = sqlite::open_database(path)?;
        tracing::info!(path = %path.display(), "Record store opened");
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open a private in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: Mutex::new(sqlite::open_memory_database()?),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Flush and release the underlying connection.
    pub fn close(self) -> Result<(), DatabaseError> {
        let conn = self
            .conn
            .into_inner()
            .map_err(|_| DatabaseError::LockPoisoned)?;
        conn.close().map_err(|(_, e)| DatabaseError::Sqlite(e))?;
        tracing::info!("Record store closed");
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }

    // ── Writes ──────────────────────────────────────────────

    /// Store a new patient and return the assigned id.
    pub fn create_patient(
        &self,
        name: &str,
        age: Option<u32>,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> Result<i64, DatabaseError> {
        self.insert_patient(&NewPatient {
            name: name.to_string(),
            age,
            phone: phone.map(str::to_string),
            email: email.map(str::to_string),
        })
        .map(|p| p.id)
    }

    /// Store a new patient and return the full record as persisted.
    pub fn insert_patient(&self, patient: &NewPatient) -> Result<Patient, DatabaseError> {
        let conn = self.lock()?;
        let stored = repository::insert_patient(&conn, patient)?;
        tracing::info!(patient_id = stored.id, "Patient created");
        Ok(stored)
    }

    /// Store a diagnosis against an existing patient and return its id.
    pub fn create_diagnosis(
        &self,
        patient_id: i64,
        prediction: &str,
        confidence: f64,
        image_path: Option<&str>,
    ) -> Result<i64, DatabaseError> {
        self.insert_diagnosis(&NewDiagnosis {
            patient_id,
            prediction: prediction.to_string(),
            confidence,
            image_path: image_path.map(str::to_string),
        })
        .map(|d| d.id)
    }

    pub fn insert_diagnosis(&self, diagnosis: &NewDiagnosis) -> Result<Diagnosis, DatabaseError> {
        let conn = self.lock()?;
        match repository::insert_diagnosis(&conn, diagnosis) {
            Ok(stored) => {
                tracing::info!(
                    diagnosis_id = stored.id,
                    patient_id = stored.patient_id,
                    "Diagnosis created"
                );
                Ok(stored)
            }
            Err(e) => {
                tracing::warn!(patient_id = diagnosis.patient_id, error = %e, "Diagnosis rejected");
                Err(e)
            }
        }
    }

    /// Store a patient and their first diagnosis in one transaction.
    ///
    /// `prediction` and `confidence` are checked as in
    /// [`Self::insert_diagnosis`]. Nothing is committed unless both
    /// rows are written.
    pub fn insert_patient_with_diagnosis(
        &self,
        patient: &NewPatient,
        prediction: &str,
        confidence: f64,
        image_path: Option<&str>,
    ) -> Result<(Patient, Diagnosis), DatabaseError> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        let stored_patient = repository::insert_patient(&tx, patient)?;
        let stored_diagnosis = repository::insert_diagnosis(
            &tx,
            &NewDiagnosis {
                patient_id: stored_patient.id,
                prediction: prediction.to_string(),
                confidence,
                image_path: image_path.map(str::to_string),
            },
        )
        .inspect_err(|e| {
            tracing::warn!(error = %e, "Visit rejected, rolling back patient");
        })?;

        tx.commit()?;
        tracing::info!(
            patient_id = stored_patient.id,
            diagnosis_id = stored_diagnosis.id,
            "Patient and diagnosis created"
        );
        Ok((stored_patient, stored_diagnosis))
    }

    // ── Reads ───────────────────────────────────────────────

    pub fn list_patients(&self) -> Result<Vec<Patient>, DatabaseError> {
        let conn = self.lock()?;
        let patients = repository::list_patients(&conn)?;
        tracing::debug!(count = patients.len(), "Listed patients");
        Ok(patients)
    }

    pub fn list_diagnoses(&self, patient_id: i64) -> Result<Vec<Diagnosis>, DatabaseError> {
        let conn = self.lock()?;
        let diagnoses = repository::get_diagnoses_for_patient(&conn, patient_id)?;
        tracing::debug!(patient_id, count = diagnoses.len(), "Listed diagnoses");
        Ok(diagnoses)
    }

    pub fn get_patient(&self, patient_id: i64) -> Result<Option<Patient>, DatabaseError> {
        let conn = self.lock()?;
        repository::get_patient(&conn, patient_id)
    }

    pub fn count_patients(&self) -> Result<i64, DatabaseError> {
        let conn = self.lock()?;
        repository::count_patients(&conn)
    }

    pub fn count_diagnoses(&self, patient_id: i64) -> Result<i64, DatabaseError> {
        let conn = self.lock()?;
        repository::count_diagnoses(&conn, patient_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn test_store() -> RecordStore {
        RecordStore::open_in_memory().unwrap()
    }

    #[test]
    fn created_patient_listed_exactly_once() {
        let store = test_store();
        let before: HashSet<i64> = store.list_patients().unwrap().iter().map(|p| p.id).collect();

        let id = store
            .create_patient("Ada Lovelace", Some(36), Some("555-0100"), Some("ada@example.org"))
            .unwrap();
        assert!(!before.contains(&id));

        let matching: Vec<Patient> = store
            .list_patients()
            .unwrap()
            .into_iter()
            .filter(|p| p.id == id)
            .collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].name, "Ada Lovelace");
        assert_eq!(matching[0].age, Some(36));
        assert_eq!(matching[0].phone.as_deref(), Some("555-0100"));
    }

    #[test]
    fn empty_name_is_validation_error() {
        let store = test_store();
        let err = store.create_patient("", None, None, None).unwrap_err();
        assert!(matches!(err, DatabaseError::Validation(_)));
        assert_eq!(store.count_patients().unwrap(), 0);
    }

    #[test]
    fn diagnosis_for_unknown_patient_fails() {
        let store = test_store();
        let err = store.create_diagnosis(7, "Eczema", 0.9, None).unwrap_err();
        assert!(matches!(err, DatabaseError::ReferentialIntegrity { patient_id: 7 }));
        assert!(!err.is_persistence());
    }

    #[test]
    fn diagnosis_out_of_range_confidence_fails() {
        let store = test_store();
        let pid = store.create_patient("Ada", None, None, None).unwrap();
        assert!(matches!(
            store.create_diagnosis(pid, "Eczema", 1.5, None),
            Err(DatabaseError::Validation(_))
        ));
        assert!(matches!(
            store.create_diagnosis(pid, "Eczema", -0.1, None),
            Err(DatabaseError::Validation(_))
        ));
        assert_eq!(store.count_diagnoses(pid).unwrap(), 0);
    }

    #[test]
    fn diagnoses_returned_c_b_a() {
        let store = test_store();
        let pid = store.create_patient("Ada", None, None, None).unwrap();
        let a = store.create_diagnosis(pid, "Acne", 0.61, None).unwrap();
        let b = store.create_diagnosis(pid, "Eczema", 0.77, None).unwrap();
        let c = store.create_diagnosis(pid, "Rosacea", 0.93, None).unwrap();
        assert!(a < b && b < c);

        let listed: Vec<i64> = store.list_diagnoses(pid).unwrap().iter().map(|d| d.id).collect();
        assert_eq!(listed, vec![c, b, a]);
    }

    #[test]
    fn patient_without_diagnoses_lists_empty() {
        let store = test_store();
        let pid = store.create_patient("Ada", None, None, None).unwrap();
        assert!(store.list_diagnoses(pid).unwrap().is_empty());
        assert!(store.list_diagnoses(12345).unwrap().is_empty());
    }

    #[test]
    fn visit_insert_writes_both_rows() {
        let store = test_store();
        let (patient, diagnosis) = store
            .insert_patient_with_diagnosis(&NewPatient::named("Ada"), "Eczema", 0.92, None)
            .unwrap();
        assert_eq!(diagnosis.patient_id, patient.id);
        assert_eq!(store.list_diagnoses(patient.id).unwrap(), vec![diagnosis]);
    }

    #[test]
    fn failed_visit_diagnosis_rolls_back_patient() {
        let store = test_store();
        for bad in [f64::NAN, 1.5] {
            let err = store
                .insert_patient_with_diagnosis(&NewPatient::named("Ada"), "Eczema", bad, None)
                .unwrap_err();
            assert!(matches!(err, DatabaseError::Validation(_)));
        }
        assert_eq!(store.count_patients().unwrap(), 0);

        // Store still usable after rollback
        store.create_patient("Grace", None, None, None).unwrap();
        assert_eq!(store.count_patients().unwrap(), 1);
    }

    #[test]
    fn concurrent_writers_get_distinct_ordered_ids() {
        let store = Arc::new(test_store());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    (0..5)
                        .map(|j| {
                            store
                                .create_patient(&format!("Patient {i}-{j}"), None, None, None)
                                .unwrap()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<i64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 40);

        // Newest first by timestamp must coincide with descending id
        let listed: Vec<i64> = store.list_patients().unwrap().iter().map(|p| p.id).collect();
        let mut expected = listed.clone();
        expected.sort_unstable_by(|a, b| b.cmp(a));
        assert_eq!(listed, expected);
    }

    #[test]
    fn reopen_from_disk_preserves_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.db");

        let store = RecordStore::open(&path).unwrap();
        let pid = store.create_patient("Ada", Some(36), None, None).unwrap();
        store.create_diagnosis(pid, "Eczema", 0.92, Some("/scans/ada.png")).unwrap();
        store.close().unwrap();

        let store = RecordStore::open(&path).unwrap();
        assert_eq!(store.path(), Some(path.as_path()));
        let patient = store.get_patient(pid).unwrap().unwrap();
        assert_eq!(patient.name, "Ada");
        let diagnoses = store.list_diagnoses(pid).unwrap();
        assert_eq!(diagnoses.len(), 1);
        assert_eq!(diagnoses[0].prediction, "Eczema");

        // Ids keep increasing after a restart
        let next = store.create_patient("Grace", None, None, None).unwrap();
        assert!(next > pid);
    }
}
