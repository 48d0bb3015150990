use rusqlite::{params, Connection};

use super::{format_timestamp, next_timestamp, non_blank, parse_timestamp, patient_exists};
use crate::db::DatabaseError;
use crate::models::*;

/// Insert a diagnosis for an existing patient.
///
/// Fails with `ReferentialIntegrity` when the patient is missing and
/// with `Validation` when the confidence is not a fraction in `[0, 1]`.
/// Nothing is written on failure.
pub fn insert_diagnosis(conn: &Connection, diag: &NewDiagnosis) -> Result<Diagnosis, DatabaseError> {
    if !(0.0..=1.0).contains(&diag.confidence) {
        return Err(DatabaseError::Validation(format!(
            "confidence {} is outside [0, 1]",
            diag.confidence
        )));
    }
    let prediction = diag.prediction.trim();
    if prediction.is_empty() {
        return Err(DatabaseError::Validation("prediction label must not be empty".into()));
    }
    if !patient_exists(conn, diag.patient_id)? {
        return Err(DatabaseError::ReferentialIntegrity {
            patient_id: diag.patient_id,
        });
    }

    let image_path = non_blank(&diag.image_path);
    let latest: Option<String> =
        conn.query_row("SELECT MAX(analysis_date) FROM diagnoses", [], |row| row.get(0))?;
    let analyzed_at = next_timestamp(latest.as_deref());

    conn.execute(
        "INSERT INTO diagnoses (patient_id, disease_prediction, confidence_score, analysis_date, image_path)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            diag.patient_id,
            prediction,
            diag.confidence,
            format_timestamp(&analyzed_at),
            image_path,
        ],
    )
    .map_err(|e| {
        if is_foreign_key_error(&e) {
            DatabaseError::ReferentialIntegrity {
                patient_id: diag.patient_id,
            }
        } else {
            DatabaseError::Sqlite(e)
        }
    })?;

    Ok(Diagnosis {
        id: conn.last_insert_rowid(),
        patient_id: diag.patient_id,
        prediction: prediction.to_string(),
        confidence: diag.confidence,
        image_path: image_path.map(str::to_string),
        analyzed_at,
    })
}

fn is_foreign_key_error(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    )
}

/// Diagnoses for one patient, newest first; equal timestamps fall back
/// to id order. An unknown patient yields an empty list.
pub fn get_diagnoses_for_patient(
    conn: &Connection,
    patient_id: i64,
) -> Result<Vec<Diagnosis>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT diagnosis_id, patient_id, disease_prediction, confidence_score, image_path, analysis_date
         FROM diagnoses WHERE patient_id = ?1
         ORDER BY analysis_date DESC, diagnosis_id ASC",
    )?;

    let rows = stmt.query_map(params![patient_id], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, f64>(3)?,
            row.get::<_, Option<String>>(4)?,
            row.get::<_, String>(5)?,
        ))
    })?;

    diagnosis_rows_to_vec(rows)
}

pub fn count_diagnoses(conn: &Connection, patient_id: i64) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM diagnoses WHERE patient_id = ?1",
        params![patient_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

type DiagnosisRow = (i64, i64, String, f64, Option<String>, String);

fn diagnosis_rows_to_vec(
    rows: rusqlite::MappedRows<'_, impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<DiagnosisRow>>,
) -> Result<Vec<Diagnosis>, DatabaseError> {
    let mut diagnoses = Vec::new();
    for row in rows {
        let (id, patient_id, prediction, confidence, image_path, analyzed_at) = row?;
        diagnoses.push(Diagnosis {
            id,
            patient_id,
            prediction,
            confidence,
            image_path,
            analyzed_at: parse_timestamp(&analyzed_at)?,
        });
    }
    Ok(diagnoses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{insert_patient, list_patients};
    use crate::db::sqlite::open_memory_database;

    fn test_db() -> Connection {
        open_memory_database().unwrap()
    }

    fn make_patient(conn: &Connection, name: &str) -> i64 {
        insert_patient(conn, &NewPatient::named(name)).unwrap().id
    }

    fn new_diag(patient_id: i64, prediction: &str, confidence: f64) -> NewDiagnosis {
        NewDiagnosis {
            patient_id,
            prediction: prediction.into(),
            confidence,
            image_path: None,
        }
    }

    #[test]
    fn patient_insert_assigns_increasing_ids() {
        let conn = test_db();
        let a = make_patient(&conn, "Ada");
        let b = make_patient(&conn, "Grace");
        assert!(b > a);
    }

    #[test]
    fn patient_empty_name_rejected() {
        let conn = test_db();
        let result = insert_patient(&conn, &NewPatient::named("   "));
        assert!(matches!(result, Err(DatabaseError::Validation(_))));
        assert!(list_patients(&conn).unwrap().is_empty());
    }

    #[test]
    fn patient_zero_age_reads_back_unknown() {
        let conn = test_db();
        let p = insert_patient(&conn, &NewPatient {
            name: "Ada".into(),
            age: Some(0),
            phone: Some(String::new()),
            email: Some("ada@example.org".into()),
        })
        .unwrap();
        let stored = crate::db::repository::get_patient(&conn, p.id).unwrap().unwrap();
        assert_eq!(stored.age, None);
        assert_eq!(stored.phone, None);
        assert_eq!(stored.email.as_deref(), Some("ada@example.org"));
    }

    #[test]
    fn diagnosis_for_missing_patient_persists_nothing() {
        let conn = test_db();
        let result = insert_diagnosis(&conn, &new_diag(404, "Eczema", 0.9));
        assert!(matches!(
            result,
            Err(DatabaseError::ReferentialIntegrity { patient_id: 404 })
        ));
        let total: i64 = conn
            .query_row("SELECT COUNT(*) FROM diagnoses", [], |row| row.get(0))
            .unwrap();
        assert_eq!(total, 0);
    }

    #[test]
    fn diagnosis_confidence_out_of_range_rejected() {
        let conn = test_db();
        let pid = make_patient(&conn, "Ada");
        for bad in [1.5, -0.1, f64::NAN, f64::INFINITY] {
            let result = insert_diagnosis(&conn, &new_diag(pid, "Eczema", bad));
            assert!(
                matches!(result, Err(DatabaseError::Validation(_))),
                "confidence {bad} should be rejected"
            );
        }
        assert_eq!(count_diagnoses(&conn, pid).unwrap(), 0);
    }

    #[test]
    fn diagnosis_confidence_bounds_accepted() {
        let conn = test_db();
        let pid = make_patient(&conn, "Ada");
        insert_diagnosis(&conn, &new_diag(pid, "Unknown", 0.0)).unwrap();
        insert_diagnosis(&conn, &new_diag(pid, "Psoriasis", 1.0)).unwrap();
        assert_eq!(count_diagnoses(&conn, pid).unwrap(), 2);
    }

    #[test]
    fn diagnosis_confidence_round_trip() {
        let conn = test_db();
        let pid = make_patient(&conn, "Ada");
        insert_diagnosis(&conn, &new_diag(pid, "Melanoma", 0.873)).unwrap();
        let listed = get_diagnoses_for_patient(&conn, pid).unwrap();
        assert_eq!(listed.len(), 1);
        assert!((listed[0].confidence - 0.873).abs() < 1e-9);
    }

    #[test]
    fn diagnoses_listed_newest_first() {
        let conn = test_db();
        let pid = make_patient(&conn, "Ada");
        let a = insert_diagnosis(&conn, &new_diag(pid, "A", 0.5)).unwrap();
        let b = insert_diagnosis(&conn, &new_diag(pid, "B", 0.5)).unwrap();
        let c = insert_diagnosis(&conn, &new_diag(pid, "C", 0.5)).unwrap();

        let ids: Vec<i64> = get_diagnoses_for_patient(&conn, pid)
            .unwrap()
            .iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec![c.id, b.id, a.id]);
    }

    #[test]
    fn equal_timestamps_break_ties_by_ascending_id() {
        let conn = test_db();
        let pid = make_patient(&conn, "Ada");
        for label in ["first", "second"] {
            conn.execute(
                "INSERT INTO diagnoses (patient_id, disease_prediction, confidence_score, analysis_date)
                 VALUES (?1, ?2, 0.5, '2024-01-01 00:00:00.000000')",
                params![pid, label],
            )
            .unwrap();
        }
        let listed = get_diagnoses_for_patient(&conn, pid).unwrap();
        assert_eq!(listed[0].prediction, "first");
        assert_eq!(listed[1].prediction, "second");
        assert!(listed[0].id < listed[1].id);
    }

    #[test]
    fn diagnoses_scoped_to_patient() {
        let conn = test_db();
        let ada = make_patient(&conn, "Ada");
        let grace = make_patient(&conn, "Grace");
        insert_diagnosis(&conn, &new_diag(ada, "Eczema", 0.8)).unwrap();

        assert_eq!(get_diagnoses_for_patient(&conn, ada).unwrap().len(), 1);
        assert!(get_diagnoses_for_patient(&conn, grace).unwrap().is_empty());
        assert!(get_diagnoses_for_patient(&conn, 9999).unwrap().is_empty());
    }

    #[test]
    fn image_path_kept_verbatim() {
        let conn = test_db();
        let pid = make_patient(&conn, "Ada");
        let mut diag = new_diag(pid, "Acne", 0.7);
        diag.image_path = Some("/scans/does-not-exist.png".into());
        insert_diagnosis(&conn, &diag).unwrap();
        let listed = get_diagnoses_for_patient(&conn, pid).unwrap();
        assert_eq!(listed[0].image_path.as_deref(), Some("/scans/does-not-exist.png"));
    }

    #[test]
    fn patients_listed_newest_first() {
        let conn = test_db();
        let a = make_patient(&conn, "Ada");
        let b = make_patient(&conn, "Grace");
        let ids: Vec<i64> = list_patients(&conn).unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![b, a]);
    }
}
