use rusqlite::{params, Connection, OptionalExtension};

use super::{format_timestamp, next_timestamp, non_blank, parse_timestamp};
use crate::db::DatabaseError;
use crate::models::*;

pub fn insert_patient(conn: &Connection, patient: &NewPatient) -> Result<Patient, DatabaseError> {
    let name = patient.name.trim();
    if name.is_empty() {
        return Err(DatabaseError::Validation("patient name must not be empty".into()));
    }
    let age = patient.age.filter(|&a| a > 0);
    let phone = non_blank(&patient.phone);
    let email = non_blank(&patient.email);

    let latest: Option<String> =
        conn.query_row("SELECT MAX(created_at) FROM patients", [], |row| row.get(0))?;
    let created_at = next_timestamp(latest.as_deref());

    conn.execute(
        "INSERT INTO patients (name, age, phone, email, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![name, age, phone, email, format_timestamp(&created_at)],
    )?;

    Ok(Patient {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        age,
        phone: phone.map(str::to_string),
        email: email.map(str::to_string),
        created_at,
    })
}

pub fn get_patient(conn: &Connection, id: i64) -> Result<Option<Patient>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT patient_id, name, age, phone, email, created_at
             FROM patients WHERE patient_id = ?1",
            params![id],
            patient_row_from_rusqlite,
        )
        .optional()?;

    row.map(patient_from_row).transpose()
}

pub fn patient_exists(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let found = conn
        .query_row(
            "SELECT 1 FROM patients WHERE patient_id = ?1",
            params![id],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// All patients, newest first; equal timestamps fall back to id order.
pub fn list_patients(conn: &Connection) -> Result<Vec<Patient>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT patient_id, name, age, phone, email, created_at
         FROM patients ORDER BY created_at DESC, patient_id ASC",
    )?;

    let rows = stmt.query_map([], patient_row_from_rusqlite)?;

    let mut patients = Vec::new();
    for row in rows {
        patients.push(patient_from_row(row?)?);
    }
    Ok(patients)
}

pub fn count_patients(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?;
    Ok(count)
}

type PatientRow = (i64, String, Option<i64>, Option<String>, Option<String>, String);

fn patient_row_from_rusqlite(row: &rusqlite::Row<'_>) -> rusqlite::Result<PatientRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn patient_from_row(row: PatientRow) -> Result<Patient, DatabaseError> {
    let (id, name, age, phone, email, created_at) = row;
    let age = age
        .map(u32::try_from)
        .transpose()
        .map_err(|_| DatabaseError::CorruptRow(format!("patient {id} has invalid age")))?
        .filter(|&a| a > 0);

    Ok(Patient {
        id,
        name,
        age,
        phone,
        email,
        created_at: parse_timestamp(&created_at)?,
    })
}
