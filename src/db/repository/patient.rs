use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::{format_timestamp, map_constraint, parse_timestamp, parse_uuid, DatabaseError};
use crate::models::Patient;

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, full_name, timezone_offset, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            patient.id.to_string(),
            patient.full_name,
            patient.timezone_offset,
            format_timestamp(&patient.created_at),
        ],
    )
    .map_err(|e| map_constraint(e, "patient"))?;
    Ok(())
}

const PATIENT_COLUMNS: &str = "id, full_name, timezone_offset, created_at";

type PatientRow = (String, String, i32, String);

fn patient_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PatientRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn patient_from_row(row: PatientRow) -> Result<Patient, DatabaseError> {
    let (id, full_name, timezone_offset, created_at) = row;
    Ok(Patient {
        id: parse_uuid("patients.id", &id)?,
        full_name,
        timezone_offset,
        created_at: parse_timestamp("patients.created_at", &created_at)?,
    })
}

pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Option<Patient>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1"),
            params![id.to_string()],
            patient_row,
        )
        .optional()?;
    row.map(patient_from_row).transpose()
}

/// All patients, alphabetical by name.
pub fn list_patients(conn: &Connection) -> Result<Vec<Patient>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients ORDER BY full_name ASC, id ASC"
    ))?;
    let rows = stmt.query_map([], patient_row)?;

    let mut patients = Vec::new();
    for row in rows {
        patients.push(patient_from_row(row?)?);
    }
    Ok(patients)
}

/// Overwrite the given fields, keep the rest. Returns `false` when no such patient.
pub fn update_patient(
    conn: &Connection,
    id: &Uuid,
    full_name: Option<&str>,
    timezone_offset: Option<i32>,
) -> Result<bool, DatabaseError> {
    let changed = conn
        .execute(
            "UPDATE patients
             SET full_name = COALESCE(?2, full_name),
                 timezone_offset = COALESCE(?3, timezone_offset)
             WHERE id = ?1",
            params![id.to_string(), full_name, timezone_offset],
        )
        .map_err(|e| map_constraint(e, "patient"))?;
    Ok(changed > 0)
}

/// Offset in minutes east of UTC, `None` when the patient does not exist.
pub fn get_patient_timezone_offset(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<i32>, DatabaseError> {
    let offset = conn
        .query_row(
            "SELECT timezone_offset FROM patients WHERE id = ?1",
            params![id.to_string()],
            |row| row.get::<_, i32>(0),
        )
        .optional()?;
    Ok(offset)
}
