use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::{format_timestamp, map_constraint, parse_timestamp, parse_uuid, DatabaseError};
use crate::models::{PrescriptionDrug, PrescriptionDrugView, PrescriptionRecord};

pub fn insert_prescription_record(
    conn: &Connection,
    record: &PrescriptionRecord,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO prescription_records (id, patient_id, doctor_id, general_notes, is_completed, prescribed_on)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            record.id.to_string(),
            record.patient_id.to_string(),
            record.doctor_id.to_string(),
            record.general_notes,
            record.is_completed as i32,
            format_timestamp(&record.prescribed_on),
        ],
    )
    .map_err(|e| map_constraint(e, "prescription record"))?;
    Ok(())
}

pub fn insert_prescription_drug(
    conn: &Connection,
    item: &PrescriptionDrug,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO prescription_drugs (id, record_id, drug_id, dosage, frequency, duration_days, drug_notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            item.id.to_string(),
            item.record_id.to_string(),
            item.drug_id.to_string(),
            item.dosage,
            item.frequency,
            item.duration_days,
            item.drug_notes,
        ],
    )
    .map_err(|e| map_constraint(e, "prescription drug"))?;
    Ok(())
}

type RecordRow = (String, String, String, Option<String>, bool, String);

fn record_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecordRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get::<_, i32>(4)? != 0,
        row.get(5)?,
    ))
}

fn record_from_row(row: RecordRow) -> Result<PrescriptionRecord, DatabaseError> {
    let (id, patient_id, doctor_id, general_notes, is_completed, prescribed_on) = row;
    Ok(PrescriptionRecord {
        id: parse_uuid("prescription_records.id", &id)?,
        patient_id: parse_uuid("prescription_records.patient_id", &patient_id)?,
        doctor_id: parse_uuid("prescription_records.doctor_id", &doctor_id)?,
        general_notes,
        is_completed,
        prescribed_on: parse_timestamp("prescription_records.prescribed_on", &prescribed_on)?,
    })
}

pub fn get_prescription_record(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<PrescriptionRecord>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, patient_id, doctor_id, general_notes, is_completed, prescribed_on
             FROM prescription_records WHERE id = ?1",
            params![id.to_string()],
            record_row,
        )
        .optional()?;
    row.map(record_from_row).transpose()
}

/// Newest first, optionally restricted to one patient.
pub fn list_prescription_records(
    conn: &Connection,
    patient_id: Option<&Uuid>,
) -> Result<Vec<PrescriptionRecord>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, doctor_id, general_notes, is_completed, prescribed_on
         FROM prescription_records
         WHERE (?1 IS NULL OR patient_id = ?1)
         ORDER BY prescribed_on DESC",
    )?;

    let rows = stmt.query_map(params![patient_id.map(|id| id.to_string())], record_row)?;

    let mut records = Vec::new();
    for row in rows {
        records.push(record_from_row(row?)?);
    }
    Ok(records)
}

/// Drug lines of a prescription with drug names, alphabetical.
pub fn get_prescription_drug_views(
    conn: &Connection,
    record_id: &Uuid,
) -> Result<Vec<PrescriptionDrugView>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT d.id, d.drug_id, g.name, d.dosage, d.frequency, d.duration_days, d.drug_notes
         FROM prescription_drugs d
         JOIN drugs g ON g.id = d.drug_id
         WHERE d.record_id = ?1
         ORDER BY g.name ASC",
    )?;

    let rows = stmt.query_map(params![record_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, u32>(5)?,
            row.get::<_, Option<String>>(6)?,
        ))
    })?;

    let mut views = Vec::new();
    for row in rows {
        let (id, drug_id, drug_name, dosage, frequency, duration_days, drug_notes) = row?;
        views.push(PrescriptionDrugView {
            id: parse_uuid("prescription_drugs.id", &id)?,
            drug_id: parse_uuid("prescription_drugs.drug_id", &drug_id)?,
            drug_name,
            dosage,
            frequency,
            duration_days,
            drug_notes,
        });
    }
    Ok(views)
}

/// Returns `false` when no such prescription exists.
pub fn mark_prescription_completed(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE prescription_records SET is_completed = 1 WHERE id = ?1",
        params![id.to_string()],
    )?;
    Ok(changed > 0)
}
