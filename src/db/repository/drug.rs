use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::{format_timestamp, map_constraint, parse_timestamp, parse_uuid, DatabaseError};
use crate::models::Drug;

pub fn insert_drug(conn: &Connection, drug: &Drug) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO drugs (id, name, created_at) VALUES (?1, ?2, ?3)",
        params![
            drug.id.to_string(),
            drug.name,
            format_timestamp(&drug.created_at),
        ],
    )
    .map_err(|e| map_constraint(e, "drug name already registered"))?;
    Ok(())
}

pub fn drug_exists(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let found = conn
        .query_row(
            "SELECT 1 FROM drugs WHERE id = ?1",
            params![id.to_string()],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

pub fn get_drug(conn: &Connection, id: &Uuid) -> Result<Option<Drug>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, name, created_at FROM drugs WHERE id = ?1",
            params![id.to_string()],
            drug_row,
        )
        .optional()?;
    row.map(drug_from_row).transpose()
}

pub fn list_drugs(conn: &Connection) -> Result<Vec<Drug>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT id, name, created_at FROM drugs ORDER BY name ASC")?;
    let rows = stmt.query_map([], drug_row)?;

    let mut drugs = Vec::new();
    for row in rows {
        drugs.push(drug_from_row(row?)?);
    }
    Ok(drugs)
}

/// Returns `false` when no such drug. A name already in use is a constraint violation.
pub fn rename_drug(conn: &Connection, id: &Uuid, name: &str) -> Result<bool, DatabaseError> {
    let changed = conn
        .execute(
            "UPDATE drugs SET name = ?2 WHERE id = ?1",
            params![id.to_string(), name],
        )
        .map_err(|e| map_constraint(e, "drug name already registered"))?;
    Ok(changed > 0)
}

/// Returns `false` when no such drug. A drug still named by a prescription
/// line cannot be deleted (foreign key).
pub fn delete_drug(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let changed = conn
        .execute("DELETE FROM drugs WHERE id = ?1", params![id.to_string()])
        .map_err(|e| map_constraint(e, "drug is still prescribed"))?;
    Ok(changed > 0)
}

fn drug_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn drug_from_row((id, name, created_at): (String, String, String)) -> Result<Drug, DatabaseError> {
    Ok(Drug {
        id: parse_uuid("drugs.id", &id)?,
        name,
        created_at: parse_timestamp("drugs.created_at", &created_at)?,
    })
}
