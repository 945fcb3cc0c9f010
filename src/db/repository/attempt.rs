use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::{format_timestamp, map_constraint, parse_timestamp, parse_uuid, DatabaseError};
use crate::models::enums::{AttemptResult, DeliveryChannel};
use crate::models::ReminderAttempt;

/// Append one attempt. The attempt log is never updated or deleted.
pub fn insert_attempt(conn: &Connection, attempt: &ReminderAttempt) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO reminder_attempts (id, schedule_id, channel, result, attempted_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            attempt.id.to_string(),
            attempt.schedule_id.to_string(),
            attempt.channel.as_str(),
            attempt.result.as_str(),
            format_timestamp(&attempt.attempted_at),
        ],
    )
    .map_err(|e| map_constraint(e, "reminder attempt"))?;
    Ok(())
}

/// Oldest first, optionally for a single queue entry.
pub fn list_attempts(
    conn: &Connection,
    schedule_id: Option<&Uuid>,
) -> Result<Vec<ReminderAttempt>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, schedule_id, channel, result, attempted_at
         FROM reminder_attempts
         WHERE (?1 IS NULL OR schedule_id = ?1)
         ORDER BY attempted_at ASC, id ASC",
    )?;

    let rows = stmt.query_map(params![schedule_id.map(|id| id.to_string())], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
        ))
    })?;

    let mut attempts = Vec::new();
    for row in rows {
        let (id, schedule_id, channel, result, attempted_at) = row?;
        attempts.push(ReminderAttempt {
            id: parse_uuid("reminder_attempts.id", &id)?,
            schedule_id: parse_uuid("reminder_attempts.schedule_id", &schedule_id)?,
            channel: DeliveryChannel::from_str(&channel)?,
            result: AttemptResult::from_str(&result)?,
            attempted_at: parse_timestamp("reminder_attempts.attempted_at", &attempted_at)?,
        });
    }
    Ok(attempts)
}
