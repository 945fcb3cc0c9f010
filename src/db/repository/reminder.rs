//! Reminder queue access.
//!
//! Rows move `pending → in_progress → sent`, and any non-terminal row may be
//! confirmed to `completed`. Workers coordinate only through the
//! `claimed_by` / `claim_expires_at` lease columns: a row with a live lease
//! belongs to exactly one worker, and everyone else skips it.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use uuid::Uuid;

use crate::db::{format_timestamp, map_constraint, parse_timestamp, parse_uuid, DatabaseError};
use crate::models::enums::ReminderStatus;
use crate::models::{ClaimedReminder, ReminderSchedule, ScheduleFilter};

/// Persist each instant as a new `pending` entry for the drug line.
///
/// Runs on whatever connection or transaction it is handed; prescription
/// creation passes its own transaction so the rows commit with it or not at all.
pub fn enqueue_reminders(
    conn: &Connection,
    prescription_drug_id: &Uuid,
    instants: &[DateTime<Utc>],
    created_at: &DateTime<Utc>,
) -> Result<usize, DatabaseError> {
    let mut stmt = conn.prepare(
        "INSERT INTO reminder_schedule (id, prescription_drug_id, scheduled_at, status, created_at)
         VALUES (?1, ?2, ?3, 'pending', ?4)",
    )?;
    let created_at = format_timestamp(created_at);
    let drug_id = prescription_drug_id.to_string();

    for instant in instants {
        stmt.execute(params![
            Uuid::new_v4().to_string(),
            drug_id,
            format_timestamp(instant),
            created_at,
        ])
        .map_err(|e| map_constraint(e, "reminder schedule"))?;
    }
    Ok(instants.len())
}

type ScheduleRow = (String, String, String, String, Option<String>, String);

fn schedule_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScheduleRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn schedule_from_row(row: ScheduleRow) -> Result<ReminderSchedule, DatabaseError> {
    let (id, drug_id, scheduled_at, status, confirmed_at, created_at) = row;
    Ok(ReminderSchedule {
        id: parse_uuid("reminder_schedule.id", &id)?,
        prescription_drug_id: parse_uuid("reminder_schedule.prescription_drug_id", &drug_id)?,
        scheduled_at: parse_timestamp("reminder_schedule.scheduled_at", &scheduled_at)?,
        status: ReminderStatus::from_str(&status)?,
        intake_confirmed_at: confirmed_at
            .map(|c| parse_timestamp("reminder_schedule.intake_confirmed_at", &c))
            .transpose()?,
        created_at: parse_timestamp("reminder_schedule.created_at", &created_at)?,
    })
}

pub fn get_reminder(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<ReminderSchedule>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, prescription_drug_id, scheduled_at, status, intake_confirmed_at, created_at
             FROM reminder_schedule WHERE id = ?1",
            params![id.to_string()],
            schedule_row,
        )
        .optional()?;
    row.map(schedule_from_row).transpose()
}

/// Entries in ascending scheduled order, optionally filtered by drug line and/or status.
pub fn list_reminders(
    conn: &Connection,
    filter: &ScheduleFilter,
) -> Result<Vec<ReminderSchedule>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, prescription_drug_id, scheduled_at, status, intake_confirmed_at, created_at
         FROM reminder_schedule
         WHERE (?1 IS NULL OR prescription_drug_id = ?1)
           AND (?2 IS NULL OR status = ?2)
         ORDER BY scheduled_at ASC, id ASC",
    )?;

    let rows = stmt.query_map(
        params![
            filter.prescription_drug_id.map(|id| id.to_string()),
            filter.status.map(|s| s.as_str()),
        ],
        schedule_row,
    )?;

    let mut reminders = Vec::new();
    for row in rows {
        reminders.push(schedule_from_row(row?)?);
    }
    Ok(reminders)
}

/// Mark a non-terminal entry `completed`. Returns `None` when the entry does
/// not exist or was already completed; the earlier confirmation time is kept.
pub fn confirm_reminder(
    conn: &Connection,
    id: &Uuid,
    confirmed_at: &DateTime<Utc>,
) -> Result<Option<ReminderSchedule>, DatabaseError> {
    let changed = conn.execute(
        "UPDATE reminder_schedule
         SET status = 'completed', intake_confirmed_at = ?2,
             claimed_by = NULL, claim_expires_at = NULL
         WHERE id = ?1 AND status != 'completed'",
        params![id.to_string(), format_timestamp(confirmed_at)],
    )?;
    if changed == 0 {
        return Ok(None);
    }
    get_reminder(conn, id)
}

// ═══════════════════════════════════════════════════════════
// Worker claims
// ═══════════════════════════════════════════════════════════

/// Claim up to `limit` due entries for `worker_id`.
///
/// Runs as one short `BEGIN IMMEDIATE` transaction. Candidates are due,
/// `pending` or `in_progress`, carry a four-digit-year instant and no live
/// lease; each is moved to `in_progress` under a lease that ends at
/// `lease_until`. A candidate whose conditional update matches nothing was
/// taken in the meantime and is skipped, as is one whose row cannot be read.
///
/// When the write lock stays busy past the connection's busy timeout the
/// claim yields an empty batch rather than an error.
pub fn claim_due_reminders(
    conn: &mut Connection,
    worker_id: &str,
    now: &DateTime<Utc>,
    lease_until: &DateTime<Utc>,
    limit: usize,
) -> Result<Vec<ClaimedReminder>, DatabaseError> {
    match try_claim(conn, worker_id, now, lease_until, limit) {
        Err(e) if e.is_busy() => {
            tracing::debug!(worker_id, "Reminder queue busy, skipping claim");
            Ok(Vec::new())
        }
        other => other,
    }
}

fn try_claim(
    conn: &mut Connection,
    worker_id: &str,
    now: &DateTime<Utc>,
    lease_until: &DateTime<Utc>,
    limit: usize,
) -> Result<Vec<ClaimedReminder>, DatabaseError> {
    let now = format_timestamp(now);
    let lease_until = format_timestamp(lease_until);
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let candidates = {
        let mut stmt = tx.prepare(
            "SELECT id, prescription_drug_id, scheduled_at, status
             FROM reminder_schedule
             WHERE status IN ('pending', 'in_progress')
               AND scheduled_at GLOB '[0-9][0-9][0-9][0-9]-*'
               AND scheduled_at <= ?1
               AND (claimed_by IS NULL OR claim_expires_at IS NULL OR claim_expires_at <= ?1)
             ORDER BY scheduled_at ASC, id ASC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![now, limit], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;
        rows.collect::<Result<Vec<_>, _>>()?
    };

    let mut claimed = Vec::with_capacity(candidates.len());
    {
        let mut update = tx.prepare(
            "UPDATE reminder_schedule
             SET status = 'in_progress', claimed_by = ?2, claim_expires_at = ?3
             WHERE id = ?1
               AND status IN ('pending', 'in_progress')
               AND (claimed_by IS NULL OR claim_expires_at IS NULL OR claim_expires_at <= ?4)",
        )?;
        for (id, drug_id, scheduled_at, status) in candidates {
            // A row that cannot be decoded is left alone so it never blocks the rest.
            let claim = match claim_from_row(&id, &drug_id, &scheduled_at, &status) {
                Ok(claim) => claim,
                Err(e) => {
                    tracing::warn!(
                        reminder_id = %id,
                        error = %e,
                        "Skipping unreadable queue entry"
                    );
                    continue;
                }
            };
            if update.execute(params![id, worker_id, lease_until, now])? == 0 {
                continue;
            }
            claimed.push(claim);
        }
    }

    tx.commit()?;
    Ok(claimed)
}

fn claim_from_row(
    id: &str,
    drug_id: &str,
    scheduled_at: &str,
    status: &str,
) -> Result<ClaimedReminder, DatabaseError> {
    Ok(ClaimedReminder {
        id: parse_uuid("reminder_schedule.id", id)?,
        prescription_drug_id: parse_uuid("reminder_schedule.prescription_drug_id", drug_id)?,
        scheduled_at: parse_timestamp("reminder_schedule.scheduled_at", scheduled_at)?,
        previous_status: ReminderStatus::from_str(status)?,
    })
}

/// Outcome of moving one claimed entry to `sent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentTransition {
    Sent,
    /// Patient confirmed intake while the send was in flight; status stays `completed`.
    AlreadyCompleted,
}

/// `in_progress → sent` for an entry this worker still holds, clearing the lease.
///
/// Fails with `ConstraintViolation` when the lease was lost to another worker.
pub fn mark_reminder_sent(
    conn: &Connection,
    id: &Uuid,
    worker_id: &str,
) -> Result<SentTransition, DatabaseError> {
    let changed = conn.execute(
        "UPDATE reminder_schedule
         SET status = 'sent', claimed_by = NULL, claim_expires_at = NULL
         WHERE id = ?1 AND claimed_by = ?2 AND status = 'in_progress'",
        params![id.to_string(), worker_id],
    )?;
    if changed > 0 {
        return Ok(SentTransition::Sent);
    }

    match get_reminder_status(conn, id)? {
        Some(ReminderStatus::Completed) => Ok(SentTransition::AlreadyCompleted),
        Some(_) => Err(DatabaseError::ConstraintViolation(format!(
            "reminder {id} is no longer claimed by {worker_id}"
        ))),
        None => Err(DatabaseError::not_found("reminder_schedule", id)),
    }
}

/// Hand claims back after a failed tick: each entry this worker still holds
/// returns to its pre-claim status with the lease cleared.
pub fn release_claims(
    conn: &mut Connection,
    worker_id: &str,
    claims: &[ClaimedReminder],
) -> Result<usize, DatabaseError> {
    let tx = conn.transaction()?;
    let mut released = 0;
    {
        let mut stmt = tx.prepare(
            "UPDATE reminder_schedule
             SET status = ?3, claimed_by = NULL, claim_expires_at = NULL
             WHERE id = ?1 AND claimed_by = ?2 AND status = 'in_progress'",
        )?;
        for claim in claims {
            released += stmt.execute(params![
                claim.id.to_string(),
                worker_id,
                claim.previous_status.as_str(),
            ])?;
        }
    }
    tx.commit()?;
    Ok(released)
}

pub fn get_reminder_status(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<ReminderStatus>, DatabaseError> {
    let status = conn
        .query_row(
            "SELECT status FROM reminder_schedule WHERE id = ?1",
            params![id.to_string()],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    status.map(|s| ReminderStatus::from_str(&s)).transpose()
}

/// Current lease holder, if any (expired leases are still reported).
pub fn get_reminder_claim(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<(String, DateTime<Utc>)>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT claimed_by, claim_expires_at FROM reminder_schedule WHERE id = ?1",
            params![id.to_string()],
            |row| Ok((row.get::<_, Option<String>>(0)?, row.get::<_, Option<String>>(1)?)),
        )
        .optional()?;

    match row {
        Some((Some(worker), Some(expires))) => Ok(Some((
            worker,
            parse_timestamp("reminder_schedule.claim_expires_at", &expires)?,
        ))),
        _ => Ok(None),
    }
}
