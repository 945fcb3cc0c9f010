//! Fixed-offset time math.
//!
//! A patient timezone is a constant number of minutes east of UTC. There is
//! no daylight-saving model: the same offset applies to every date.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use super::ScheduleError;

/// Practical bounds for a patient's offset (UTC-12:00 to UTC+14:00).
pub const MIN_PATIENT_OFFSET_MINUTES: i32 = -720;
pub const MAX_PATIENT_OFFSET_MINUTES: i32 = 840;

/// Largest magnitude expressible as `±HH:MM` with an hour below 24.
const MAX_OFFSET_MAGNITUDE: u32 = 24 * 60 - 1;

/// Build the chrono zone for a minute offset, failing on anything that is
/// not a valid `±HH:MM` zone instead of wrapping.
pub fn fixed_offset(offset_minutes: i32) -> Result<FixedOffset, ScheduleError> {
    if offset_minutes.unsigned_abs() > MAX_OFFSET_MAGNITUDE {
        return Err(ScheduleError::InvalidOffset(offset_minutes));
    }
    FixedOffset::east_opt(offset_minutes * 60).ok_or(ScheduleError::InvalidOffset(offset_minutes))
}

/// Check an offset against the patient-facing bounds. The generator itself
/// does not apply these; patient registration does.
pub fn validate_patient_offset(offset_minutes: i32) -> Result<i32, ScheduleError> {
    if (MIN_PATIENT_OFFSET_MINUTES..=MAX_PATIENT_OFFSET_MINUTES).contains(&offset_minutes) {
        Ok(offset_minutes)
    } else {
        Err(ScheduleError::InvalidOffset(offset_minutes))
    }
}

/// Render an offset as `±HH:MM`, e.g. `330` → `+05:30`, `-90` → `-01:30`.
pub fn format_offset(offset_minutes: i32) -> Result<String, ScheduleError> {
    fixed_offset(offset_minutes)?;
    let sign = if offset_minutes >= 0 { '+' } else { '-' };
    let magnitude = offset_minutes.unsigned_abs();
    Ok(format!("{sign}{:02}:{:02}", magnitude / 60, magnitude % 60))
}

/// Local wall-clock date and time in the given offset → UTC instant.
pub fn local_to_utc(
    offset_minutes: i32,
    date: NaiveDate,
    time: NaiveTime,
) -> Result<DateTime<Utc>, ScheduleError> {
    let zone = fixed_offset(offset_minutes)?;
    zone.from_local_datetime(&date.and_time(time))
        .single()
        .map(|local| local.with_timezone(&Utc))
        .ok_or(ScheduleError::DateOutOfRange)
}

/// UTC instant → local wall-clock date and time in the given offset.
pub fn utc_to_local(
    offset_minutes: i32,
    instant: DateTime<Utc>,
) -> Result<NaiveDateTime, ScheduleError> {
    let zone = fixed_offset(offset_minutes)?;
    Ok(instant.with_timezone(&zone).naive_local())
}

/// The patient's current local calendar date.
pub fn local_today(offset_minutes: i32, now: DateTime<Utc>) -> Result<NaiveDate, ScheduleError> {
    utc_to_local(offset_minutes, now).map(|local| local.date())
}
