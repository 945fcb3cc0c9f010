use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};

use super::offset;
use super::plan::{DosingPlan, TimeOfDay, MAX_DURATION_DAYS, MAX_TIMES_PER_DAY};
use super::ScheduleError;

/// Years an instant may fall in. Outside this range the stored text is no
/// longer four-digit `YYYY-...` and stops sorting chronologically.
const STORABLE_YEARS: std::ops::RangeInclusive<i32> = 0..=9999;

/// Expand a dosing plan into ascending UTC instants, anchoring on "today"
/// in the patient's offset when no start date is given.
///
/// Callers that need deterministic output must pass `start_date` or use
/// [`generate_schedule_at`].
pub fn generate_schedule(
    offset_minutes: i32,
    duration_days: u32,
    times: &[TimeOfDay],
    start_date: Option<NaiveDate>,
) -> Result<Vec<DateTime<Utc>>, ScheduleError> {
    generate_schedule_at(offset_minutes, duration_days, times, start_date, Utc::now())
}

/// Same as [`generate_schedule`] with an explicit notion of "now".
///
/// Returns exactly `duration_days × times.len()` instants. An empty `times`
/// list yields an empty schedule whatever the other inputs are. Duplicate
/// times produce duplicate instants; ties stay adjacent in the output.
pub fn generate_schedule_at(
    offset_minutes: i32,
    duration_days: u32,
    times: &[TimeOfDay],
    start_date: Option<NaiveDate>,
    now: DateTime<Utc>,
) -> Result<Vec<DateTime<Utc>>, ScheduleError> {
    if times.is_empty() {
        return Ok(Vec::new());
    }
    if duration_days == 0 || duration_days > MAX_DURATION_DAYS {
        return Err(ScheduleError::InvalidDuration(i64::from(duration_days)));
    }
    if times.len() > MAX_TIMES_PER_DAY {
        return Err(ScheduleError::TooManyTimes(times.len()));
    }

    let anchor = match start_date {
        Some(date) => date,
        None => offset::local_today(offset_minutes, now)?,
    };

    let capacity = usize::try_from(duration_days)
        .ok()
        .and_then(|days| days.checked_mul(times.len()))
        .unwrap_or(0)
        .min(MAX_DURATION_DAYS as usize * MAX_TIMES_PER_DAY);
    let mut instants = Vec::with_capacity(capacity);
    for day_index in 0..duration_days {
        let day = anchor
            .checked_add_days(Days::new(u64::from(day_index)))
            .ok_or(ScheduleError::DateOutOfRange)?;
        for time in times {
            let instant = offset::local_to_utc(offset_minutes, day, time.as_naive_time())?;
            if !STORABLE_YEARS.contains(&instant.year()) {
                return Err(ScheduleError::DateOutOfRange);
            }
            instants.push(instant);
        }
    }

    // Times need not be given in order, and a negative offset can push late
    // local times past the next day's early ones.
    instants.sort();

    tracing::debug!(
        offset = %offset::format_offset(offset_minutes)?,
        %anchor,
        duration_days,
        count = instants.len(),
        "Generated reminder schedule"
    );

    Ok(instants)
}

impl DosingPlan {
    pub fn expand(&self, offset_minutes: i32) -> Result<Vec<DateTime<Utc>>, ScheduleError> {
        generate_schedule(offset_minutes, self.duration_days, &self.times, self.start_date)
    }

    pub fn expand_at(
        &self,
        offset_minutes: i32,
        now: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, ScheduleError> {
        generate_schedule_at(
            offset_minutes,
            self.duration_days,
            &self.times,
            self.start_date,
            now,
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn times(raw: &[&str]) -> Vec<TimeOfDay> {
        raw.iter().map(|t| t.parse().unwrap()).collect()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rfc3339(instants: &[DateTime<Utc>]) -> Vec<String> {
        instants
            .iter()
            .map(|i| i.format("%Y-%m-%dT%H:%M:%SZ").to_string())
            .collect()
    }

    #[test]
    fn twice_daily_in_india_for_two_days() {
        let out = generate_schedule(330, 2, &times(&["08:00", "20:00"]), Some(date(2024, 1, 1)))
            .unwrap();
        assert_eq!(
            rfc3339(&out),
            vec![
                "2024-01-01T02:30:00Z",
                "2024-01-01T14:30:00Z",
                "2024-01-02T02:30:00Z",
                "2024-01-02T14:30:00Z",
            ]
        );
    }

    #[test]
    fn count_is_days_times_entries() {
        for (days, entries) in [(1u32, 1usize), (3, 2), (14, 4), (30, 3)] {
            let plan: Vec<TimeOfDay> = (0..entries)
                .map(|i| TimeOfDay::new((6 + 4 * i) as u8, 0).unwrap())
                .collect();
            let out = generate_schedule(-300, days, &plan, Some(date(2024, 6, 1))).unwrap();
            assert_eq!(out.len(), days as usize * entries);
        }
    }

    #[test]
    fn empty_times_yield_empty_schedule() {
        assert!(generate_schedule(330, 10, &[], Some(date(2024, 1, 1))).unwrap().is_empty());
        // even for inputs that would otherwise be rejected
        assert!(generate_schedule(5000, 0, &[], None).unwrap().is_empty());
    }

    #[test]
    fn output_is_sorted_even_for_unsorted_times() {
        let out = generate_schedule(
            -600,
            3,
            &times(&["22:00", "06:00", "14:00"]),
            Some(date(2024, 12, 30)),
        )
        .unwrap();
        assert_eq!(out.len(), 9);
        assert!(out.windows(2).all(|w| w[0] <= w[1]));
        // spans the year boundary
        assert_eq!(rfc3339(&out).last().unwrap(), "2025-01-02T08:00:00Z");
    }

    #[test]
    fn duplicate_times_are_kept() {
        let out = generate_schedule(0, 2, &times(&["09:00", "09:00"]), Some(date(2024, 1, 1)))
            .unwrap();
        assert_eq!(
            rfc3339(&out),
            vec![
                "2024-01-01T09:00:00Z",
                "2024-01-01T09:00:00Z",
                "2024-01-02T09:00:00Z",
                "2024-01-02T09:00:00Z",
            ]
        );
    }

    #[test]
    fn missing_start_date_anchors_on_patient_today() {
        // 22:00 UTC on Mar 1 is Mar 2 local for UTC+3
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 22, 0, 0).unwrap();
        let out = generate_schedule_at(180, 1, &times(&["08:00"]), None, now).unwrap();
        assert_eq!(rfc3339(&out), vec!["2024-03-02T05:00:00Z"]);
    }

    #[test]
    fn instants_have_zero_seconds() {
        let now = Utc.with_ymd_and_hms(2024, 5, 5, 10, 17, 42).unwrap();
        let out = generate_schedule_at(45, 2, &times(&["12:34"]), None, now).unwrap();
        assert!(out.iter().all(|i| i.timestamp() % 60 == 0));
        assert!(out.iter().all(|i| i.timestamp_subsec_nanos() == 0));
    }

    #[test]
    fn zero_duration_is_rejected() {
        assert_eq!(
            generate_schedule(0, 0, &times(&["08:00"]), Some(date(2024, 1, 1))),
            Err(ScheduleError::InvalidDuration(0))
        );
    }

    #[test]
    fn oversized_plans_are_rejected_before_allocating() {
        let eight = vec![TimeOfDay::new(8, 0).unwrap(); 8];
        assert_eq!(
            generate_schedule(0, u32::MAX, &eight, Some(date(2024, 1, 1))),
            Err(ScheduleError::InvalidDuration(i64::from(u32::MAX)))
        );
        assert_eq!(
            generate_schedule(0, MAX_DURATION_DAYS + 1, &eight, Some(date(2024, 1, 1))),
            Err(ScheduleError::InvalidDuration(i64::from(MAX_DURATION_DAYS) + 1))
        );

        let crowded = vec![TimeOfDay::new(8, 0).unwrap(); MAX_TIMES_PER_DAY + 1];
        assert_eq!(
            generate_schedule(0, 1, &crowded, Some(date(2024, 1, 1))),
            Err(ScheduleError::TooManyTimes(MAX_TIMES_PER_DAY + 1))
        );

        let longest = generate_schedule(0, MAX_DURATION_DAYS, &eight[..1], Some(date(2024, 1, 1)))
            .unwrap();
        assert_eq!(longest.len(), MAX_DURATION_DAYS as usize);
    }

    #[test]
    fn instants_past_year_9999_are_rejected() {
        assert_eq!(
            generate_schedule(0, 2, &times(&["08:00"]), Some(date(9999, 12, 31))),
            Err(ScheduleError::DateOutOfRange)
        );
        // the last day still fits
        let out = generate_schedule(0, 1, &times(&["08:00"]), Some(date(9999, 12, 31))).unwrap();
        assert_eq!(rfc3339(&out), vec!["9999-12-31T08:00:00Z"]);
    }

    #[test]
    fn instants_before_year_0_are_rejected() {
        // 02:00 at +05:00 on 0000-01-01 is still the previous year in UTC
        assert_eq!(
            generate_schedule(300, 1, &times(&["02:00"]), Some(date(0, 1, 1))),
            Err(ScheduleError::DateOutOfRange)
        );
    }

    #[test]
    fn malformed_offset_is_rejected() {
        assert_eq!(
            generate_schedule(1440, 1, &times(&["08:00"]), Some(date(2024, 1, 1))),
            Err(ScheduleError::InvalidOffset(1440))
        );
    }

    #[test]
    fn dosing_plan_expand_matches_free_function() {
        let plan = DosingPlan {
            times: times(&["08:00", "20:00"]),
            start_date: Some(date(2024, 1, 1)),
            duration_days: 2,
        };
        assert_eq!(
            plan.expand(330).unwrap(),
            generate_schedule(330, 2, &plan.times, plan.start_date).unwrap()
        );
    }
}
