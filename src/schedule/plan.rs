use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::ScheduleError;

/// Longest course a single plan may cover (ten years).
pub const MAX_DURATION_DAYS: u32 = 3_650;

/// Upper bound on reminder times in one day, i.e. one every half hour.
pub const MAX_TIMES_PER_DAY: usize = 48;

/// A patient-local time of day, minute precision, 24-hour clock.
///
/// Only the exact `HH:MM` shape parses: `8:00`, `08:00:00` and `24:00`
/// are all rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Result<Self, ScheduleError> {
        if hour > 23 || minute > 59 {
            return Err(ScheduleError::InvalidTimeOfDay(format!("{hour:02}:{minute:02}")));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// Seconds and sub-seconds are always zero.
    pub fn as_naive_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(u32::from(self.hour), u32::from(self.minute), 0)
            .unwrap_or(NaiveTime::MIN)
    }
}

impl FromStr for TimeOfDay {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ScheduleError::InvalidTimeOfDay(s.to_string());
        let bytes = s.as_bytes();
        if bytes.len() != 5 || bytes[2] != b':' {
            return Err(invalid());
        }
        let digits = [bytes[0], bytes[1], bytes[3], bytes[4]];
        if !digits.iter().all(u8::is_ascii_digit) {
            return Err(invalid());
        }
        let hour = (digits[0] - b'0') * 10 + (digits[1] - b'0');
        let minute = (digits[2] - b'0') * 10 + (digits[3] - b'0');
        Self::new(hour, minute).map_err(|_| invalid())
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ScheduleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Validated dosing plan for one prescribed drug.
///
/// Duplicate times are kept as given; each one yields its own reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DosingPlan {
    pub times: Vec<TimeOfDay>,
    /// Patient-local calendar date of the first day. `None` means "today"
    /// in the patient's offset at generation time.
    pub start_date: Option<NaiveDate>,
    pub duration_days: u32,
}

/// Reminder plan as submitted alongside a prescription item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderPlanInput {
    #[serde(default)]
    pub times: Vec<String>,
    #[serde(default, alias = "startDate")]
    pub start_date: Option<String>,
}

impl ReminderPlanInput {
    /// Validate every field up front so a malformed plan is never partially applied.
    pub fn parse(&self, duration_days: i64) -> Result<DosingPlan, ScheduleError> {
        let duration_days = validate_duration(duration_days)?;
        if self.times.len() > MAX_TIMES_PER_DAY {
            return Err(ScheduleError::TooManyTimes(self.times.len()));
        }
        let times = self
            .times
            .iter()
            .map(|raw| raw.parse::<TimeOfDay>())
            .collect::<Result<Vec<_>, _>>()?;
        let start_date = self.start_date.as_deref().map(parse_start_date).transpose()?;

        Ok(DosingPlan {
            times,
            start_date,
            duration_days,
        })
    }
}

/// `1..=MAX_DURATION_DAYS`.
pub fn validate_duration(duration_days: i64) -> Result<u32, ScheduleError> {
    match u32::try_from(duration_days) {
        Ok(days) if (1..=MAX_DURATION_DAYS).contains(&days) => Ok(days),
        _ => Err(ScheduleError::InvalidDuration(duration_days)),
    }
}

/// Strict `YYYY-MM-DD`.
pub fn parse_start_date(raw: &str) -> Result<NaiveDate, ScheduleError> {
    if raw.len() != 10 {
        return Err(ScheduleError::InvalidStartDate(raw.to_string()));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ScheduleError::InvalidStartDate(raw.to_string()))
}
