//! Dosing-plan expansion.
//!
//! Turns a list of patient-local times of day, a duration in days and a
//! fixed UTC offset into the ordered UTC instants at which reminders fire.
//! Everything in here is pure: no I/O, and the wall clock is only read
//! when no start date is supplied.

pub mod generator;
pub mod offset;
pub mod plan;

pub use generator::{generate_schedule, generate_schedule_at};
pub use plan::{DosingPlan, ReminderPlanInput, TimeOfDay, MAX_DURATION_DAYS, MAX_TIMES_PER_DAY};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Invalid timezone offset: {0} minutes")]
    InvalidOffset(i32),

    #[error("Invalid time of day '{0}', expected HH:MM (24-hour)")]
    InvalidTimeOfDay(String),

    #[error("Invalid start date '{0}', expected YYYY-MM-DD")]
    InvalidStartDate(String),

    #[error("Duration must be between 1 and {max} days, got {0}", max = plan::MAX_DURATION_DAYS)]
    InvalidDuration(i64),

    #[error("At most {max} reminder times per day, got {0}", max = plan::MAX_TIMES_PER_DAY)]
    TooManyTimes(usize),

    #[error("Schedule falls outside years 0000 to 9999")]
    DateOutOfRange,
}
