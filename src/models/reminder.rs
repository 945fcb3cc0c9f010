use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{AttemptResult, DeliveryChannel, ReminderStatus};

/// One scheduled delivery moment in the reminder queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderSchedule {
    pub id: Uuid,
    pub prescription_drug_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub status: ReminderStatus,
    pub intake_confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A queue entry this worker holds a live lease on for the current tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedReminder {
    pub id: Uuid,
    pub prescription_drug_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    /// Status before the claim moved it to `in_progress`; restored on release.
    pub previous_status: ReminderStatus,
}

/// Append-only record of one delivery try.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderAttempt {
    pub id: Uuid,
    pub schedule_id: Uuid,
    pub channel: DeliveryChannel,
    pub result: AttemptResult,
    pub attempted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleFilter {
    pub prescription_drug_id: Option<Uuid>,
    pub status: Option<ReminderStatus>,
}
