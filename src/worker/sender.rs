use thiserror::Error;

use crate::models::enums::{AttemptResult, DeliveryChannel};
use crate::models::ClaimedReminder;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    #[error("Channel unavailable: {0}")]
    Unavailable(String),

    #[error("Message rejected: {0}")]
    Rejected(String),
}

/// Delivers one reminder over a single channel.
///
/// Implementations may be invoked more than once for the same entry (a
/// crash between send and commit re-delivers on a later tick), so they
/// should tolerate repeats. An `Err` is recorded as a `failure` attempt and
/// never fails the tick.
pub trait ReminderSender: Send + Sync {
    fn channel(&self) -> DeliveryChannel;

    fn send(&self, reminder: &ClaimedReminder) -> Result<AttemptResult, SendError>;
}

/// Default sender: writes the delivery to the log and reports success.
#[derive(Debug, Clone, Copy)]
pub struct LoggingSender {
    channel: DeliveryChannel,
}

impl LoggingSender {
    pub fn new(channel: DeliveryChannel) -> Self {
        Self { channel }
    }
}

impl ReminderSender for LoggingSender {
    fn channel(&self) -> DeliveryChannel {
        self.channel
    }

    fn send(&self, reminder: &ClaimedReminder) -> Result<AttemptResult, SendError> {
        tracing::info!(
            schedule_id = %reminder.id,
            prescription_drug_id = %reminder.prescription_drug_id,
            scheduled_at = %reminder.scheduled_at,
            channel = %self.channel,
            "Sending reminder"
        );
        Ok(AttemptResult::Success)
    }
}
