//! One pass of the delivery loop.
//!
//! 1. Claim: lease up to `batch_size` due entries (short write transaction).
//! 2. Send: hand each claimed entry to the sender, oldest first.
//! 3. Finalize: one transaction marks every entry `sent` and appends its attempt.
//!
//! If finalize fails, nothing from step 3 is kept and the claims from step 1
//! are released back to their previous status, so the whole tick leaves no trace
//! except the deliveries themselves.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;
use uuid::Uuid;

use super::sender::ReminderSender;
use super::WorkerError;
use crate::config::WorkerConfig;
use crate::db::{self, DatabaseError, SentTransition};
use crate::models::enums::AttemptResult;
use crate::models::{ClaimedReminder, ReminderAttempt};

/// Counters for a single tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub claimed: usize,
    pub sent: usize,
    /// Confirmed by the patient while the send was in flight.
    pub already_completed: usize,
    /// Attempts recorded as `failure` or `no_response`.
    pub failed_attempts: usize,
}

pub struct DeliveryWorker {
    config: WorkerConfig,
    sender: Arc<dyn ReminderSender>,
}

impl DeliveryWorker {
    pub fn new(config: WorkerConfig, sender: Arc<dyn ReminderSender>) -> Self {
        Self { config, sender }
    }

    pub fn worker_id(&self) -> &str {
        &self.config.worker_id
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Run one claim → send → finalize pass as of `now`.
    pub fn run_tick(
        &self,
        conn: &mut Connection,
        now: DateTime<Utc>,
    ) -> Result<TickReport, WorkerError> {
        let worker_id = self.worker_id();
        let lease_until = now + self.config.lease_duration();

        let claims =
            db::claim_due_reminders(conn, worker_id, &now, &lease_until, self.config.batch_size)?;
        if claims.is_empty() {
            return Ok(TickReport::default());
        }
        tracing::debug!(worker_id, claimed = claims.len(), "Claimed due reminders");

        let outcomes: Vec<(&ClaimedReminder, AttemptResult)> =
            claims.iter().map(|claim| (claim, self.deliver(claim))).collect();

        match self.finalize(conn, &outcomes, now) {
            Ok(report) => Ok(report),
            Err(e) => {
                match db::release_claims(conn, worker_id, &claims) {
                    Ok(released) => {
                        tracing::warn!(worker_id, released, error = %e, "Tick rolled back");
                    }
                    Err(release_err) => {
                        tracing::error!(
                            worker_id,
                            error = %e,
                            release_error = %release_err,
                            "Tick rolled back, claims stay leased until expiry"
                        );
                    }
                }
                Err(e)
            }
        }
    }

    fn deliver(&self, claim: &ClaimedReminder) -> AttemptResult {
        match self.sender.send(claim) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(schedule_id = %claim.id, error = %e, "Reminder delivery failed");
                AttemptResult::Failure
            }
        }
    }

    fn finalize(
        &self,
        conn: &mut Connection,
        outcomes: &[(&ClaimedReminder, AttemptResult)],
        now: DateTime<Utc>,
    ) -> Result<TickReport, WorkerError> {
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(DatabaseError::from)?;
        let channel = self.sender.channel();
        let mut report = TickReport {
            claimed: outcomes.len(),
            ..TickReport::default()
        };

        for (claim, result) in outcomes {
            match db::mark_reminder_sent(&tx, &claim.id, self.worker_id()) {
                Ok(SentTransition::Sent) => report.sent += 1,
                Ok(SentTransition::AlreadyCompleted) => report.already_completed += 1,
                Err(DatabaseError::ConstraintViolation(_)) => {
                    return Err(WorkerError::ClaimLost(claim.id));
                }
                Err(e) => return Err(e.into()),
            }

            db::insert_attempt(&tx, &ReminderAttempt {
                id: Uuid::new_v4(),
                schedule_id: claim.id,
                channel,
                result: *result,
                attempted_at: now,
            })?;

            if matches!(result, AttemptResult::Failure | AttemptResult::NoResponse) {
                report.failed_attempts += 1;
            }
        }

        tx.commit().map_err(DatabaseError::from)?;
        Ok(report)
    }
}
