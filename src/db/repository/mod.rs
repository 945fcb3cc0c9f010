//! Repository layer, entity-scoped database operations.
//!
//! Every function takes a borrowed connection (or a transaction, which derefs
//! to one) so callers decide the transaction boundaries.

mod attempt;
mod drug;
mod patient;
mod prescription;
mod reminder;

pub use attempt::*;
pub use drug::*;
pub use patient::*;
pub use prescription::*;
pub use reminder::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::{open_database, open_memory_database};
    use crate::db::DatabaseError;
    use crate::models::enums::*;
    use crate::models::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rusqlite::Connection;
    use uuid::Uuid;

    fn test_db() -> Connection {
        open_memory_database().unwrap()
    }

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, 0).unwrap()
    }

    /// Patient, drug, prescription and one drug line. Returns the drug line id.
    fn seed_drug_line(conn: &Connection) -> Uuid {
        let created = at(0, 0);
        let patient_id = Uuid::new_v4();
        insert_patient(conn, &Patient {
            id: patient_id,
            full_name: "Amina Rao".into(),
            timezone_offset: 330,
            created_at: created,
        }).unwrap();

        let drug_id = Uuid::new_v4();
        insert_drug(conn, &Drug {
            id: drug_id,
            name: format!("Amoxicillin-{drug_id}"),
            created_at: created,
        }).unwrap();

        let record_id = Uuid::new_v4();
        insert_prescription_record(conn, &PrescriptionRecord {
            id: record_id,
            patient_id,
            doctor_id: Uuid::new_v4(),
            general_notes: None,
            is_completed: false,
            prescribed_on: created,
        }).unwrap();

        let item_id = Uuid::new_v4();
        insert_prescription_drug(conn, &PrescriptionDrug {
            id: item_id,
            record_id,
            drug_id,
            dosage: "500mg".into(),
            frequency: "twice daily".into(),
            duration_days: 3,
            drug_notes: Some("after food".into()),
        }).unwrap();
        item_id
    }

    fn all_reminders(conn: &Connection) -> Vec<ReminderSchedule> {
        list_reminders(conn, &ScheduleFilter::default()).unwrap()
    }

    // ═══════════════════════════════════════════════════════════
    // Patients, drugs, prescriptions
    // ═══════════════════════════════════════════════════════════

    #[test]
    fn patient_insert_and_offset_lookup() {
        let conn = test_db();
        let id = Uuid::new_v4();
        insert_patient(&conn, &Patient {
            id,
            full_name: "Kofi Mensah".into(),
            timezone_offset: -300,
            created_at: at(8, 0),
        }).unwrap();

        let patient = get_patient(&conn, &id).unwrap().unwrap();
        assert_eq!(patient.full_name, "Kofi Mensah");
        assert_eq!(get_patient_timezone_offset(&conn, &id).unwrap(), Some(-300));
        assert_eq!(get_patient_timezone_offset(&conn, &Uuid::new_v4()).unwrap(), None);
    }

    #[test]
    fn patient_offset_outside_range_rejected() {
        let conn = test_db();
        let err = insert_patient(&conn, &Patient {
            id: Uuid::new_v4(),
            full_name: "Out of range".into(),
            timezone_offset: 900,
            created_at: at(8, 0),
        }).unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));
    }

    #[test]
    fn drug_names_are_unique_and_listed_alphabetically() {
        let conn = test_db();
        for name in ["Paracetamol", "Ibuprofen"] {
            insert_drug(&conn, &Drug {
                id: Uuid::new_v4(),
                name: name.into(),
                created_at: at(0, 0),
            }).unwrap();
        }
        let dup = insert_drug(&conn, &Drug {
            id: Uuid::new_v4(),
            name: "Ibuprofen".into(),
            created_at: at(0, 0),
        });
        assert!(matches!(dup, Err(DatabaseError::ConstraintViolation(_))));

        let names: Vec<String> = list_drugs(&conn).unwrap().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["Ibuprofen", "Paracetamol"]);
    }

    #[test]
    fn prescription_views_and_completion() {
        let conn = test_db();
        let item_id = seed_drug_line(&conn);
        let records = list_prescription_records(&conn, None).unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert!(!record.is_completed);

        let views = get_prescription_drug_views(&conn, &record.id).unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].id, item_id);
        assert!(views[0].drug_name.starts_with("Amoxicillin"));

        assert!(mark_prescription_completed(&conn, &record.id).unwrap());
        assert!(get_prescription_record(&conn, &record.id).unwrap().unwrap().is_completed);
        assert!(!mark_prescription_completed(&conn, &Uuid::new_v4()).unwrap());
    }

    #[test]
    fn prescription_list_filters_by_patient() {
        let conn = test_db();
        seed_drug_line(&conn);
        seed_drug_line(&conn);
        let all = list_prescription_records(&conn, None).unwrap();
        assert_eq!(all.len(), 2);

        let mine = list_prescription_records(&conn, Some(&all[0].patient_id)).unwrap();
        assert_eq!(mine.len(), 1);
        assert!(list_prescription_records(&conn, Some(&Uuid::new_v4())).unwrap().is_empty());
    }

    // ═══════════════════════════════════════════════════════════
    // Reminder queue
    // ═══════════════════════════════════════════════════════════

    #[test]
    fn enqueue_creates_pending_entries_in_order() {
        let conn = test_db();
        let item = seed_drug_line(&conn);
        let instants = [at(14, 30), at(2, 30), at(2, 30)];
        let count = enqueue_reminders(&conn, &item, &instants, &at(0, 0)).unwrap();
        assert_eq!(count, 3);

        let entries = all_reminders(&conn);
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.status == ReminderStatus::Pending));
        assert!(entries.iter().all(|e| e.intake_confirmed_at.is_none()));
        assert_eq!(entries[0].scheduled_at, at(2, 30));
        assert_eq!(entries[2].scheduled_at, at(14, 30));
    }

    #[test]
    fn enqueue_for_missing_drug_line_fails() {
        let conn = test_db();
        let err = enqueue_reminders(&conn, &Uuid::new_v4(), &[at(1, 0)], &at(0, 0)).unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));
    }

    #[test]
    fn list_filters_by_status_and_drug_line() {
        let mut conn = test_db();
        let a = seed_drug_line(&conn);
        let b = seed_drug_line(&conn);
        enqueue_reminders(&conn, &a, &[at(1, 0), at(5, 0)], &at(0, 0)).unwrap();
        enqueue_reminders(&conn, &b, &[at(2, 0)], &at(0, 0)).unwrap();
        claim_due_reminders(&mut conn, "w1", &at(1, 30), &at(1, 31), 10).unwrap();

        let only_a = list_reminders(&conn, &ScheduleFilter {
            prescription_drug_id: Some(a),
            status: None,
        }).unwrap();
        assert_eq!(only_a.len(), 2);

        let pending = list_reminders(&conn, &ScheduleFilter {
            prescription_drug_id: None,
            status: Some(ReminderStatus::Pending),
        }).unwrap();
        assert_eq!(pending.len(), 2);
        assert!(pending.iter().all(|e| e.status == ReminderStatus::Pending));
    }

    #[test]
    fn confirm_is_idempotent() {
        let conn = test_db();
        let item = seed_drug_line(&conn);
        enqueue_reminders(&conn, &item, &[at(2, 30)], &at(0, 0)).unwrap();
        let id = all_reminders(&conn)[0].id;

        let first = confirm_reminder(&conn, &id, &at(2, 45)).unwrap().unwrap();
        assert_eq!(first.status, ReminderStatus::Completed);
        assert_eq!(first.intake_confirmed_at, Some(at(2, 45)));

        assert!(confirm_reminder(&conn, &id, &at(3, 0)).unwrap().is_none());
        let stored = get_reminder(&conn, &id).unwrap().unwrap();
        assert_eq!(stored.intake_confirmed_at, Some(at(2, 45)));
        assert!(confirm_reminder(&conn, &Uuid::new_v4(), &at(3, 0)).unwrap().is_none());
    }

    #[test]
    fn claim_takes_only_due_entries_up_to_limit() {
        let mut conn = test_db();
        let item = seed_drug_line(&conn);
        let instants = [at(1, 0), at(2, 0), at(3, 0), at(9, 0)];
        enqueue_reminders(&conn, &item, &instants, &at(0, 0)).unwrap();

        let claimed = claim_due_reminders(&mut conn, "w1", &at(4, 0), &at(4, 1), 2).unwrap();
        assert_eq!(claimed.len(), 2);
        assert_eq!(claimed[0].scheduled_at, at(1, 0));
        assert_eq!(claimed[1].scheduled_at, at(2, 0));
        assert!(claimed.iter().all(|c| c.previous_status == ReminderStatus::Pending));

        let status = get_reminder_status(&conn, &claimed[0].id).unwrap();
        assert_eq!(status, Some(ReminderStatus::InProgress));
        let (holder, expires) = get_reminder_claim(&conn, &claimed[0].id).unwrap().unwrap();
        assert_eq!(holder, "w1");
        assert_eq!(expires, at(4, 1));

        // The 03:00 entry is still free, the 09:00 one is not due yet
        let rest = claim_due_reminders(&mut conn, "w2", &at(4, 0), &at(4, 1), 10).unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].scheduled_at, at(3, 0));
    }

    #[test]
    fn malformed_rows_do_not_block_the_queue() {
        let mut conn = test_db();
        let item = seed_drug_line(&conn);
        enqueue_reminders(&conn, &item, &[at(8, 0)], &at(0, 0)).unwrap();
        // Expanded-year text sorts ahead of every real instant
        conn.execute(
            "INSERT INTO reminder_schedule (id, prescription_drug_id, scheduled_at, status, created_at)
             VALUES (?1, ?2, '+10000-01-01T08:00:00.000Z', 'pending', '2024-01-01T00:00:00.000Z')",
            rusqlite::params![Uuid::new_v4().to_string(), item.to_string()],
        )
        .unwrap();
        // Sorts like a due instant but does not parse
        conn.execute(
            "INSERT INTO reminder_schedule (id, prescription_drug_id, scheduled_at, status, created_at)
             VALUES (?1, ?2, '2024-01-01T07:99:00.000Z', 'pending', '2024-01-01T00:00:00.000Z')",
            rusqlite::params![Uuid::new_v4().to_string(), item.to_string()],
        )
        .unwrap();

        for _ in 0..2 {
            let claimed = claim_due_reminders(&mut conn, "w1", &at(12, 0), &at(12, 1), 10).unwrap();
            if claimed.is_empty() {
                break;
            }
            assert_eq!(claimed.len(), 1);
            assert_eq!(claimed[0].scheduled_at, at(8, 0));
            mark_reminder_sent(&conn, &claimed[0].id, "w1").unwrap();
        }

        let pending: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM reminder_schedule
                 WHERE status = 'pending' AND claimed_by IS NULL",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(pending, 2, "unreadable rows stay untouched");
    }

    #[test]
    fn live_lease_is_skipped_and_expired_lease_reclaimed() {
        let mut conn = test_db();
        let item = seed_drug_line(&conn);
        enqueue_reminders(&conn, &item, &[at(1, 0)], &at(0, 0)).unwrap();

        let first = claim_due_reminders(&mut conn, "w1", &at(2, 0), &at(2, 1), 10).unwrap();
        assert_eq!(first.len(), 1);

        let blocked = claim_due_reminders(&mut conn, "w2", &at(2, 0), &at(2, 1), 10).unwrap();
        assert!(blocked.is_empty());

        let reclaimed = claim_due_reminders(&mut conn, "w2", &at(2, 5), &at(2, 6), 10).unwrap();
        assert_eq!(reclaimed.len(), 1);
        assert_eq!(reclaimed[0].previous_status, ReminderStatus::InProgress);

        // The original holder lost its lease
        let lost = mark_reminder_sent(&conn, &first[0].id, "w1").unwrap_err();
        assert!(matches!(lost, DatabaseError::ConstraintViolation(_)));
        assert_eq!(mark_reminder_sent(&conn, &first[0].id, "w2").unwrap(), SentTransition::Sent);
    }

    #[test]
    fn sent_and_completed_entries_are_never_claimed() {
        let mut conn = test_db();
        let item = seed_drug_line(&conn);
        enqueue_reminders(&conn, &item, &[at(1, 0), at(1, 30)], &at(0, 0)).unwrap();
        let entries = all_reminders(&conn);
        confirm_reminder(&conn, &entries[1].id, &at(1, 40)).unwrap();

        let claimed = claim_due_reminders(&mut conn, "w1", &at(2, 0), &at(2, 1), 10).unwrap();
        assert_eq!(claimed.len(), 1);
        mark_reminder_sent(&conn, &claimed[0].id, "w1").unwrap();

        let again = claim_due_reminders(&mut conn, "w1", &at(3, 0), &at(3, 1), 10).unwrap();
        assert!(again.is_empty());
        assert!(get_reminder_claim(&conn, &claimed[0].id).unwrap().is_none());
    }

    #[test]
    fn confirmation_during_send_wins() {
        let mut conn = test_db();
        let item = seed_drug_line(&conn);
        enqueue_reminders(&conn, &item, &[at(1, 0)], &at(0, 0)).unwrap();
        let claimed = claim_due_reminders(&mut conn, "w1", &at(2, 0), &at(2, 1), 10).unwrap();

        confirm_reminder(&conn, &claimed[0].id, &at(2, 0)).unwrap().unwrap();
        let outcome = mark_reminder_sent(&conn, &claimed[0].id, "w1").unwrap();
        assert_eq!(outcome, SentTransition::AlreadyCompleted);
        assert_eq!(
            get_reminder_status(&conn, &claimed[0].id).unwrap(),
            Some(ReminderStatus::Completed)
        );
    }

    #[test]
    fn release_restores_previous_status() {
        let mut conn = test_db();
        let item = seed_drug_line(&conn);
        enqueue_reminders(&conn, &item, &[at(1, 0), at(1, 10)], &at(0, 0)).unwrap();
        let claimed = claim_due_reminders(&mut conn, "w1", &at(2, 0), &at(2, 1), 10).unwrap();
        assert_eq!(claimed.len(), 2);

        // Someone else's claim is left alone
        let released = release_claims(&mut conn, "w2", &claimed).unwrap();
        assert_eq!(released, 0);

        let released = release_claims(&mut conn, "w1", &claimed).unwrap();
        assert_eq!(released, 2);
        for entry in all_reminders(&conn) {
            assert_eq!(entry.status, ReminderStatus::Pending);
            assert!(get_reminder_claim(&conn, &entry.id).unwrap().is_none());
        }
    }

    #[test]
    fn concurrent_workers_claim_disjoint_batches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.db");
        {
            let conn = open_database(&path).unwrap();
            let item = seed_drug_line(&conn);
            let instants: Vec<_> = (0..40).map(|i| at(0, 0) + Duration::minutes(i)).collect();
            enqueue_reminders(&conn, &item, &instants, &at(0, 0)).unwrap();
        }

        let now = at(1, 0);
        let lease = now + Duration::minutes(1);
        let batches: Vec<Vec<ClaimedReminder>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|n| {
                    let path = path.clone();
                    scope.spawn(move || {
                        let mut conn = open_database(&path).unwrap();
                        claim_due_reminders(&mut conn, &format!("w{n}"), &now, &lease, 15).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let mut ids: Vec<Uuid> = batches.iter().flatten().map(|c| c.id).collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total, "an entry was claimed twice");
        assert!(total <= 40);
    }

    // ═══════════════════════════════════════════════════════════
    // Attempts
    // ═══════════════════════════════════════════════════════════

    #[test]
    fn attempts_append_and_filter() {
        let conn = test_db();
        let item = seed_drug_line(&conn);
        enqueue_reminders(&conn, &item, &[at(1, 0), at(2, 0)], &at(0, 0)).unwrap();
        let entries = all_reminders(&conn);

        for (entry, minute, result) in [
            (&entries[0], 5, AttemptResult::Success),
            (&entries[0], 1, AttemptResult::Failure),
            (&entries[1], 3, AttemptResult::NoResponse),
        ] {
            insert_attempt(&conn, &ReminderAttempt {
                id: Uuid::new_v4(),
                schedule_id: entry.id,
                channel: DeliveryChannel::Whatsapp,
                result,
                attempted_at: at(2, minute),
            }).unwrap();
        }

        let first = list_attempts(&conn, Some(&entries[0].id)).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].result, AttemptResult::Failure);
        assert_eq!(first[1].result, AttemptResult::Success);
        assert_eq!(list_attempts(&conn, None).unwrap().len(), 3);
    }

    #[test]
    fn attempt_for_unknown_schedule_rejected() {
        let conn = test_db();
        let err = insert_attempt(&conn, &ReminderAttempt {
            id: Uuid::new_v4(),
            schedule_id: Uuid::new_v4(),
            channel: DeliveryChannel::Gsm,
            result: AttemptResult::Read,
            attempted_at: at(1, 0),
        }).unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));
    }
}
