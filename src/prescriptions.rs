//! Prescription intake: patients, drugs, and the prescription-creation
//! unit of work that expands each drug's dosing plan into the reminder queue.
//!
//! Creation validates the whole payload first, then writes the record, its
//! drug lines and every generated reminder inside one transaction. Nothing is
//! visible unless all of it commits.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::db::{self, DatabaseError};
use crate::models::{Drug, Patient, PrescriptionDrug, PrescriptionDrugView, PrescriptionRecord};
use crate::schedule::offset::validate_patient_offset;
use crate::schedule::plan::validate_duration;
use crate::schedule::{DosingPlan, ReminderPlanInput, ScheduleError};

#[derive(Error, Debug)]
pub enum PrescriptionError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error("Patient not found: {0}")]
    PatientNotFound(Uuid),

    #[error("Drug not found: {0}")]
    DrugNotFound(Uuid),

    #[error("Prescription not found: {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

// ═══════════════════════════════════════════
// Input types
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct NewPatient {
    pub full_name: String,
    /// Minutes east of UTC.
    #[serde(default)]
    pub timezone_offset: i32,
}

/// Partial patient update: absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientUpdate {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub timezone_offset: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewDrug {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPrescription {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    #[serde(default)]
    pub general_notes: Option<String>,
    #[serde(default)]
    pub is_completed: bool,
    pub drugs: Vec<NewPrescriptionDrug>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPrescriptionDrug {
    pub drug_id: Uuid,
    pub dosage: String,
    pub frequency: String,
    pub duration_days: i64,
    #[serde(default)]
    pub drug_notes: Option<String>,
    /// Absent or empty `times` means this line gets no reminders.
    #[serde(default)]
    pub reminder_plan: Option<ReminderPlanInput>,
}

// ═══════════════════════════════════════════
// Output types
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct PrescriptionDetail {
    #[serde(flatten)]
    pub record: PrescriptionRecord,
    pub drugs: Vec<PrescriptionDrugView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedPrescription {
    #[serde(flatten)]
    pub prescription: PrescriptionDetail,
    pub reminders_scheduled: usize,
}

// ═══════════════════════════════════════════
// Patients & drugs
// ═══════════════════════════════════════════

pub fn register_patient(
    conn: &Connection,
    input: &NewPatient,
    now: DateTime<Utc>,
) -> Result<Patient, PrescriptionError> {
    let full_name = required("full_name", &input.full_name)?;
    let timezone_offset = validate_patient_offset(input.timezone_offset)?;

    let patient = Patient {
        id: Uuid::new_v4(),
        full_name,
        timezone_offset,
        created_at: now,
    };
    db::insert_patient(conn, &patient)?;
    tracing::info!(patient_id = %patient.id, timezone_offset, "Patient registered");
    Ok(patient)
}

pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Patient, PrescriptionError> {
    db::get_patient(conn, id)?.ok_or(PrescriptionError::PatientNotFound(*id))
}

/// Alphabetical by name.
pub fn list_patients(conn: &Connection) -> Result<Vec<Patient>, PrescriptionError> {
    Ok(db::list_patients(conn)?)
}

/// Apply a partial update.
///
/// A new timezone offset only affects plans expanded afterwards; reminders
/// already in the queue keep the instants they were generated with.
pub fn update_patient(
    conn: &Connection,
    id: &Uuid,
    update: &PatientUpdate,
) -> Result<Patient, PrescriptionError> {
    let full_name = update
        .full_name
        .as_deref()
        .map(|name| required("full_name", name))
        .transpose()?;
    let timezone_offset = update
        .timezone_offset
        .map(validate_patient_offset)
        .transpose()?;

    if !db::update_patient(conn, id, full_name.as_deref(), timezone_offset)? {
        return Err(PrescriptionError::PatientNotFound(*id));
    }
    tracing::info!(patient_id = %id, ?timezone_offset, "Patient updated");
    get_patient(conn, id)
}

pub fn register_drug(
    conn: &Connection,
    input: &NewDrug,
    now: DateTime<Utc>,
) -> Result<Drug, PrescriptionError> {
    let drug = Drug {
        id: Uuid::new_v4(),
        name: required("name", &input.name)?,
        created_at: now,
    };
    db::insert_drug(conn, &drug)?;
    Ok(drug)
}

pub fn list_drugs(conn: &Connection) -> Result<Vec<Drug>, PrescriptionError> {
    Ok(db::list_drugs(conn)?)
}

pub fn rename_drug(
    conn: &Connection,
    id: &Uuid,
    input: &NewDrug,
) -> Result<Drug, PrescriptionError> {
    let name = required("name", &input.name)?;
    if !db::rename_drug(conn, id, &name)? {
        return Err(PrescriptionError::DrugNotFound(*id));
    }
    db::get_drug(conn, id)?.ok_or(PrescriptionError::DrugNotFound(*id))
}

/// Fails with a constraint violation while any prescription line names the drug.
pub fn delete_drug(conn: &Connection, id: &Uuid) -> Result<(), PrescriptionError> {
    if !db::delete_drug(conn, id)? {
        return Err(PrescriptionError::DrugNotFound(*id));
    }
    tracing::info!(drug_id = %id, "Drug deleted");
    Ok(())
}

// ═══════════════════════════════════════════
// Prescriptions
// ═══════════════════════════════════════════

/// A drug line that passed validation, with its parsed plan.
struct ValidatedLine<'a> {
    input: &'a NewPrescriptionDrug,
    duration_days: u32,
    plan: Option<DosingPlan>,
}

fn validate_lines(input: &NewPrescription) -> Result<Vec<ValidatedLine<'_>>, PrescriptionError> {
    if input.drugs.is_empty() {
        return Err(PrescriptionError::Validation(
            "prescription must list at least one drug".into(),
        ));
    }

    input
        .drugs
        .iter()
        .map(|line| {
            required("dosage", &line.dosage)?;
            required("frequency", &line.frequency)?;
            let duration_days = validate_duration(line.duration_days)?;
            let plan = line
                .reminder_plan
                .as_ref()
                .map(|plan| plan.parse(line.duration_days))
                .transpose()?;
            Ok(ValidatedLine {
                input: line,
                duration_days,
                plan,
            })
        })
        .collect()
}

/// Create a prescription with its drug lines and enqueue every reminder.
///
/// `now` stamps the record and anchors plans that carry no start date.
pub fn create_prescription(
    conn: &mut Connection,
    input: &NewPrescription,
    now: DateTime<Utc>,
) -> Result<CreatedPrescription, PrescriptionError> {
    let lines = validate_lines(input)?;

    let tx = conn.transaction().map_err(DatabaseError::from)?;

    let offset = db::get_patient_timezone_offset(&tx, &input.patient_id)?
        .ok_or(PrescriptionError::PatientNotFound(input.patient_id))?;

    let record = PrescriptionRecord {
        id: Uuid::new_v4(),
        patient_id: input.patient_id,
        doctor_id: input.doctor_id,
        general_notes: input.general_notes.clone(),
        is_completed: input.is_completed,
        prescribed_on: now,
    };
    db::insert_prescription_record(&tx, &record)?;

    let mut reminders_scheduled = 0;
    for line in &lines {
        if !db::drug_exists(&tx, &line.input.drug_id)? {
            return Err(PrescriptionError::DrugNotFound(line.input.drug_id));
        }

        let item = PrescriptionDrug {
            id: Uuid::new_v4(),
            record_id: record.id,
            drug_id: line.input.drug_id,
            dosage: line.input.dosage.trim().to_string(),
            frequency: line.input.frequency.trim().to_string(),
            duration_days: line.duration_days,
            drug_notes: line.input.drug_notes.clone(),
        };
        db::insert_prescription_drug(&tx, &item)?;

        if let Some(plan) = &line.plan {
            let instants = plan.expand_at(offset, now)?;
            reminders_scheduled += db::enqueue_reminders(&tx, &item.id, &instants, &now)?;
        }
    }

    let drugs = db::get_prescription_drug_views(&tx, &record.id)?;
    tx.commit().map_err(DatabaseError::from)?;

    tracing::info!(
        prescription_id = %record.id,
        patient_id = %record.patient_id,
        drug_lines = drugs.len(),
        reminders_scheduled,
        "Prescription created"
    );

    Ok(CreatedPrescription {
        prescription: PrescriptionDetail { record, drugs },
        reminders_scheduled,
    })
}

pub fn get_prescription(
    conn: &Connection,
    id: &Uuid,
) -> Result<PrescriptionDetail, PrescriptionError> {
    let record = db::get_prescription_record(conn, id)?.ok_or(PrescriptionError::NotFound(*id))?;
    let drugs = db::get_prescription_drug_views(conn, id)?;
    Ok(PrescriptionDetail { record, drugs })
}

/// Newest first.
pub fn list_prescriptions(
    conn: &Connection,
    patient_id: Option<&Uuid>,
) -> Result<Vec<PrescriptionRecord>, PrescriptionError> {
    Ok(db::list_prescription_records(conn, patient_id)?)
}

/// Marks the prescription done. Its queued reminders are left as they are.
pub fn complete_prescription(
    conn: &Connection,
    id: &Uuid,
) -> Result<PrescriptionRecord, PrescriptionError> {
    if !db::mark_prescription_completed(conn, id)? {
        return Err(PrescriptionError::NotFound(*id));
    }
    db::get_prescription_record(conn, id)?.ok_or(PrescriptionError::NotFound(*id))
}

fn required(field: &str, value: &str) -> Result<String, PrescriptionError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PrescriptionError::Validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}
