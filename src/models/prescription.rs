use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrescriptionRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub general_notes: Option<String>,
    pub is_completed: bool,
    pub prescribed_on: DateTime<Utc>,
}

/// One drug line on a prescription; owns the reminders generated for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrescriptionDrug {
    pub id: Uuid,
    pub record_id: Uuid,
    pub drug_id: Uuid,
    pub dosage: String,
    pub frequency: String,
    pub duration_days: u32,
    pub drug_notes: Option<String>,
}

/// Drug line joined with the drug's display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrescriptionDrugView {
    pub id: Uuid,
    pub drug_id: Uuid,
    pub drug_name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration_days: u32,
    pub drug_notes: Option<String>,
}
