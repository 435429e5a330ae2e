//! Everything shown on one patient's page.

use serde::Serialize;
use tracing::debug;

use crate::db::{AppointmentListing, Database, DbResult, ResponseSetSummary};
use crate::models::{Attachment, FinancialTransaction, OdontogramRecord, Patient};

/// How many appointments the page lists.
pub const RECENT_APPOINTMENTS: usize = 10;

/// How many transactions the page lists.
pub const RECENT_TRANSACTIONS: usize = 6;

/// A patient with the records that hang off it, each list newest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientDetail {
    pub patient: Patient,
    /// Most recent by start time, with provider names
    pub appointments: Vec<AppointmentListing>,
    pub attachments: Vec<Attachment>,
    /// Most recent by creation time
    pub transactions: Vec<FinancialTransaction>,
    /// All response sets, with template names
    pub response_sets: Vec<ResponseSetSummary>,
    /// The chart saved most recently across all response sets
    pub odontogram: Option<OdontogramRecord>,
}

impl PatientDetail {
    /// `Ok(None)` when the patient does not exist.
    pub fn load(db: &Database, patient_id: &str) -> DbResult<Option<Self>> {
        let Some(patient) = db.get_patient(patient_id)? else {
            debug!(patient_id, "Patient not found");
            return Ok(None);
        };

        Ok(Some(Self {
            appointments: db.recent_appointments_for_patient(patient_id, RECENT_APPOINTMENTS)?,
            attachments: db.list_attachments_for_patient(patient_id)?,
            transactions: db.recent_transactions_for_patient(patient_id, RECENT_TRANSACTIONS)?,
            response_sets: db.list_response_sets_for_patient(patient_id)?,
            odontogram: db.latest_odontogram_for_patient(patient_id)?,
            patient,
        }))
    }
}
