//! Saving a response set's tooth chart.

use rusqlite::Connection;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::{ensure_actor, ensure_patient, EngineError, EngineResult};
use crate::db::{self, Database};
use crate::models::{
    new_id, timestamp_now, Actor, AnamnesisResponseSet, OdontogramEntry, OdontogramRecord,
    OdontogramRevision, PaymentStatus,
};
use crate::validation::{OdontogramSave, SaveTarget};

/// What a successful save wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOutcome {
    pub response_set_id: String,
    pub odontogram_id: String,
    /// Response set version after the save
    pub version: i64,
    pub entry_count: usize,
}

/// Create or update a response set and replace its chart entries.
///
/// All steps share one transaction:
///
/// 1. Update the existing response set (checking `expected_version` when
///    given) or create one for the template.
/// 2. Create the chart if the set has none, otherwise update its chart
///    type and notes.
/// 3. Snapshot the current entries into the revision log.
/// 4. Delete every entry, then insert the submitted ones authored by `actor`.
///
/// Any failure rolls back every step.
pub fn save_response(db: &mut Database, actor: &Actor, save: OdontogramSave) -> EngineResult<SaveOutcome> {
    let outcome = db.immediate_transaction(|conn| save_in_transaction(conn, actor, &save))?;
    info!(
        response_set_id = %outcome.response_set_id,
        version = outcome.version,
        entries = outcome.entry_count,
        "Saved odontogram"
    );
    Ok(outcome)
}

fn save_in_transaction(conn: &Connection, actor: &Actor, save: &OdontogramSave) -> EngineResult<SaveOutcome> {
    ensure_actor(conn, actor)?;
    ensure_patient(conn, &save.patient_id)?;

    let now = timestamp_now();
    let (response_set_id, version) = match &save.target {
        SaveTarget::Existing {
            response_set_id,
            expected_version,
        } => {
            // A set owned by another patient is reported as missing
            let set = db::get_response_set(conn, response_set_id)?
                .filter(|set| set.patient_id == save.patient_id)
                .ok_or_else(|| EngineError::NotFound(format!("response set {}", response_set_id)))?;

            if let Some(expected) = *expected_version {
                if expected != set.version {
                    return Err(EngineError::VersionConflict {
                        response_set_id: set.id,
                        expected,
                        actual: set.version,
                    });
                }
            }

            let version = db::touch_response_set(conn, &set.id, save.status, save.notes.as_deref(), &now)?;
            (set.id, version)
        }
        SaveTarget::New { template_id } => {
            if !db::template_exists(conn, template_id)? {
                return Err(EngineError::NotFound(format!("template {}", template_id)));
            }
            let set = AnamnesisResponseSet {
                id: new_id(),
                template_id: template_id.clone(),
                patient_id: save.patient_id.clone(),
                appointment_id: None,
                filled_by_id: actor.user_id.clone(),
                payment_status: PaymentStatus::default(),
                amount_due: None,
                amount_paid: None,
                notes: save.notes.clone(),
                status: save.status,
                version: 1,
                filled_at: now,
                updated_at: now,
            };
            db::insert_response_set(conn, &set)?;
            debug!(response_set_id = %set.id, "Created response set");
            (set.id, set.version)
        }
    };

    let odontogram_id = match db::get_odontogram_for_response_set(conn, &response_set_id)? {
        Some(record) => {
            if !record.entries.is_empty() {
                let revision = snapshot(&record, version - 1, actor)?;
                db::insert_revision(conn, &revision)?;
            }
            db::update_odontogram(conn, &record.id, save.chart_type, save.notes.as_deref(), &now)?;
            record.id
        }
        None => {
            let record = OdontogramRecord {
                id: new_id(),
                response_set_id: response_set_id.clone(),
                patient_id: save.patient_id.clone(),
                chart_type: save.chart_type,
                notes: save.notes.clone(),
                created_at: now,
                updated_at: now,
                entries: Vec::new(),
            };
            db::insert_odontogram(conn, &record)?;
            record.id
        }
    };

    let removed = db::delete_entries(conn, &odontogram_id)?;
    let entries: Vec<OdontogramEntry> = save
        .entries
        .iter()
        .map(|entry| OdontogramEntry {
            id: new_id(),
            odontogram_id: odontogram_id.clone(),
            tooth_number: entry.tooth_number.clone(),
            region: entry.region.clone(),
            annotations: entry.annotations.clone(),
            status: entry.status,
            author_id: actor.user_id.clone(),
            created_at: now,
        })
        .collect();
    db::insert_entries(conn, &entries)?;
    debug!(odontogram_id = %odontogram_id, removed, inserted = entries.len(), "Replaced chart entries");

    Ok(SaveOutcome {
        response_set_id,
        odontogram_id,
        version,
        entry_count: entries.len(),
    })
}

fn snapshot(record: &OdontogramRecord, version: i64, actor: &Actor) -> EngineResult<OdontogramRevision> {
    Ok(OdontogramRevision {
        id: new_id(),
        odontogram_id: record.id.clone(),
        version,
        digest: entries_digest(&record.entries)?,
        entries: record.entries.clone(),
        replaced_by_id: actor.user_id.clone(),
        created_at: timestamp_now(),
    })
}

/// Hex SHA-256 of the entries' JSON form.
pub fn entries_digest(entries: &[OdontogramEntry]) -> EngineResult<String> {
    let json = serde_json::to_vec(entries)?;
    let mut hasher = Sha256::new();
    hasher.update(&json);
    Ok(hex::encode(hasher.finalize()))
}
