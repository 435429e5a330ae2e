//! Odontogram record, entry and revision database operations.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{classify, enum_from_sql, ts_from_sql, ts_to_sql, Database, DbError, DbResult};
use crate::models::{ChartType, OdontogramEntry, OdontogramRecord, OdontogramRevision};

const RECORD_COLUMNS: &str =
    "id, response_set_id, patient_id, chart_type, notes, created_at, updated_at";

impl Database {
    pub fn get_odontogram_for_response_set(
        &self,
        response_set_id: &str,
    ) -> DbResult<Option<OdontogramRecord>> {
        get_odontogram_for_response_set(&self.conn, response_set_id)
    }

    /// The patient's most recently saved chart, entries sorted by tooth.
    pub fn latest_odontogram_for_patient(&self, patient_id: &str) -> DbResult<Option<OdontogramRecord>> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM odontogram_records
                     WHERE patient_id = ?
                     ORDER BY updated_at DESC, rowid DESC
                     LIMIT 1",
                    RECORD_COLUMNS
                ),
                [patient_id],
                read_record_row,
            )
            .optional()?;

        row.map(|row| with_entries(&self.conn, row)).transpose()
    }

    /// Snapshots of replaced entry sets, oldest first.
    pub fn list_revisions(&self, odontogram_id: &str) -> DbResult<Vec<OdontogramRevision>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, odontogram_id, version, digest, entries, replaced_by_id, created_at
            FROM odontogram_revisions
            WHERE odontogram_id = ?
            ORDER BY version ASC
            "#,
        )?;
        let rows = stmt.query_map([odontogram_id], |row| {
            Ok(RevisionRow {
                id: row.get(0)?,
                odontogram_id: row.get(1)?,
                version: row.get(2)?,
                digest: row.get(3)?,
                entries: row.get(4)?,
                replaced_by_id: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?;

        let mut revisions = Vec::new();
        for row in rows {
            revisions.push(row?.try_into()?);
        }
        Ok(revisions)
    }
}

pub(crate) fn get_odontogram_for_response_set(
    conn: &Connection,
    response_set_id: &str,
) -> DbResult<Option<OdontogramRecord>> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {} FROM odontogram_records WHERE response_set_id = ?",
                RECORD_COLUMNS
            ),
            [response_set_id],
            read_record_row,
        )
        .optional()?;

    row.map(|row| with_entries(conn, row)).transpose()
}

fn with_entries(conn: &Connection, row: RecordRow) -> DbResult<OdontogramRecord> {
    let mut record: OdontogramRecord = row.try_into()?;
    record.entries = list_entries(conn, &record.id)?;
    Ok(record)
}

/// Insert the record row only; entries go through [`insert_entries`].
pub(crate) fn insert_odontogram(conn: &Connection, record: &OdontogramRecord) -> DbResult<()> {
    conn.execute(
        r#"
        INSERT INTO odontogram_records (
            id, response_set_id, patient_id, chart_type, notes, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            record.id,
            record.response_set_id,
            record.patient_id,
            record.chart_type.as_str(),
            record.notes,
            ts_to_sql(&record.created_at),
            ts_to_sql(&record.updated_at),
        ],
    )
    .map_err(classify)?;
    Ok(())
}

/// Set the chart type and, when given, the notes.
pub(crate) fn update_odontogram(
    conn: &Connection,
    id: &str,
    chart_type: ChartType,
    notes: Option<&str>,
    updated_at: &DateTime<Utc>,
) -> DbResult<()> {
    let rows_affected = conn
        .execute(
            r#"
            UPDATE odontogram_records SET
                chart_type = ?2,
                notes = COALESCE(?3, notes),
                updated_at = ?4
            WHERE id = ?1
            "#,
            params![id, chart_type.as_str(), notes, ts_to_sql(updated_at)],
        )
        .map_err(classify)?;
    if rows_affected == 0 {
        return Err(DbError::NotFound(format!("odontogram {}", id)));
    }
    Ok(())
}

pub(crate) fn list_entries(conn: &Connection, odontogram_id: &str) -> DbResult<Vec<OdontogramEntry>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id, odontogram_id, tooth_number, region, annotations, status, author_id, created_at
        FROM odontogram_entries
        WHERE odontogram_id = ?
        ORDER BY tooth_number ASC, rowid ASC
        "#,
    )?;
    let rows = stmt.query_map([odontogram_id], |row| {
        Ok(EntryRow {
            id: row.get(0)?,
            odontogram_id: row.get(1)?,
            tooth_number: row.get(2)?,
            region: row.get(3)?,
            annotations: row.get(4)?,
            status: row.get(5)?,
            author_id: row.get(6)?,
            created_at: row.get(7)?,
        })
    })?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?.try_into()?);
    }
    Ok(entries)
}

/// Remove every entry of the chart, returning how many went.
pub(crate) fn delete_entries(conn: &Connection, odontogram_id: &str) -> DbResult<usize> {
    Ok(conn.execute(
        "DELETE FROM odontogram_entries WHERE odontogram_id = ?",
        [odontogram_id],
    )?)
}

pub(crate) fn insert_entries(conn: &Connection, entries: &[OdontogramEntry]) -> DbResult<()> {
    let mut stmt = conn.prepare(
        r#"
        INSERT INTO odontogram_entries (
            id, odontogram_id, tooth_number, region, annotations, status, author_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )?;
    for entry in entries {
        stmt.execute(params![
            entry.id,
            entry.odontogram_id,
            entry.tooth_number,
            entry.region,
            entry.annotations,
            entry.status.as_str(),
            entry.author_id,
            ts_to_sql(&entry.created_at),
        ])
        .map_err(classify)?;
    }
    Ok(())
}

pub(crate) fn insert_revision(conn: &Connection, revision: &OdontogramRevision) -> DbResult<()> {
    let entries = serde_json::to_string(&revision.entries)?;
    conn.execute(
        r#"
        INSERT INTO odontogram_revisions (
            id, odontogram_id, version, digest, entries, replaced_by_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            revision.id,
            revision.odontogram_id,
            revision.version,
            revision.digest,
            entries,
            revision.replaced_by_id,
            ts_to_sql(&revision.created_at),
        ],
    )
    .map_err(classify)?;
    Ok(())
}

/// Intermediate row struct for database mapping.
struct RecordRow {
    id: String,
    response_set_id: String,
    patient_id: String,
    chart_type: String,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

fn read_record_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecordRow> {
    Ok(RecordRow {
        id: row.get(0)?,
        response_set_id: row.get(1)?,
        patient_id: row.get(2)?,
        chart_type: row.get(3)?,
        notes: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

impl TryFrom<RecordRow> for OdontogramRecord {
    type Error = DbError;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        Ok(OdontogramRecord {
            id: row.id,
            response_set_id: row.response_set_id,
            patient_id: row.patient_id,
            chart_type: enum_from_sql(&row.chart_type)?,
            notes: row.notes,
            created_at: ts_from_sql(&row.created_at)?,
            updated_at: ts_from_sql(&row.updated_at)?,
            entries: Vec::new(),
        })
    }
}

struct EntryRow {
    id: String,
    odontogram_id: String,
    tooth_number: String,
    region: Option<String>,
    annotations: Option<String>,
    status: String,
    author_id: String,
    created_at: String,
}

impl TryFrom<EntryRow> for OdontogramEntry {
    type Error = DbError;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        Ok(OdontogramEntry {
            id: row.id,
            odontogram_id: row.odontogram_id,
            tooth_number: row.tooth_number,
            region: row.region,
            annotations: row.annotations,
            status: enum_from_sql(&row.status)?,
            author_id: row.author_id,
            created_at: ts_from_sql(&row.created_at)?,
        })
    }
}

struct RevisionRow {
    id: String,
    odontogram_id: String,
    version: i64,
    digest: String,
    entries: String,
    replaced_by_id: String,
    created_at: String,
}

impl TryFrom<RevisionRow> for OdontogramRevision {
    type Error = DbError;

    fn try_from(row: RevisionRow) -> Result<Self, Self::Error> {
        Ok(OdontogramRevision {
            id: row.id,
            odontogram_id: row.odontogram_id,
            version: row.version,
            digest: row.digest,
            entries: serde_json::from_str(&row.entries)?,
            replaced_by_id: row.replaced_by_id,
            created_at: ts_from_sql(&row.created_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::insert_response_set;
    use crate::db::templates::insert_template;
    use crate::models::{
        new_id, timestamp_now, AnamnesisResponseSet, AnamnesisTemplate, Patient, PaymentStatus,
        ResponseStatus, ToothStatus, User, UserRole,
    };
    use chrono::Duration;

    struct Fixture {
        db: Database,
        patient: Patient,
        user: User,
        template: AnamnesisTemplate,
    }

    fn setup() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let user = User::new("Dra. Ana".into(), "ana@clinic.test".into(), UserRole::Provider);
        db.insert_user(&user).unwrap();
        let patient = Patient::new("Maria".into(), "Lima".into());
        db.insert_patient(&patient).unwrap();
        let now = timestamp_now();
        let template = AnamnesisTemplate {
            id: new_id(),
            name: "Odontograma".into(),
            description: None,
            category: None,
            is_default: false,
            created_at: now,
            updated_at: now,
            questions: Vec::new(),
        };
        insert_template(db.conn(), &template).unwrap();
        Fixture { db, patient, user, template }
    }

    fn chart(f: &Fixture, updated_at: DateTime<Utc>) -> OdontogramRecord {
        let set = AnamnesisResponseSet {
            id: new_id(),
            template_id: f.template.id.clone(),
            patient_id: f.patient.id.clone(),
            appointment_id: None,
            filled_by_id: f.user.id.clone(),
            payment_status: PaymentStatus::Unpaid,
            amount_due: None,
            amount_paid: None,
            notes: None,
            status: ResponseStatus::Open,
            version: 1,
            filled_at: updated_at,
            updated_at,
        };
        insert_response_set(f.db.conn(), &set).unwrap();
        let record = OdontogramRecord {
            id: new_id(),
            response_set_id: set.id,
            patient_id: f.patient.id.clone(),
            chart_type: ChartType::Permanent,
            notes: Some("raio-x pendente".into()),
            created_at: updated_at,
            updated_at,
            entries: Vec::new(),
        };
        insert_odontogram(f.db.conn(), &record).unwrap();
        record
    }

    fn entry(f: &Fixture, record: &OdontogramRecord, tooth: &str, status: ToothStatus) -> OdontogramEntry {
        OdontogramEntry {
            id: new_id(),
            odontogram_id: record.id.clone(),
            tooth_number: tooth.into(),
            region: None,
            annotations: None,
            status,
            author_id: f.user.id.clone(),
            created_at: timestamp_now(),
        }
    }

    #[test]
    fn test_entries_sorted_by_tooth() {
        let f = setup();
        let record = chart(&f, timestamp_now());
        let entries = vec![
            entry(&f, &record, "36", ToothStatus::Open),
            entry(&f, &record, "11", ToothStatus::Completed),
            entry(&f, &record, "21", ToothStatus::Note),
        ];
        insert_entries(f.db.conn(), &entries).unwrap();

        let loaded = f.db.get_odontogram_for_response_set(&record.response_set_id).unwrap().unwrap();
        let teeth: Vec<&str> = loaded.entries.iter().map(|e| e.tooth_number.as_str()).collect();
        assert_eq!(teeth, vec!["11", "21", "36"]);

        assert_eq!(delete_entries(f.db.conn(), &record.id).unwrap(), 3);
        assert!(list_entries(f.db.conn(), &record.id).unwrap().is_empty());
    }

    #[test]
    fn test_update_keeps_notes_when_absent() {
        let f = setup();
        let record = chart(&f, timestamp_now());
        update_odontogram(f.db.conn(), &record.id, ChartType::Deciduous, None, &timestamp_now()).unwrap();

        let loaded = f.db.get_odontogram_for_response_set(&record.response_set_id).unwrap().unwrap();
        assert_eq!(loaded.chart_type, ChartType::Deciduous);
        assert_eq!(loaded.notes.as_deref(), Some("raio-x pendente"));

        let err = update_odontogram(f.db.conn(), "nope", ChartType::Permanent, None, &timestamp_now())
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
    }

    #[test]
    fn test_latest_for_patient() {
        let f = setup();
        let now = timestamp_now();
        let older = chart(&f, now - Duration::days(3));
        let newer = chart(&f, now);
        insert_entries(f.db.conn(), &[entry(&f, &newer, "11", ToothStatus::Open)]).unwrap();

        let latest = f.db.latest_odontogram_for_patient(&f.patient.id).unwrap().unwrap();
        assert_eq!(latest.id, newer.id);
        assert_ne!(latest.id, older.id);
        assert_eq!(latest.entries.len(), 1);
        assert!(f.db.latest_odontogram_for_patient("nobody").unwrap().is_none());
    }

    #[test]
    fn test_one_record_per_response_set() {
        let f = setup();
        let record = chart(&f, timestamp_now());
        let mut twin = record.clone();
        twin.id = new_id();
        let err = insert_odontogram(f.db.conn(), &twin).unwrap_err();
        assert!(matches!(err, DbError::Duplicate(ref column) if column == "odontogram_records.response_set_id"));
    }

    #[test]
    fn test_revisions_round_trip() {
        let f = setup();
        let record = chart(&f, timestamp_now());
        let revision = OdontogramRevision {
            id: new_id(),
            odontogram_id: record.id.clone(),
            version: 1,
            digest: "00".repeat(32),
            entries: vec![entry(&f, &record, "11", ToothStatus::Open)],
            replaced_by_id: f.user.id.clone(),
            created_at: timestamp_now(),
        };
        insert_revision(f.db.conn(), &revision).unwrap();
        assert_eq!(f.db.list_revisions(&record.id).unwrap(), vec![revision.clone()]);

        let mut again = revision;
        again.id = new_id();
        assert!(matches!(
            insert_revision(f.db.conn(), &again).unwrap_err(),
            DbError::Duplicate(_)
        ));
    }
}
