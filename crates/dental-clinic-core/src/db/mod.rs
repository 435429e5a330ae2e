//! Database layer for the dental clinic.
//!
//! Read and write helpers that must also run inside the response engine's
//! transaction are free functions over `&Connection`; the `Database`
//! methods wrap them for standalone use.

mod appointments;
mod attachments;
mod finance;
mod inventory;
mod odontogram;
mod patients;
mod responses;
mod schema;
mod tasks;
mod templates;
mod users;

pub use appointments::AppointmentListing;
pub use inventory::InventoryRecord;
pub use patients::{GenderCount, PatientSearch, StatusCount};
pub use responses::{ResponseSetSummary, UnpaidResponse};
pub use schema::*;
pub use templates::AppendOutcome;

pub(crate) use odontogram::{
    delete_entries, get_odontogram_for_response_set, insert_entries, insert_odontogram,
    insert_revision, update_odontogram,
};
pub(crate) use appointments::appointment_belongs_to;
pub(crate) use patients::patient_exists;
pub(crate) use responses::{
    get_response_set, insert_answers, insert_response_set, touch_response_set,
};
pub(crate) use templates::{get_template, template_exists};
pub(crate) use users::user_exists;

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, TransactionBehavior};
use thiserror::Error;

use crate::models::UnknownVariant;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// A unique index rejected the write; holds the `table.column` it guards.
    #[error("Duplicate value for {0}")]
    Duplicate(String),

    #[error("Stored value is unreadable: {0}")]
    Corrupt(String),
}

impl From<UnknownVariant> for DbError {
    fn from(e: UnknownVariant) -> Self {
        DbError::Corrupt(e.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.busy_timeout(BUSY_TIMEOUT)?;
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` inside a write-locking transaction. Commits on `Ok`, rolls
    /// back on `Err`.
    pub fn immediate_transaction<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<DbError>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(DbError::from)?;
        let value = f(&tx)?;
        tx.commit().map_err(DbError::from)?;
        Ok(value)
    }
}

/// Sort-stable text form: RFC 3339, milliseconds, `Z` suffix.
pub(crate) fn ts_to_sql(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn ts_from_sql(text: &str) -> DbResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| DbError::Corrupt(format!("timestamp {:?}: {}", text, e)))
}

pub(crate) fn opt_ts_from_sql(text: Option<String>) -> DbResult<Option<DateTime<Utc>>> {
    text.as_deref().map(ts_from_sql).transpose()
}

pub(crate) fn date_to_sql(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn opt_date_from_sql(text: Option<String>) -> DbResult<Option<NaiveDate>> {
    text.map(|t| {
        NaiveDate::parse_from_str(&t, "%Y-%m-%d")
            .map_err(|e| DbError::Corrupt(format!("date {:?}: {}", t, e)))
    })
    .transpose()
}

pub(crate) fn enum_from_sql<T>(text: &str) -> DbResult<T>
where
    T: FromStr<Err = UnknownVariant>,
{
    Ok(text.parse()?)
}

/// Translate constraint failures into the matching `DbError` variant.
pub(crate) fn classify(err: rusqlite::Error) -> DbError {
    if let rusqlite::Error::SqliteFailure(failure, message) = &err {
        let message = message.clone().unwrap_or_default();
        if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE {
            let column = message
                .strip_prefix("UNIQUE constraint failed: ")
                .unwrap_or(&message)
                .to_string();
            return DbError::Duplicate(column);
        }
        if failure.code == rusqlite::ErrorCode::ConstraintViolation {
            return DbError::Constraint(message);
        }
    }
    DbError::Sqlite(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_schema_initialized() {
        let db = Database::open_in_memory().unwrap();

        let tables: Vec<String> = db
            .conn()
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        for table in [
            "users",
            "patients",
            "appointments",
            "financial_transactions",
            "anamnesis_templates",
            "anamnesis_questions",
            "anamnesis_response_sets",
            "anamnesis_answers",
            "odontogram_records",
            "odontogram_entries",
            "odontogram_revisions",
            "attachments",
            "tasks",
            "implant_items",
            "surgery_items",
            "restorative_items",
        ] {
            assert!(tables.contains(&table.to_string()), "missing table {}", table);
        }
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let db = Database::open_in_memory().unwrap();
        let enabled: i64 = db
            .conn()
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn test_timestamp_text_round_trip() {
        let ts = DateTime::parse_from_rfc3339("2026-03-02T09:30:00.250-03:00")
            .unwrap()
            .with_timezone(&Utc);
        let text = ts_to_sql(&ts);
        assert_eq!(text, "2026-03-02T12:30:00.250Z");
        assert_eq!(ts_from_sql(&text).unwrap(), ts);
        assert!(matches!(ts_from_sql("yesterday"), Err(DbError::Corrupt(_))));
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let mut db = Database::open_in_memory().unwrap();
        let result: DbResult<()> = db.immediate_transaction(|conn| {
            conn.execute(
                "INSERT INTO surgery_items (id, name, quantity, created_at, updated_at)
                 VALUES ('s1', 'Gaze', 1, '2026-01-01T00:00:00.000Z', '2026-01-01T00:00:00.000Z')",
                [],
            )?;
            Err(DbError::NotFound("forced".into()))
        });
        assert!(result.is_err());

        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM surgery_items", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
