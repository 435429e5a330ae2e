//! Patient database operations.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use super::{
    classify, date_to_sql, enum_from_sql, opt_date_from_sql, ts_from_sql, ts_to_sql, Database,
    DbError, DbResult,
};
use crate::models::{Gender, Patient, PatientStatus};

const PATIENT_COLUMNS: &str = "id, first_name, last_name, full_name, email, phone, birth_date, \
     gender, status, document_number, notes, address, created_at, updated_at";

/// Filters for the patient list.
#[derive(Debug, Clone, Default)]
pub struct PatientSearch {
    /// Case-insensitive substring of full name, email or phone
    pub query: Option<String>,
    pub status: Option<PatientStatus>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenderCount {
    pub gender: Gender,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: PatientStatus,
    pub count: i64,
}

impl Database {
    /// Insert a new patient. A taken email yields `DbError::Duplicate`.
    pub fn insert_patient(&self, patient: &Patient) -> DbResult<()> {
        let address = patient.address.as_ref().map(serde_json::to_string).transpose()?;
        self.conn
            .execute(
                r#"
                INSERT INTO patients (
                    id, first_name, last_name, full_name, email, phone, birth_date,
                    gender, status, document_number, notes, address, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                "#,
                params![
                    patient.id,
                    patient.first_name,
                    patient.last_name,
                    patient.full_name,
                    patient.email,
                    patient.phone,
                    patient.birth_date.as_ref().map(date_to_sql),
                    patient.gender.as_str(),
                    patient.status.as_str(),
                    patient.document_number,
                    patient.notes,
                    address,
                    ts_to_sql(&patient.created_at),
                    ts_to_sql(&patient.updated_at),
                ],
            )
            .map_err(classify)?;
        Ok(())
    }

    /// Update an existing patient.
    pub fn update_patient(&self, patient: &Patient) -> DbResult<bool> {
        let address = patient.address.as_ref().map(serde_json::to_string).transpose()?;
        let rows_affected = self
            .conn
            .execute(
                r#"
                UPDATE patients SET
                    first_name = ?2,
                    last_name = ?3,
                    full_name = ?4,
                    email = ?5,
                    phone = ?6,
                    birth_date = ?7,
                    gender = ?8,
                    status = ?9,
                    document_number = ?10,
                    notes = ?11,
                    address = ?12,
                    updated_at = ?13
                WHERE id = ?1
                "#,
                params![
                    patient.id,
                    patient.first_name,
                    patient.last_name,
                    patient.full_name,
                    patient.email,
                    patient.phone,
                    patient.birth_date.as_ref().map(date_to_sql),
                    patient.gender.as_str(),
                    patient.status.as_str(),
                    patient.document_number,
                    patient.notes,
                    address,
                    ts_to_sql(&patient.updated_at),
                ],
            )
            .map_err(classify)?;
        Ok(rows_affected > 0)
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, id: &str) -> DbResult<Option<Patient>> {
        get_patient(&self.conn, id)
    }

    /// Whether another patient already uses `email` (ignoring case).
    pub fn patient_email_taken(&self, email: &str, except_id: Option<&str>) -> DbResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM patients WHERE email = ?1 COLLATE NOCASE AND id IS NOT ?2",
                params![email, except_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Search patients, newest first.
    pub fn search_patients(&self, search: &PatientSearch) -> DbResult<Vec<Patient>> {
        let pattern = search
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{}%", escape_like(q)));
        let limit = search.limit.map(|l| l as i64).unwrap_or(-1);

        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {}
            FROM patients
            WHERE (?1 IS NULL
                   OR full_name LIKE ?1 ESCAPE '\'
                   OR email LIKE ?1 ESCAPE '\'
                   OR phone LIKE ?1 ESCAPE '\')
              AND (?2 IS NULL OR status = ?2)
            ORDER BY created_at DESC
            LIMIT ?3
            "#,
            PATIENT_COLUMNS
        ))?;

        let rows = stmt.query_map(
            params![pattern, search.status.map(|s| s.as_str()), limit],
            read_patient_row,
        )?;

        let mut patients = Vec::new();
        for row in rows {
            patients.push(row?.try_into()?);
        }
        Ok(patients)
    }

    /// Delete a patient and everything that cascades from it.
    pub fn delete_patient(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM patients WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    pub fn count_patients(&self) -> DbResult<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?)
    }

    pub fn count_patients_by_gender(&self) -> DbResult<Vec<GenderCount>> {
        let mut stmt = self
            .conn
            .prepare("SELECT gender, COUNT(*) FROM patients GROUP BY gender ORDER BY gender")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;

        let mut counts = Vec::new();
        for row in rows {
            let (gender, count) = row?;
            counts.push(GenderCount {
                gender: enum_from_sql(&gender)?,
                count,
            });
        }
        Ok(counts)
    }

    pub fn count_patients_by_status(&self) -> DbResult<Vec<StatusCount>> {
        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM patients GROUP BY status ORDER BY status")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;

        let mut counts = Vec::new();
        for row in rows {
            let (status, count) = row?;
            counts.push(StatusCount {
                status: enum_from_sql(&status)?,
                count,
            });
        }
        Ok(counts)
    }

    /// Every patient's birth date; `None` where unknown.
    pub fn list_birth_dates(&self) -> DbResult<Vec<Option<NaiveDate>>> {
        let mut stmt = self.conn.prepare("SELECT birth_date FROM patients")?;
        let rows = stmt.query_map([], |row| row.get::<_, Option<String>>(0))?;

        let mut dates = Vec::new();
        for row in rows {
            dates.push(opt_date_from_sql(row?)?);
        }
        Ok(dates)
    }
}

pub(crate) fn get_patient(conn: &Connection, id: &str) -> DbResult<Option<Patient>> {
    conn.query_row(
        &format!("SELECT {} FROM patients WHERE id = ?", PATIENT_COLUMNS),
        [id],
        read_patient_row,
    )
    .optional()?
    .map(|row| row.try_into())
    .transpose()
}

pub(crate) fn patient_exists(conn: &Connection, id: &str) -> DbResult<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM patients WHERE id = ?", [id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

/// Escape LIKE wildcards so user input matches literally.
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Intermediate row struct for database mapping.
struct PatientRow {
    id: String,
    first_name: String,
    last_name: String,
    full_name: String,
    email: Option<String>,
    phone: Option<String>,
    birth_date: Option<String>,
    gender: String,
    status: String,
    document_number: Option<String>,
    notes: Option<String>,
    address: Option<String>,
    created_at: String,
    updated_at: String,
}

fn read_patient_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PatientRow> {
    Ok(PatientRow {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        full_name: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        birth_date: row.get(6)?,
        gender: row.get(7)?,
        status: row.get(8)?,
        document_number: row.get(9)?,
        notes: row.get(10)?,
        address: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

impl TryFrom<PatientRow> for Patient {
    type Error = DbError;

    fn try_from(row: PatientRow) -> Result<Self, Self::Error> {
        Ok(Patient {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            full_name: row.full_name,
            email: row.email,
            phone: row.phone,
            birth_date: opt_date_from_sql(row.birth_date)?,
            gender: enum_from_sql(&row.gender)?,
            status: enum_from_sql(&row.status)?,
            document_number: row.document_number,
            notes: row.notes,
            address: row.address.map(|a| serde_json::from_str(&a)).transpose()?,
            created_at: ts_from_sql(&row.created_at)?,
            updated_at: ts_from_sql(&row.updated_at)?,
        })
    }
}
