//! Anamnesis response set and answer database operations.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use super::{classify, enum_from_sql, ts_from_sql, ts_to_sql, Database, DbError, DbResult};
use crate::models::{AnamnesisAnswer, AnamnesisResponseSet, AnswerValue, Cents, ResponseStatus};

const RESPONSE_SET_COLUMNS: &str = "r.id, r.template_id, r.patient_id, r.appointment_id, \
     r.filled_by_id, r.payment_status, r.amount_due_cents, r.amount_paid_cents, r.notes, \
     r.status, r.version, r.filled_at, r.updated_at";

/// A response set as listed on the patient page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSetSummary {
    #[serde(flatten)]
    pub response_set: AnamnesisResponseSet,
    pub template_name: String,
}

/// A response set still awaiting payment, for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnpaidResponse {
    #[serde(flatten)]
    pub response_set: AnamnesisResponseSet,
    pub template_name: String,
    pub patient_name: String,
}

impl Database {
    pub fn get_response_set(&self, id: &str) -> DbResult<Option<AnamnesisResponseSet>> {
        get_response_set(&self.conn, id)
    }

    /// The patient's response sets with template names, newest first.
    pub fn list_response_sets_for_patient(&self, patient_id: &str) -> DbResult<Vec<ResponseSetSummary>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {}, t.name
            FROM anamnesis_response_sets r
            JOIN anamnesis_templates t ON t.id = r.template_id
            WHERE r.patient_id = ?1
            ORDER BY r.filled_at DESC
            "#,
            RESPONSE_SET_COLUMNS
        ))?;
        let rows = stmt.query_map([patient_id], |row| {
            Ok((read_response_set_row(row)?, row.get::<_, String>(13)?))
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            let (set, template_name) = row?;
            summaries.push(ResponseSetSummary {
                response_set: set.try_into()?,
                template_name,
            });
        }
        Ok(summaries)
    }

    /// Response sets not yet fully paid, most recently filled first.
    pub fn list_unpaid_responses(&self, limit: usize) -> DbResult<Vec<UnpaidResponse>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {}, t.name, p.full_name
            FROM anamnesis_response_sets r
            JOIN anamnesis_templates t ON t.id = r.template_id
            JOIN patients p ON p.id = r.patient_id
            WHERE r.payment_status <> 'PAID'
            ORDER BY r.filled_at DESC
            LIMIT ?1
            "#,
            RESPONSE_SET_COLUMNS
        ))?;
        let rows = stmt.query_map([limit as i64], |row| {
            Ok((
                read_response_set_row(row)?,
                row.get::<_, String>(13)?,
                row.get::<_, String>(14)?,
            ))
        })?;

        let mut unpaid = Vec::new();
        for row in rows {
            let (set, template_name, patient_name) = row?;
            unpaid.push(UnpaidResponse {
                response_set: set.try_into()?,
                template_name,
                patient_name,
            });
        }
        Ok(unpaid)
    }

    /// Answers of one response set, in insertion order.
    pub fn list_answers(&self, response_set_id: &str) -> DbResult<Vec<AnamnesisAnswer>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, response_set_id, question_id, value_text, value_boolean,
                   value_number, value_options, created_at
            FROM anamnesis_answers
            WHERE response_set_id = ?
            ORDER BY rowid ASC
            "#,
        )?;
        let rows = stmt.query_map([response_set_id], |row| {
            Ok(AnswerRow {
                id: row.get(0)?,
                response_set_id: row.get(1)?,
                question_id: row.get(2)?,
                value_text: row.get(3)?,
                value_boolean: row.get(4)?,
                value_number: row.get(5)?,
                value_options: row.get(6)?,
                created_at: row.get(7)?,
            })
        })?;

        let mut answers = Vec::new();
        for row in rows {
            answers.push(row?.try_into()?);
        }
        Ok(answers)
    }
}

pub(crate) fn insert_response_set(conn: &Connection, set: &AnamnesisResponseSet) -> DbResult<()> {
    conn.execute(
        r#"
        INSERT INTO anamnesis_response_sets (
            id, template_id, patient_id, appointment_id, filled_by_id, payment_status,
            amount_due_cents, amount_paid_cents, notes, status, version, filled_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
        params![
            set.id,
            set.template_id,
            set.patient_id,
            set.appointment_id,
            set.filled_by_id,
            set.payment_status.as_str(),
            set.amount_due.map(Cents::as_i64),
            set.amount_paid.map(Cents::as_i64),
            set.notes,
            set.status.as_str(),
            set.version,
            ts_to_sql(&set.filled_at),
            ts_to_sql(&set.updated_at),
        ],
    )
    .map_err(classify)?;
    Ok(())
}

pub(crate) fn get_response_set(conn: &Connection, id: &str) -> DbResult<Option<AnamnesisResponseSet>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM anamnesis_response_sets r WHERE r.id = ?",
            RESPONSE_SET_COLUMNS
        ),
        [id],
        read_response_set_row,
    )
    .optional()?
    .map(|row| row.try_into())
    .transpose()
}

/// Set status (and notes, when given), bump the version and return it.
pub(crate) fn touch_response_set(
    conn: &Connection,
    id: &str,
    status: ResponseStatus,
    notes: Option<&str>,
    updated_at: &DateTime<Utc>,
) -> DbResult<i64> {
    conn.query_row(
        r#"
        UPDATE anamnesis_response_sets SET
            status = ?2,
            notes = COALESCE(?3, notes),
            version = version + 1,
            updated_at = ?4
        WHERE id = ?1
        RETURNING version
        "#,
        params![id, status.as_str(), notes, ts_to_sql(updated_at)],
        |row| row.get(0),
    )
    .optional()
    .map_err(classify)?
    .ok_or_else(|| DbError::NotFound(format!("response set {}", id)))
}

pub(crate) fn insert_answers(conn: &Connection, answers: &[AnamnesisAnswer]) -> DbResult<()> {
    let mut stmt = conn.prepare(
        r#"
        INSERT INTO anamnesis_answers (
            id, response_set_id, question_id, value_text, value_boolean,
            value_number, value_options, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )?;

    for answer in answers {
        let (text, boolean, number, options) = match &answer.value {
            AnswerValue::Text(t) => (Some(t.as_str()), None, None, None),
            AnswerValue::Boolean(b) => (None, Some(*b), None, None),
            AnswerValue::Number(n) => (None, None, Some(*n), None),
            AnswerValue::Choices(c) => (None, None, None, Some(serde_json::to_string(c)?)),
        };
        stmt.execute(params![
            answer.id,
            answer.response_set_id,
            answer.question_id,
            text,
            boolean,
            number,
            options,
            ts_to_sql(&answer.created_at),
        ])
        .map_err(classify)?;
    }
    Ok(())
}

/// Intermediate row struct for database mapping.
struct ResponseSetRow {
    id: String,
    template_id: String,
    patient_id: String,
    appointment_id: Option<String>,
    filled_by_id: String,
    payment_status: String,
    amount_due_cents: Option<i64>,
    amount_paid_cents: Option<i64>,
    notes: Option<String>,
    status: String,
    version: i64,
    filled_at: String,
    updated_at: String,
}

fn read_response_set_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ResponseSetRow> {
    Ok(ResponseSetRow {
        id: row.get(0)?,
        template_id: row.get(1)?,
        patient_id: row.get(2)?,
        appointment_id: row.get(3)?,
        filled_by_id: row.get(4)?,
        payment_status: row.get(5)?,
        amount_due_cents: row.get(6)?,
        amount_paid_cents: row.get(7)?,
        notes: row.get(8)?,
        status: row.get(9)?,
        version: row.get(10)?,
        filled_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

impl TryFrom<ResponseSetRow> for AnamnesisResponseSet {
    type Error = DbError;

    fn try_from(row: ResponseSetRow) -> Result<Self, Self::Error> {
        Ok(AnamnesisResponseSet {
            id: row.id,
            template_id: row.template_id,
            patient_id: row.patient_id,
            appointment_id: row.appointment_id,
            filled_by_id: row.filled_by_id,
            payment_status: enum_from_sql(&row.payment_status)?,
            amount_due: row.amount_due_cents.map(Cents::new),
            amount_paid: row.amount_paid_cents.map(Cents::new),
            notes: row.notes,
            status: enum_from_sql(&row.status)?,
            version: row.version,
            filled_at: ts_from_sql(&row.filled_at)?,
            updated_at: ts_from_sql(&row.updated_at)?,
        })
    }
}

struct AnswerRow {
    id: String,
    response_set_id: String,
    question_id: String,
    value_text: Option<String>,
    value_boolean: Option<bool>,
    value_number: Option<f64>,
    value_options: Option<String>,
    created_at: String,
}

impl TryFrom<AnswerRow> for AnamnesisAnswer {
    type Error = DbError;

    fn try_from(row: AnswerRow) -> Result<Self, Self::Error> {
        let value = match (row.value_text, row.value_boolean, row.value_number, row.value_options) {
            (Some(t), None, None, None) => AnswerValue::Text(t),
            (None, Some(b), None, None) => AnswerValue::Boolean(b),
            (None, None, Some(n), None) => AnswerValue::Number(n),
            (None, None, None, Some(o)) => AnswerValue::Choices(serde_json::from_str(&o)?),
            _ => return Err(DbError::Corrupt(format!("answer {} has no single value", row.id))),
        };
        Ok(AnamnesisAnswer {
            id: row.id,
            response_set_id: row.response_set_id,
            question_id: row.question_id,
            value,
            created_at: ts_from_sql(&row.created_at)?,
        })
    }
}
