//! Appointment database operations.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use super::{classify, enum_from_sql, ts_from_sql, ts_to_sql, Database, DbError, DbResult};
use crate::models::{Appointment, Cents};

const APPOINTMENT_COLUMNS: &str = "a.id, a.patient_id, a.provider_id, a.title, a.description, \
     a.start_at, a.end_at, a.status, a.payment_status, a.fee_cents, a.paid_cents, a.location, \
     a.color, a.created_at, a.updated_at, p.full_name, u.name";

/// An appointment joined with the names shown next to it in lists.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentListing {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub patient_name: String,
    pub provider_name: String,
}

impl Database {
    pub fn insert_appointment(&self, appointment: &Appointment) -> DbResult<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO appointments (
                    id, patient_id, provider_id, title, description, start_at, end_at,
                    status, payment_status, fee_cents, paid_cents, location, color,
                    created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
                "#,
                params![
                    appointment.id,
                    appointment.patient_id,
                    appointment.provider_id,
                    appointment.title,
                    appointment.description,
                    ts_to_sql(&appointment.start_at),
                    ts_to_sql(&appointment.end_at),
                    appointment.status.as_str(),
                    appointment.payment_status.as_str(),
                    appointment.fee.map(Cents::as_i64),
                    appointment.paid_amount.map(Cents::as_i64),
                    appointment.location,
                    appointment.color,
                    ts_to_sql(&appointment.created_at),
                    ts_to_sql(&appointment.updated_at),
                ],
            )
            .map_err(classify)?;
        Ok(())
    }

    pub fn update_appointment(&self, appointment: &Appointment) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute(
                r#"
                UPDATE appointments SET
                    patient_id = ?2,
                    provider_id = ?3,
                    title = ?4,
                    description = ?5,
                    start_at = ?6,
                    end_at = ?7,
                    status = ?8,
                    payment_status = ?9,
                    fee_cents = ?10,
                    paid_cents = ?11,
                    location = ?12,
                    color = ?13,
                    updated_at = ?14
                WHERE id = ?1
                "#,
                params![
                    appointment.id,
                    appointment.patient_id,
                    appointment.provider_id,
                    appointment.title,
                    appointment.description,
                    ts_to_sql(&appointment.start_at),
                    ts_to_sql(&appointment.end_at),
                    appointment.status.as_str(),
                    appointment.payment_status.as_str(),
                    appointment.fee.map(Cents::as_i64),
                    appointment.paid_amount.map(Cents::as_i64),
                    appointment.location,
                    appointment.color,
                    ts_to_sql(&appointment.updated_at),
                ],
            )
            .map_err(classify)?;
        Ok(rows_affected > 0)
    }

    pub fn get_appointment(&self, id: &str) -> DbResult<Option<Appointment>> {
        self.conn
            .query_row(
                &listing_query("WHERE a.id = ?1", ""),
                [id],
                read_appointment_row,
            )
            .optional()?
            .map(|row| AppointmentListing::try_from(row).map(|l| l.appointment))
            .transpose()
    }

    pub fn delete_appointment(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM appointments WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    /// Appointments starting in `[start, end)`, earliest first.
    pub fn list_appointments_between(
        &self,
        start: &DateTime<Utc>,
        end: &DateTime<Utc>,
    ) -> DbResult<Vec<AppointmentListing>> {
        self.query_listings(
            &listing_query("WHERE a.start_at >= ?1 AND a.start_at < ?2", "ORDER BY a.start_at ASC"),
            params![ts_to_sql(start), ts_to_sql(end)],
        )
    }

    /// The patient's most recent appointments by start time, newest first.
    pub fn recent_appointments_for_patient(
        &self,
        patient_id: &str,
        limit: usize,
    ) -> DbResult<Vec<AppointmentListing>> {
        self.query_listings(
            &listing_query("WHERE a.patient_id = ?1", "ORDER BY a.start_at DESC LIMIT ?2"),
            params![patient_id, limit as i64],
        )
    }

    /// Appointments starting at or after `from`, earliest first.
    pub fn upcoming_appointments(
        &self,
        from: &DateTime<Utc>,
        limit: usize,
    ) -> DbResult<Vec<AppointmentListing>> {
        self.query_listings(
            &listing_query("WHERE a.start_at >= ?1", "ORDER BY a.start_at ASC LIMIT ?2"),
            params![ts_to_sql(from), limit as i64],
        )
    }

    fn query_listings(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> DbResult<Vec<AppointmentListing>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, read_appointment_row)?;

        let mut listings = Vec::new();
        for row in rows {
            listings.push(row?.try_into()?);
        }
        Ok(listings)
    }
}

/// Whether the appointment exists and is booked for this patient.
pub(crate) fn appointment_belongs_to(conn: &Connection, id: &str, patient_id: &str) -> DbResult<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM appointments WHERE id = ?1 AND patient_id = ?2",
            params![id, patient_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn listing_query(filter: &str, tail: &str) -> String {
    format!(
        r#"
        SELECT {}
        FROM appointments a
        JOIN patients p ON p.id = a.patient_id
        JOIN users u ON u.id = a.provider_id
        {}
        {}
        "#,
        APPOINTMENT_COLUMNS, filter, tail
    )
}

/// Intermediate row struct for database mapping.
struct AppointmentRow {
    id: String,
    patient_id: String,
    provider_id: String,
    title: String,
    description: Option<String>,
    start_at: String,
    end_at: String,
    status: String,
    payment_status: String,
    fee_cents: Option<i64>,
    paid_cents: Option<i64>,
    location: Option<String>,
    color: Option<String>,
    created_at: String,
    updated_at: String,
    patient_name: String,
    provider_name: String,
}

fn read_appointment_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AppointmentRow> {
    Ok(AppointmentRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        provider_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        start_at: row.get(5)?,
        end_at: row.get(6)?,
        status: row.get(7)?,
        payment_status: row.get(8)?,
        fee_cents: row.get(9)?,
        paid_cents: row.get(10)?,
        location: row.get(11)?,
        color: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
        patient_name: row.get(15)?,
        provider_name: row.get(16)?,
    })
}

impl TryFrom<AppointmentRow> for AppointmentListing {
    type Error = DbError;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        Ok(AppointmentListing {
            appointment: Appointment {
                id: row.id,
                patient_id: row.patient_id,
                provider_id: row.provider_id,
                title: row.title,
                description: row.description,
                start_at: ts_from_sql(&row.start_at)?,
                end_at: ts_from_sql(&row.end_at)?,
                status: enum_from_sql(&row.status)?,
                payment_status: enum_from_sql(&row.payment_status)?,
                fee: row.fee_cents.map(Cents::new),
                paid_amount: row.paid_cents.map(Cents::new),
                location: row.location,
                color: row.color,
                created_at: ts_from_sql(&row.created_at)?,
                updated_at: ts_from_sql(&row.updated_at)?,
            },
            patient_name: row.patient_name,
            provider_name: row.provider_name,
        })
    }
}
