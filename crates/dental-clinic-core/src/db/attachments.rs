//! Attachment metadata database operations.

use rusqlite::{params, OptionalExtension};

use super::{classify, ts_from_sql, ts_to_sql, Database, DbError, DbResult};
use crate::models::Attachment;

const ATTACHMENT_COLUMNS: &str = "id, patient_id, appointment_id, response_set_id, uploaded_by_id, \
     name, url, mime_type, size_bytes, created_at, updated_at";

impl Database {
    pub fn insert_attachment(&self, attachment: &Attachment) -> DbResult<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO attachments (
                    id, patient_id, appointment_id, response_set_id, uploaded_by_id,
                    name, url, mime_type, size_bytes, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
                params![
                    attachment.id,
                    attachment.patient_id,
                    attachment.appointment_id,
                    attachment.response_set_id,
                    attachment.uploaded_by_id,
                    attachment.name,
                    attachment.url,
                    attachment.mime_type,
                    attachment.size_bytes,
                    ts_to_sql(&attachment.created_at),
                    ts_to_sql(&attachment.updated_at),
                ],
            )
            .map_err(classify)?;
        Ok(())
    }

    pub fn get_attachment(&self, id: &str) -> DbResult<Option<Attachment>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM attachments WHERE id = ?", ATTACHMENT_COLUMNS),
                [id],
                read_attachment_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Delete an attachment, scoped to its owning patient.
    pub fn delete_attachment(&self, id: &str, patient_id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "DELETE FROM attachments WHERE id = ?1 AND patient_id = ?2",
            params![id, patient_id],
        )?;
        Ok(rows_affected > 0)
    }

    /// The patient's attachments, newest first.
    pub fn list_attachments_for_patient(&self, patient_id: &str) -> DbResult<Vec<Attachment>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM attachments WHERE patient_id = ? ORDER BY created_at DESC, rowid DESC",
            ATTACHMENT_COLUMNS
        ))?;
        let rows = stmt.query_map([patient_id], read_attachment_row)?;

        let mut attachments = Vec::new();
        for row in rows {
            attachments.push(row?.try_into()?);
        }
        Ok(attachments)
    }
}

/// Intermediate row struct for database mapping.
struct AttachmentRow {
    id: String,
    patient_id: String,
    appointment_id: Option<String>,
    response_set_id: Option<String>,
    uploaded_by_id: String,
    name: String,
    url: String,
    mime_type: Option<String>,
    size_bytes: i64,
    created_at: String,
    updated_at: String,
}

fn read_attachment_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AttachmentRow> {
    Ok(AttachmentRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        appointment_id: row.get(2)?,
        response_set_id: row.get(3)?,
        uploaded_by_id: row.get(4)?,
        name: row.get(5)?,
        url: row.get(6)?,
        mime_type: row.get(7)?,
        size_bytes: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

impl TryFrom<AttachmentRow> for Attachment {
    type Error = DbError;

    fn try_from(row: AttachmentRow) -> Result<Self, Self::Error> {
        Ok(Attachment {
            id: row.id,
            patient_id: row.patient_id,
            appointment_id: row.appointment_id,
            response_set_id: row.response_set_id,
            uploaded_by_id: row.uploaded_by_id,
            name: row.name,
            url: row.url,
            mime_type: row.mime_type,
            size_bytes: row.size_bytes,
            created_at: ts_from_sql(&row.created_at)?,
            updated_at: ts_from_sql(&row.updated_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{new_id, timestamp_now, Patient, User, UserRole};
    use chrono::Duration;

    fn attachment(patient: &Patient, user: &User, name: &str) -> Attachment {
        let now = timestamp_now();
        Attachment {
            id: new_id(),
            patient_id: patient.id.clone(),
            appointment_id: None,
            response_set_id: None,
            uploaded_by_id: user.id.clone(),
            name: name.into(),
            url: format!("https://blobs.example.com/{}", name),
            mime_type: Some("image/png".into()),
            size_bytes: 2048,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_insert_list_delete() {
        let db = Database::open_in_memory().unwrap();
        let user = User::new("Rita".into(), "rita@clinic.test".into(), UserRole::Staff);
        db.insert_user(&user).unwrap();
        let patient = Patient::new("Maria".into(), "Lima".into());
        let other = Patient::new("João".into(), "Souza".into());
        db.insert_patient(&patient).unwrap();
        db.insert_patient(&other).unwrap();

        let mut first = attachment(&patient, &user, "panoramica.png");
        first.created_at = first.created_at - Duration::hours(1);
        let second = attachment(&patient, &user, "periapical.png");
        db.insert_attachment(&first).unwrap();
        db.insert_attachment(&second).unwrap();

        let listed = db.list_attachments_for_patient(&patient.id).unwrap();
        assert_eq!(listed, vec![second.clone(), first.clone()]);

        // Wrong owner leaves the row alone
        assert!(!db.delete_attachment(&first.id, &other.id).unwrap());
        assert!(db.delete_attachment(&first.id, &patient.id).unwrap());
        assert!(db.get_attachment(&first.id).unwrap().is_none());
    }

    #[test]
    fn test_negative_size_rejected() {
        let db = Database::open_in_memory().unwrap();
        let user = User::new("Rita".into(), "rita@clinic.test".into(), UserRole::Staff);
        db.insert_user(&user).unwrap();
        let patient = Patient::new("Maria".into(), "Lima".into());
        db.insert_patient(&patient).unwrap();

        let mut bad = attachment(&patient, &user, "x.pdf");
        bad.size_bytes = -1;
        assert!(matches!(db.insert_attachment(&bad).unwrap_err(), DbError::Constraint(_)));
    }
}
