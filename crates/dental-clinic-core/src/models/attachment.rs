//! Attachment metadata. File bytes live in external blob storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub patient_id: String,
    pub appointment_id: Option<String>,
    pub response_set_id: Option<String>,
    pub uploaded_by_id: String,
    pub name: String,
    pub url: String,
    pub mime_type: Option<String>,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
