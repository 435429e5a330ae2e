//! Odontogram (tooth chart) models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

text_enum! {
    /// Which tooth numbering set the chart uses.
    pub enum ChartType {
        Permanent => "PERMANENT",
        Deciduous => "DECIDUOUS",
    }
}

impl Default for ChartType {
    fn default() -> Self {
        ChartType::Permanent
    }
}

text_enum! {
    pub enum ToothStatus {
        Open => "OPEN",
        InProgress => "IN_PROGRESS",
        Completed => "COMPLETED",
        Note => "NOTE",
    }
}

/// The tooth chart attached to one response set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OdontogramRecord {
    pub id: String,
    pub response_set_id: String,
    pub patient_id: String,
    pub chart_type: ChartType,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Sorted by tooth number
    pub entries: Vec<OdontogramEntry>,
}

/// One tooth's latest state. Entries are replaced wholesale on every save.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OdontogramEntry {
    pub id: String,
    pub odontogram_id: String,
    /// Numbering-system code, e.g. FDI "11"
    pub tooth_number: String,
    pub region: Option<String>,
    pub annotations: Option<String>,
    pub status: ToothStatus,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
}

/// A snapshot of the entries a save replaced. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OdontogramRevision {
    pub id: String,
    pub odontogram_id: String,
    /// Response set version the snapshot was taken at
    pub version: i64,
    /// Hex SHA-256 of the snapshot JSON
    pub digest: String,
    pub entries: Vec<OdontogramEntry>,
    pub replaced_by_id: String,
    pub created_at: DateTime<Utc>,
}
