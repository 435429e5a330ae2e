//! Patient models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

text_enum! {
    /// Where the patient stands in the clinic's care flow.
    pub enum PatientStatus {
        Active => "ACTIVE",
        Waiting => "WAITING",
        Discharged => "DISCHARGED",
        Inactive => "INACTIVE",
    }
}

impl Default for PatientStatus {
    fn default() -> Self {
        PatientStatus::Active
    }
}

text_enum! {
    pub enum Gender {
        Female => "FEMALE",
        Male => "MALE",
        NonBinary => "NON_BINARY",
        Undisclosed => "UNDISCLOSED",
    }
}

impl Default for Gender {
    fn default() -> Self {
        Gender::Undisclosed
    }
}

/// Structured postal address. Every part is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

impl Address {
    /// True when no part of the address is filled in.
    pub fn is_empty(&self) -> bool {
        [
            &self.street,
            &self.number,
            &self.complement,
            &self.neighborhood,
            &self.city,
            &self.state,
            &self.postal_code,
        ]
        .iter()
        .all(|part| part.as_deref().map_or(true, |s| s.trim().is_empty()))
    }
}

/// A patient record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    /// Derived from the name parts, see [`compute_full_name`]
    pub full_name: String,
    /// Lowercased; unique across patients when present
    pub email: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Gender,
    pub status: PatientStatus,
    pub document_number: Option<String>,
    pub notes: Option<String>,
    pub address: Option<Address>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    /// Create a new patient with required fields.
    pub fn new(first_name: String, last_name: String) -> Self {
        let now = super::timestamp_now();
        let full_name = compute_full_name(&first_name, &last_name);
        Self {
            id: super::new_id(),
            first_name,
            last_name,
            full_name,
            email: None,
            phone: None,
            birth_date: None,
            gender: Gender::default(),
            status: PatientStatus::default(),
            document_number: None,
            notes: None,
            address: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Join the trimmed name parts with a single space, skipping empty parts.
pub fn compute_full_name(first: &str, last: &str) -> String {
    [first.trim(), last.trim()]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}
