//! Patient intake validation.

use chrono::NaiveDate;
use serde::Deserialize;

use super::{enum_or_default, optional_date, optional_text, required_text, ValidationErrors, ValidationResult};
use crate::models::{compute_full_name, Address, Gender, Patient, PatientStatus};

/// Raw patient form input.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PatientInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<String>,
    pub document_number: Option<String>,
    pub notes: Option<String>,
    pub address: Option<Address>,
}

/// Validated patient fields, ready to apply to a record.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientFields {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: PatientStatus,
    pub gender: Gender,
    pub birth_date: Option<NaiveDate>,
    pub document_number: Option<String>,
    pub notes: Option<String>,
    pub address: Option<Address>,
}

impl PatientFields {
    /// Build a new patient record.
    pub fn into_patient(self) -> Patient {
        let mut patient = Patient::new(String::new(), String::new());
        self.apply_to(&mut patient);
        patient
    }

    /// Overwrite the editable fields of an existing record.
    pub fn apply_to(self, patient: &mut Patient) {
        patient.full_name = compute_full_name(&self.first_name, &self.last_name);
        patient.first_name = self.first_name;
        patient.last_name = self.last_name;
        patient.email = self.email;
        patient.phone = self.phone;
        patient.status = self.status;
        patient.gender = self.gender;
        patient.birth_date = self.birth_date;
        patient.document_number = self.document_number;
        patient.notes = self.notes;
        patient.address = self.address;
    }
}

/// Validate patient input. `today` bounds the birth date.
pub fn validate_patient(input: PatientInput, today: NaiveDate) -> ValidationResult<PatientFields> {
    let mut errors = ValidationErrors::new();

    let first_name = required_text(&mut errors, "firstName", input.first_name, 1);
    let last_name = required_text(&mut errors, "lastName", input.last_name, 1);

    let email = optional_text(input.email).map(|e| e.to_lowercase());
    if let Some(email) = &email {
        if !looks_like_email(email) {
            errors.push("email", "is not a valid address");
        }
    }

    let status = enum_or_default(&mut errors, "status", input.status, PatientStatus::default());
    let gender = enum_or_default(&mut errors, "gender", input.gender, Gender::default());

    let birth_date = optional_date(&mut errors, "birthDate", input.birth_date);
    if birth_date.is_some_and(|d| d > today) {
        errors.push("birthDate", "must not be in the future");
    }

    let fields = PatientFields {
        first_name,
        last_name,
        email,
        phone: optional_text(input.phone),
        status,
        gender,
        birth_date,
        document_number: optional_text(input.document_number),
        notes: optional_text(input.notes),
        address: input.address.filter(|a| !a.is_empty()),
    };

    errors.into_result(fields)
}

/// `local@domain.tld` with no whitespace.
fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}
