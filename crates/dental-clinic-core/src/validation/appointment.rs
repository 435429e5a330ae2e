//! Appointment scheduling form validation.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{
    enum_or_default, optional_amount, optional_text, required_text, required_timestamp,
    ValidationErrors, ValidationResult,
};
use crate::models::{Appointment, AppointmentStatus, Cents, PaymentStatus};

/// Raw appointment form input. `id` present means update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppointmentInput {
    pub id: Option<String>,
    pub patient_id: Option<String>,
    pub provider_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub fee: Option<String>,
    pub paid_amount: Option<String>,
    pub start_at: Option<String>,
    pub end_at: Option<String>,
    pub location: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentFields {
    pub id: Option<String>,
    pub patient_id: String,
    pub provider_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: AppointmentStatus,
    pub payment_status: PaymentStatus,
    pub fee: Option<Cents>,
    pub paid_amount: Option<Cents>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub location: Option<String>,
    pub color: Option<String>,
}

impl AppointmentFields {
    pub fn into_appointment(self) -> Appointment {
        let mut appointment = Appointment::new(
            self.patient_id.clone(),
            self.provider_id.clone(),
            self.title.clone(),
            self.start_at,
            self.end_at,
        );
        self.apply_to(&mut appointment);
        appointment
    }

    pub fn apply_to(self, appointment: &mut Appointment) {
        appointment.patient_id = self.patient_id;
        appointment.provider_id = self.provider_id;
        appointment.title = self.title;
        appointment.description = self.description;
        appointment.status = self.status;
        appointment.payment_status = self.payment_status;
        appointment.fee = self.fee;
        appointment.paid_amount = self.paid_amount;
        appointment.start_at = self.start_at;
        appointment.end_at = self.end_at;
        appointment.location = self.location;
        appointment.color = self.color;
    }
}

pub fn validate_appointment(input: AppointmentInput) -> ValidationResult<AppointmentFields> {
    let mut errors = ValidationErrors::new();

    let patient_id = required_text(&mut errors, "patientId", input.patient_id, 1);
    let provider_id = required_text(&mut errors, "providerId", input.provider_id, 1);
    let title = required_text(&mut errors, "title", input.title, 1);
    let status = enum_or_default(&mut errors, "status", input.status, AppointmentStatus::default());
    let payment_status = enum_or_default(
        &mut errors,
        "paymentStatus",
        input.payment_status,
        PaymentStatus::default(),
    );
    let fee = optional_amount(&mut errors, "fee", input.fee);
    let paid_amount = optional_amount(&mut errors, "paidAmount", input.paid_amount);
    let start_at = required_timestamp(&mut errors, "startAt", input.start_at);
    let end_at = required_timestamp(&mut errors, "endAt", input.end_at);

    if let (Some(start), Some(end)) = (start_at, end_at) {
        if end <= start {
            errors.push("endAt", "must be after startAt");
        }
    }

    let (Some(start_at), Some(end_at)) = (start_at, end_at) else {
        return Err(errors);
    };

    let fields = AppointmentFields {
        id: optional_text(input.id),
        patient_id,
        provider_id,
        title,
        description: optional_text(input.description),
        status,
        payment_status,
        fee,
        paid_amount,
        start_at,
        end_at,
        location: optional_text(input.location),
        color: optional_text(input.color),
    };

    errors.into_result(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> AppointmentInput {
        AppointmentInput {
            patient_id: Some("patient-1".into()),
            provider_id: Some("provider-1".into()),
            title: Some("Limpeza".into()),
            fee: Some("180".into()),
            start_at: Some("2026-03-02T09:00:00Z".into()),
            end_at: Some("2026-03-02T10:00:00Z".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_appointment_defaults() {
        let fields = validate_appointment(input()).unwrap();
        assert_eq!(fields.status, AppointmentStatus::Scheduled);
        assert_eq!(fields.payment_status, PaymentStatus::Unpaid);
        assert_eq!(fields.fee, Some(Cents::from_units(180)));
        assert_eq!(fields.id, None);
    }

    #[test]
    fn test_end_must_follow_start() {
        let mut raw = input();
        raw.end_at = Some("2026-03-02T08:00:00Z".into());
        let errors = validate_appointment(raw).unwrap_err();
        assert!(errors.has("endAt"));
    }

    #[test]
    fn test_missing_required_fields() {
        let errors = validate_appointment(AppointmentInput::default()).unwrap_err();
        for field in ["patientId", "providerId", "title", "startAt", "endAt"] {
            assert!(errors.has(field), "expected error for {}", field);
        }
    }

    #[test]
    fn test_bad_status_is_reported() {
        let mut raw = input();
        raw.status = Some("POSTPONED".into());
        let errors = validate_appointment(raw).unwrap_err();
        assert!(errors.has("status"));
    }
}
