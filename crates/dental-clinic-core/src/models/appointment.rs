//! Appointment models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Cents;

text_enum! {
    pub enum AppointmentStatus {
        Scheduled => "SCHEDULED",
        Completed => "COMPLETED",
        Cancelled => "CANCELLED",
        Missed => "MISSED",
    }
}

impl Default for AppointmentStatus {
    fn default() -> Self {
        AppointmentStatus::Scheduled
    }
}

text_enum! {
    /// Settlement state shared by appointments and anamnesis response sets.
    pub enum PaymentStatus {
        Unpaid => "UNPAID",
        Partial => "PARTIAL",
        Paid => "PAID",
    }
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Unpaid
    }
}

/// A scheduled session between one patient and one provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    pub provider_id: String,
    pub title: String,
    pub description: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub payment_status: PaymentStatus,
    pub fee: Option<Cents>,
    pub paid_amount: Option<Cents>,
    pub location: Option<String>,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn new(
        patient_id: String,
        provider_id: String,
        title: String,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
    ) -> Self {
        let now = super::timestamp_now();
        Self {
            id: super::new_id(),
            patient_id,
            provider_id,
            title,
            description: None,
            start_at,
            end_at,
            status: AppointmentStatus::default(),
            payment_status: PaymentStatus::default(),
            fee: None,
            paid_amount: None,
            location: None,
            color: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Amount still owed, when a fee is set and the difference is representable.
    pub fn outstanding(&self) -> Option<Cents> {
        self.fee
            .and_then(|fee| fee.checked_sub(self.paid_amount.unwrap_or(Cents::ZERO)).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_outstanding() {
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        let mut appointment =
            Appointment::new("p".into(), "d".into(), "Cleaning".into(), start, end);
        assert_eq!(appointment.outstanding(), None);

        appointment.fee = Some(Cents::from_units(200));
        appointment.paid_amount = Some(Cents::from_units(50));
        assert_eq!(appointment.outstanding(), Some(Cents::from_units(150)));
    }
}
