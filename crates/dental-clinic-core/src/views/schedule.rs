//! Week calendar: appointments bucketed into Sunday..Saturday.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use tracing::warn;

use super::start_of_day;
use crate::db::{AppointmentListing, Database, DbResult};

const SECONDS_PER_DAY: i64 = 86_400;

/// One calendar day of the week view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySchedule {
    pub date: NaiveDate,
    /// Earliest first
    pub appointments: Vec<AppointmentListing>,
}

/// Seven day buckets starting on the Sunday of the requested week.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekSchedule {
    /// The Sunday that opens the week
    pub week_start: NaiveDate,
    /// Always seven days, Sunday first
    pub days: Vec<DaySchedule>,
    /// Appointments handed in that start outside the week
    pub anomalies: Vec<AppointmentListing>,
}

/// The Sunday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_sunday()))
}

impl WeekSchedule {
    /// Bucket `appointments` into the week containing `base_date`.
    ///
    /// Each appointment lands in the day its start falls on. Any appointment
    /// starting outside the week is kept in `anomalies` and logged instead
    /// of being placed.
    pub fn build(base_date: NaiveDate, mut appointments: Vec<AppointmentListing>) -> Self {
        let first_day = week_start(base_date);
        let opens_at = start_of_day(first_day);

        let mut days: Vec<DaySchedule> = (0..7)
            .map(|offset| DaySchedule {
                date: first_day + Duration::days(offset),
                appointments: Vec::new(),
            })
            .collect();
        let mut anomalies = Vec::new();

        appointments.sort_by(|a, b| a.appointment.start_at.cmp(&b.appointment.start_at));
        for listing in appointments {
            let offset = (listing.appointment.start_at - opens_at)
                .num_seconds()
                .div_euclid(SECONDS_PER_DAY);
            match usize::try_from(offset).ok().and_then(|i| days.get_mut(i)) {
                Some(day) => day.appointments.push(listing),
                None => {
                    warn!(
                        appointment_id = %listing.appointment.id,
                        start_at = %listing.appointment.start_at,
                        week_start = %first_day,
                        "Appointment outside requested week"
                    );
                    anomalies.push(listing);
                }
            }
        }

        Self {
            week_start: first_day,
            days,
            anomalies,
        }
    }

    /// Fetch the week's appointments and bucket them.
    pub fn load(db: &Database, base_date: NaiveDate) -> DbResult<Self> {
        let first_day = week_start(base_date);
        let appointments = db.list_appointments_between(
            &start_of_day(first_day),
            &start_of_day(first_day + Duration::days(7)),
        )?;
        Ok(Self::build(base_date, appointments))
    }

    /// Number of appointments placed in a day bucket.
    pub fn placed(&self) -> usize {
        self.days.iter().map(|d| d.appointments.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Appointment, Patient, User, UserRole};
    use chrono::{DateTime, TimeZone, Utc, Weekday};

    fn listing(start: DateTime<Utc>) -> AppointmentListing {
        AppointmentListing {
            appointment: Appointment::new(
                "p1".into(),
                "u1".into(),
                "Consulta".into(),
                start,
                start + Duration::minutes(30),
            ),
            patient_name: "Maria Lima".into(),
            provider_name: "Dra. Ana".into(),
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_week_start_is_sunday() {
        // 2026-03-04 is a Wednesday
        assert_eq!(week_start(d(2026, 3, 4)), d(2026, 3, 1));
        assert_eq!(week_start(d(2026, 3, 1)), d(2026, 3, 1));
        assert_eq!(week_start(d(2026, 3, 7)), d(2026, 3, 1));
        assert_eq!(week_start(d(2026, 3, 1)).weekday(), Weekday::Sun);
    }

    #[test]
    fn test_buckets_by_day() {
        let sunday_morning = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let tuesday = Utc.with_ymd_and_hms(2026, 3, 3, 14, 30, 0).unwrap();
        let saturday_night = Utc.with_ymd_and_hms(2026, 3, 7, 23, 59, 59).unwrap();

        let week = WeekSchedule::build(
            d(2026, 3, 4),
            vec![listing(tuesday), listing(saturday_night), listing(sunday_morning)],
        );
        assert_eq!(week.days.len(), 7);
        assert_eq!(week.days[0].appointments.len(), 1);
        assert_eq!(week.days[2].appointments.len(), 1);
        assert_eq!(week.days[6].appointments.len(), 1);
        assert_eq!(week.days[6].date, d(2026, 3, 7));
        assert!(week.anomalies.is_empty());
    }

    #[test]
    fn test_outside_week_is_reported() {
        let before = Utc.with_ymd_and_hms(2026, 2, 28, 23, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2026, 3, 8, 0, 0, 0).unwrap();
        let week = WeekSchedule::build(d(2026, 3, 4), vec![listing(before), listing(after)]);
        assert_eq!(week.placed(), 0);
        assert_eq!(week.anomalies.len(), 2);
    }

    #[test]
    fn test_load_reads_window() {
        let db = Database::open_in_memory().unwrap();
        let provider = User::new("Dra. Ana".into(), "ana@clinic.test".into(), UserRole::Provider);
        db.insert_user(&provider).unwrap();
        let patient = Patient::new("Maria".into(), "Lima".into());
        db.insert_patient(&patient).unwrap();
        for (day, hour) in [(1, 8), (4, 10), (8, 9)] {
            let start = Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap();
            let appt = Appointment::new(
                patient.id.clone(),
                provider.id.clone(),
                "Limpeza".into(),
                start,
                start + Duration::hours(1),
            );
            db.insert_appointment(&appt).unwrap();
        }

        let week = WeekSchedule::load(&db, d(2026, 3, 4)).unwrap();
        assert_eq!(week.placed(), 2);
        assert_eq!(week.days[3].appointments[0].patient_name, "Maria Lima");
        assert!(week.anomalies.is_empty());
    }
}
