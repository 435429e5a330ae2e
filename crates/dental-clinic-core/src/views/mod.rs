//! Read-side aggregators: the patient page, the week calendar and the
//! dashboard/report rollups.
//!
//! The bucketing functions are pure and take already-fetched rows; each
//! view also has a `load` constructor that runs its queries.
//! Calendar days are UTC days.

mod dashboard;
mod patient_detail;
mod schedule;

pub use dashboard::*;
pub use patient_detail::*;
pub use schedule::*;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use thiserror::Error;

use crate::db::DbError;
use crate::models::AmountError;

/// Errors building a view.
#[derive(Error, Debug)]
pub enum ViewError {
    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    Amount(#[from] AmountError),
}

pub type ViewResult<T> = Result<T, ViewError>;

/// Midnight UTC at the start of `date`.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.day0()))
}

/// First day of the month after the one containing `date`.
pub fn next_month_start(date: NaiveDate) -> NaiveDate {
    month_start(month_start(date) + Duration::days(31))
}

/// First day of the month before the one containing `date`.
pub fn previous_month_start(date: NaiveDate) -> NaiveDate {
    month_start(month_start(date) - Duration::days(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_month_boundaries() {
        assert_eq!(month_start(d(2026, 2, 17)), d(2026, 2, 1));
        assert_eq!(next_month_start(d(2026, 1, 31)), d(2026, 2, 1));
        assert_eq!(next_month_start(d(2026, 12, 5)), d(2027, 1, 1));
        assert_eq!(previous_month_start(d(2026, 3, 31)), d(2026, 2, 1));
        assert_eq!(previous_month_start(d(2026, 1, 1)), d(2025, 12, 1));
    }

    #[test]
    fn test_start_of_day() {
        assert_eq!(start_of_day(d(2026, 3, 2)).to_rfc3339(), "2026-03-02T00:00:00+00:00");
    }
}
