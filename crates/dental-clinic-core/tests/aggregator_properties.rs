//! Property tests for the pure view builders.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use proptest::prelude::*;

use dental_clinic_core::db::AppointmentListing;
use dental_clinic_core::models::{Appointment, Cents, FinancialTransaction, TransactionType};
use dental_clinic_core::views::{
    age_distribution, daily_series, monthly_series, start_of_day, week_start, AgeBand, WeekSchedule,
};

fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (0i64..3650).prop_map(|days| NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + Duration::days(days))
}

fn listing(start: chrono::DateTime<chrono::Utc>) -> AppointmentListing {
    AppointmentListing {
        appointment: Appointment::new(
            "patient".into(),
            "provider".into(),
            "Consulta".into(),
            start,
            start + Duration::minutes(40),
        ),
        patient_name: "Paciente".into(),
        provider_name: "Dentista".into(),
    }
}

fn transaction(kind: TransactionType, cents: i64, day: NaiveDate, second: i64) -> FinancialTransaction {
    let mut tx = FinancialTransaction::new(kind, "Geral".into(), Cents::new(cents));
    tx.created_at = start_of_day(day) + Duration::seconds(second);
    tx
}

proptest! {
    #[test]
    fn week_places_every_appointment_once(
        base in date_strategy(),
        offsets in prop::collection::vec(0i64..(7 * 86_400), 0..40),
    ) {
        let opens_at = start_of_day(week_start(base));
        let listings: Vec<_> = offsets.iter().map(|s| listing(opens_at + Duration::seconds(*s))).collect();
        let mut ids: Vec<String> = listings.iter().map(|l| l.appointment.id.clone()).collect();

        let week = WeekSchedule::build(base, listings);

        prop_assert_eq!(week.days.len(), 7);
        prop_assert_eq!(week.days[0].date.weekday(), Weekday::Sun);
        prop_assert_eq!(week.days[6].date.weekday(), Weekday::Sat);
        prop_assert!(week.days[0].date <= base && base <= week.days[6].date);
        prop_assert!(week.anomalies.is_empty());

        let mut placed: Vec<String> = Vec::new();
        for day in &week.days {
            for l in &day.appointments {
                prop_assert_eq!(l.appointment.start_at.date_naive(), day.date);
                placed.push(l.appointment.id.clone());
            }
        }
        ids.sort();
        placed.sort();
        prop_assert_eq!(placed, ids);
    }

    #[test]
    fn week_accounts_for_out_of_window(
        base in date_strategy(),
        offsets in prop::collection::vec(-(21 * 86_400i64)..(28 * 86_400), 0..40),
    ) {
        let opens_at = start_of_day(week_start(base));
        let inside = offsets.iter().filter(|s| (0..7 * 86_400).contains(*s)).count();
        let listings = offsets.iter().map(|s| listing(opens_at + Duration::seconds(*s))).collect();

        let week = WeekSchedule::build(base, listings);

        prop_assert_eq!(week.placed(), inside);
        prop_assert_eq!(week.anomalies.len(), offsets.len() - inside);
    }

    #[test]
    fn daily_series_has_no_gaps(
        first in date_strategy(),
        span in 0i64..120,
        txs in prop::collection::vec((any::<bool>(), 1i64..1_000_000, 0i64..120, 0i64..86_400), 0..30),
    ) {
        let last = first + Duration::days(span);
        let transactions: Vec<_> = txs
            .iter()
            .map(|(income, cents, day, second)| {
                let kind = if *income { TransactionType::Income } else { TransactionType::Expense };
                transaction(kind, *cents, first + Duration::days(*day), *second)
            })
            .collect();

        let series = daily_series(first, last, &transactions).unwrap();

        prop_assert_eq!(series.len() as i64, span + 1);
        for (i, point) in series.iter().enumerate() {
            prop_assert_eq!(point.date, first + Duration::days(i as i64));
        }

        let expected: i64 = transactions
            .iter()
            .filter(|t| t.transaction_type == TransactionType::Income && t.created_at.date_naive() <= last)
            .map(|t| t.amount.as_i64())
            .sum();
        let got: i64 = series.iter().map(|p| p.totals.income.as_i64()).sum();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn monthly_series_is_contiguous(today in date_strategy(), months in 1u32..24) {
        let series = monthly_series(today, months, &[]).unwrap();

        prop_assert_eq!(series.len(), months as usize);
        prop_assert_eq!(series.last().unwrap().month.clone(), today.format("%Y-%m").to_string());
        for pair in series.windows(2) {
            prop_assert!(pair[0].month < pair[1].month);
        }
        for point in &series {
            prop_assert_eq!(point.totals.income, Cents::ZERO);
            prop_assert_eq!(point.totals.expense, Cents::ZERO);
        }
    }

    #[test]
    fn age_band_follows_whole_years(
        year in 2000i32..2030,
        month in 1u32..=12,
        day in 1u32..=28,
        age in 0i32..100,
    ) {
        let today = NaiveDate::from_ymd_opt(year, month, day).unwrap();
        let birthday = NaiveDate::from_ymd_opt(year - age, month, day).unwrap();
        let expected = match age {
            0..=12 => AgeBand::Child,
            13..=20 => AgeBand::Teen,
            21..=40 => AgeBand::YoungAdult,
            41..=60 => AgeBand::Adult,
            _ => AgeBand::Senior,
        };
        prop_assert_eq!(AgeBand::classify(Some(birthday), today), expected);
        prop_assert_eq!(AgeBand::classify(None, today), AgeBand::Unknown);
    }

    #[test]
    fn age_distribution_counts_everyone(
        today in date_strategy(),
        ages in prop::collection::vec(prop::option::of(0i64..36_500), 0..50),
    ) {
        let births: Vec<Option<NaiveDate>> = ages
            .iter()
            .map(|a| a.map(|days| today - Duration::days(days)))
            .collect();

        let buckets = age_distribution(&births, today);

        prop_assert_eq!(buckets.len(), AgeBand::ALL.len());
        prop_assert_eq!(buckets.iter().map(|b| b.count).sum::<usize>(), births.len());
        let unknown = buckets.iter().find(|b| b.band == AgeBand::Unknown).unwrap();
        prop_assert_eq!(unknown.count, births.iter().filter(|b| b.is_none()).count());
    }
}

#[test]
fn test_thirteenth_birthday_boundary() {
    let today = NaiveDate::from_ymd_opt(2026, 6, 15).unwrap();
    let twelve_today = NaiveDate::from_ymd_opt(2014, 6, 15).unwrap();
    assert_eq!(AgeBand::classify(Some(twelve_today), today), AgeBand::Child);

    // Born one day earlier: turned 13 yesterday
    let thirteen = twelve_today - Duration::days(365 + 1);
    assert_eq!(AgeBand::classify(Some(thirteen), today), AgeBand::Teen);

    // The day before the 13th birthday
    let birth = NaiveDate::from_ymd_opt(2013, 6, 16).unwrap();
    assert_eq!(AgeBand::classify(Some(birth), today), AgeBand::Child);
    assert_eq!(AgeBand::classify(Some(birth), today + Duration::days(1)), AgeBand::Teen);
}
