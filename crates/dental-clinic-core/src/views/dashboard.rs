//! Dashboard, financial report and finance overview rollups.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;

use super::{month_start, next_month_start, previous_month_start, start_of_day, ViewResult};
use crate::db::{AppointmentListing, Database, GenderCount, StatusCount, UnpaidResponse};
use crate::models::{AmountError, Cents, FinancialTransaction, Task, TransactionType};

/// Upcoming appointments shown on the dashboard.
pub const DASHBOARD_UPCOMING: usize = 6;

/// Unpaid questionnaires shown on the dashboard.
pub const DASHBOARD_UNPAID: usize = 4;

/// Open tasks shown on the dashboard.
pub const DASHBOARD_TASKS: usize = 5;

/// Months covered by the financial report.
pub const REPORT_MONTHS: u32 = 6;

/// Transactions listed on the finance page.
pub const FINANCE_RECENT: usize = 50;

/// Income and expense accumulated over one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub income: Cents,
    pub expense: Cents,
}

impl Totals {
    fn add(&mut self, tx: &FinancialTransaction) -> Result<(), AmountError> {
        let bucket = match tx.transaction_type {
            TransactionType::Income => &mut self.income,
            TransactionType::Expense => &mut self.expense,
        };
        *bucket = bucket.checked_add(tx.amount)?;
        Ok(())
    }

    /// Sum every transaction by type.
    pub fn of(transactions: &[FinancialTransaction]) -> Result<Self, AmountError> {
        let mut totals = Self::default();
        for tx in transactions {
            totals.add(tx)?;
        }
        Ok(totals)
    }

    /// Income minus expense.
    pub fn net(&self) -> Result<Cents, AmountError> {
        self.income.checked_sub(self.expense)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub totals: Totals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyPoint {
    /// `YYYY-MM`
    pub month: String,
    #[serde(flatten)]
    pub totals: Totals,
}

/// One point per day from `first` through `last` inclusive, zero-filled.
///
/// Transactions are bucketed by the UTC day they were created; ones outside
/// the range are ignored.
pub fn daily_series(
    first: NaiveDate,
    last: NaiveDate,
    transactions: &[FinancialTransaction],
) -> Result<Vec<DailyPoint>, AmountError> {
    let mut buckets: BTreeMap<NaiveDate, Totals> = BTreeMap::new();
    let mut day = first;
    while day <= last {
        buckets.insert(day, Totals::default());
        day += Duration::days(1);
    }

    for tx in transactions {
        if let Some(totals) = buckets.get_mut(&tx.created_at.date_naive()) {
            totals.add(tx)?;
        }
    }

    Ok(buckets
        .into_iter()
        .map(|(date, totals)| DailyPoint { date, totals })
        .collect())
}

/// One point per month for the `months` months ending with the month of
/// `today`, oldest first, zero-filled.
pub fn monthly_series(
    today: NaiveDate,
    months: u32,
    transactions: &[FinancialTransaction],
) -> Result<Vec<MonthlyPoint>, AmountError> {
    let mut starts = Vec::new();
    let mut start = month_start(today);
    for _ in 0..months {
        starts.push(start);
        start = previous_month_start(start);
    }
    starts.reverse();

    let mut buckets: BTreeMap<NaiveDate, Totals> = starts.iter().map(|s| (*s, Totals::default())).collect();
    for tx in transactions {
        if let Some(totals) = buckets.get_mut(&month_start(tx.created_at.date_naive())) {
            totals.add(tx)?;
        }
    }

    Ok(buckets
        .into_iter()
        .map(|(start, totals)| MonthlyPoint {
            month: start.format("%Y-%m").to_string(),
            totals,
        })
        .collect())
}

/// Whole years from `birth` to `today`, one less if this year's birthday
/// has not arrived yet.
pub fn age_in_years(birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}

/// Fixed demographic age bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgeBand {
    Child,
    Teen,
    YoungAdult,
    Adult,
    Senior,
    Unknown,
}

impl AgeBand {
    pub const ALL: [AgeBand; 6] = [
        AgeBand::Child,
        AgeBand::Teen,
        AgeBand::YoungAdult,
        AgeBand::Adult,
        AgeBand::Senior,
        AgeBand::Unknown,
    ];

    /// Band for a birth date as of `today`. Missing or future birth dates
    /// are `Unknown`.
    pub fn classify(birth: Option<NaiveDate>, today: NaiveDate) -> Self {
        let Some(birth) = birth else {
            return AgeBand::Unknown;
        };
        match age_in_years(birth, today) {
            age if age < 0 => AgeBand::Unknown,
            0..=12 => AgeBand::Child,
            13..=20 => AgeBand::Teen,
            21..=40 => AgeBand::YoungAdult,
            41..=60 => AgeBand::Adult,
            _ => AgeBand::Senior,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgeBand::Child => "0-12",
            AgeBand::Teen => "13-20",
            AgeBand::YoungAdult => "21-40",
            AgeBand::Adult => "41-60",
            AgeBand::Senior => "61+",
            AgeBand::Unknown => "Sem info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgeBucket {
    pub band: AgeBand,
    pub label: &'static str,
    pub count: usize,
}

/// Patient counts per age band, every band present, in band order.
pub fn age_distribution(birth_dates: &[Option<NaiveDate>], today: NaiveDate) -> Vec<AgeBucket> {
    let mut counts: BTreeMap<AgeBand, usize> = AgeBand::ALL.iter().map(|b| (*b, 0)).collect();
    for birth in birth_dates {
        *counts.entry(AgeBand::classify(*birth, today)).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(band, count)| AgeBucket {
            band,
            label: band.label(),
            count,
        })
        .collect()
}

/// The landing dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    /// First day of the current month
    pub month: NaiveDate,
    /// Totals for transactions created this month
    pub month_totals: Totals,
    /// Income minus expense this month
    pub net_balance: Cents,
    /// Every day of the current month
    pub daily: Vec<DailyPoint>,
    pub patient_count: i64,
    pub age_distribution: Vec<AgeBucket>,
    pub gender_counts: Vec<GenderCount>,
    /// Appointments from the start of today, earliest first
    pub upcoming: Vec<AppointmentListing>,
    /// Most recently filled questionnaires not yet paid
    pub unpaid_responses: Vec<UnpaidResponse>,
    /// Tasks not done, soonest due first
    pub pending_tasks: Vec<Task>,
}

impl DashboardSummary {
    pub fn load(db: &Database, now: DateTime<Utc>) -> ViewResult<Self> {
        let today = now.date_naive();
        let first = month_start(today);
        let next = next_month_start(today);

        let transactions = db.list_transactions_between(&start_of_day(first), &start_of_day(next))?;
        let month_totals = Totals::of(&transactions)?;

        Ok(Self {
            month: first,
            net_balance: month_totals.net()?,
            month_totals,
            daily: daily_series(first, next - Duration::days(1), &transactions)?,
            patient_count: db.count_patients()?,
            age_distribution: age_distribution(&db.list_birth_dates()?, today),
            gender_counts: db.count_patients_by_gender()?,
            upcoming: db.upcoming_appointments(&start_of_day(today), DASHBOARD_UPCOMING)?,
            unpaid_responses: db.list_unpaid_responses(DASHBOARD_UNPAID)?,
            pending_tasks: db.list_pending_tasks(DASHBOARD_TASKS)?,
        })
    }
}

/// The multi-month report page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialReport {
    /// Oldest month first, ending with the current month
    pub monthly: Vec<MonthlyPoint>,
    pub totals: Totals,
    pub patients_by_status: Vec<StatusCount>,
    pub patients_by_gender: Vec<GenderCount>,
}

impl FinancialReport {
    pub fn load(db: &Database, now: DateTime<Utc>) -> ViewResult<Self> {
        let today = now.date_naive();
        let mut first = month_start(today);
        for _ in 1..REPORT_MONTHS {
            first = previous_month_start(first);
        }
        let transactions =
            db.list_transactions_between(&start_of_day(first), &start_of_day(next_month_start(today)))?;

        Ok(Self {
            monthly: monthly_series(today, REPORT_MONTHS, &transactions)?,
            totals: Totals::of(&transactions)?,
            patients_by_status: db.count_patients_by_status()?,
            patients_by_gender: db.count_patients_by_gender()?,
        })
    }
}

/// The finance page: latest transactions and what is still open.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceOverview {
    /// Newest first
    pub transactions: Vec<FinancialTransaction>,
    /// Over the listed transactions
    pub totals: Totals,
    pub net_balance: Cents,
    /// Transactions of any age not yet PAID
    pub unsettled_count: i64,
}

impl FinanceOverview {
    pub fn load(db: &Database) -> ViewResult<Self> {
        let transactions = db.recent_transactions(FINANCE_RECENT)?;
        let totals = Totals::of(&transactions)?;
        Ok(Self {
            net_balance: totals.net()?,
            totals,
            transactions,
            unsettled_count: db.count_unsettled_transactions()?,
        })
    }
}
