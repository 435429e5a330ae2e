//! Financial transactions and fixed-point money.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors parsing or summing money amounts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AmountError {
    #[error("Amount is empty")]
    Empty,

    #[error("Amount is not a decimal number: {0}")]
    Malformed(String),

    #[error("Amount has more than two decimal places: {0}")]
    TooPrecise(String),

    #[error("Amount is out of range: {0}")]
    Overflow(String),

    #[error("Total is out of range")]
    TotalOverflow,
}

/// A money amount in hundredths of the currency unit.
///
/// Serialized as a decimal string (`"150.50"`); accepts strings or JSON
/// numbers on input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cents(i64);

impl Cents {
    pub const ZERO: Cents = Cents(0);

    /// Largest amount a form may record: one trillion units.
    pub const MAX: Cents = Cents::from_units(1_000_000_000_000);

    pub const fn new(cents: i64) -> Self {
        Cents(cents)
    }

    /// Whole currency units.
    pub const fn from_units(units: i64) -> Self {
        Cents(units * 100)
    }

    pub const fn as_i64(self) -> i64 {
        self.0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Parse `"150"`, `"150.5"`, `"150.50"` or `"150,50"`; a leading `-` is allowed.
    pub fn parse(input: &str) -> Result<Self, AmountError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(AmountError::Empty);
        }

        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let (whole, fraction) = match body.find(['.', ',']) {
            Some(idx) => (&body[..idx], &body[idx + 1..]),
            None => (body, ""),
        };

        let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
        if whole.is_empty() || !all_digits(whole) || !all_digits(fraction) {
            return Err(AmountError::Malformed(trimmed.to_string()));
        }
        if body.contains(['.', ',']) && fraction.is_empty() {
            return Err(AmountError::Malformed(trimmed.to_string()));
        }
        if fraction.len() > 2 {
            return Err(AmountError::TooPrecise(trimmed.to_string()));
        }

        let overflow = || AmountError::Overflow(trimmed.to_string());
        let units: i64 = whole.parse().map_err(|_| overflow())?;
        let hundredths: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| overflow())? * 10,
            _ => fraction.parse().map_err(|_| overflow())?,
        };

        let magnitude = units
            .checked_mul(100)
            .and_then(|v| v.checked_add(hundredths))
            .ok_or_else(overflow)?;

        Ok(Cents(if negative { -magnitude } else { magnitude }))
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, magnitude / 100, magnitude % 100)
    }
}

impl Cents {
    pub fn checked_add(self, rhs: Cents) -> Result<Cents, AmountError> {
        self.0.checked_add(rhs.0).map(Cents).ok_or(AmountError::TotalOverflow)
    }

    pub fn checked_sub(self, rhs: Cents) -> Result<Cents, AmountError> {
        self.0.checked_sub(rhs.0).map(Cents).ok_or(AmountError::TotalOverflow)
    }

    /// Sum every amount, failing instead of wrapping.
    pub fn checked_sum<'a, I>(amounts: I) -> Result<Cents, AmountError>
    where
        I: IntoIterator<Item = &'a Cents>,
    {
        amounts
            .into_iter()
            .try_fold(Cents::ZERO, |total, amount| total.checked_add(*amount))
    }
}

impl Serialize for Cents {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cents {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CentsVisitor;

        impl<'de> Visitor<'de> for CentsVisitor {
            type Value = Cents;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a decimal amount as string or number")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Cents, E> {
                Cents::parse(v).map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Cents, E> {
                v.checked_mul(100)
                    .map(Cents)
                    .ok_or_else(|| E::custom(AmountError::Overflow(v.to_string())))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Cents, E> {
                i64::try_from(v)
                    .map_err(|_| E::custom(AmountError::Overflow(v.to_string())))
                    .and_then(|v| self.visit_i64(v))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Cents, E> {
                // Display gives the shortest representation that round-trips
                Cents::parse(&v.to_string()).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(CentsVisitor)
    }
}

text_enum! {
    pub enum TransactionType {
        Income => "INCOME",
        Expense => "EXPENSE",
    }
}

text_enum! {
    pub enum TransactionStatus {
        Pending => "PENDING",
        Paid => "PAID",
        Overdue => "OVERDUE",
    }
}

impl Default for TransactionStatus {
    fn default() -> Self {
        TransactionStatus::Pending
    }
}

/// An income or expense record, optionally linked to a patient or appointment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FinancialTransaction {
    pub id: String,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub category: String,
    pub description: Option<String>,
    pub amount: Cents,
    pub patient_id: Option<String>,
    pub appointment_id: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub paid_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FinancialTransaction {
    pub fn new(transaction_type: TransactionType, category: String, amount: Cents) -> Self {
        let now = super::timestamp_now();
        Self {
            id: super::new_id(),
            transaction_type,
            status: TransactionStatus::default(),
            category,
            description: None,
            amount,
            patient_id: None,
            appointment_id: None,
            due_date: None,
            paid_at: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }
}
