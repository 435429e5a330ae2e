//! Schema/validation layer.
//!
//! Pure functions that turn raw form or JSON input into validated field sets.
//! Every field failure is collected so the caller can show them all at once;
//! nothing here touches storage.

mod anamnesis;
mod appointment;
mod attachment;
mod inventory;
mod odontogram;
mod patient;
mod task;
mod transaction;

pub use anamnesis::*;
pub use appointment::*;
pub use attachment::*;
pub use inventory::*;
pub use odontogram::*;
pub use patient::*;
pub use task::*;
pub use transaction::*;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Cents, TextEnum};

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// All field failures for one input.
#[derive(Error, Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[error("Validation failed: {}", summarize(.errors))]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

pub type ValidationResult<T> = Result<T, ValidationErrors>;

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Whether any failure was recorded for `field`.
    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// `Ok(value)` when nothing failed.
    pub fn into_result<T>(self, value: T) -> ValidationResult<T> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

/// A numeric form field that may arrive as a JSON number or as text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumberInput {
    Number(f64),
    Text(String),
}

impl NumberInput {
    /// `None` for blank text; `Some(Err(()))` when the text is not a number.
    fn to_f64(&self) -> Option<Result<f64, ()>> {
        match self {
            NumberInput::Number(n) => Some(Ok(*n)),
            NumberInput::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    None
                } else {
                    Some(text.replace(',', ".").parse::<f64>().map_err(|_| ()))
                }
            }
        }
    }
}

pub(crate) fn optional_number(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<NumberInput>,
) -> Option<f64> {
    match value.as_ref().and_then(NumberInput::to_f64) {
        None => None,
        Some(Ok(n)) if n.is_finite() => Some(n),
        Some(_) => {
            errors.push(field, "must be a number");
            None
        }
    }
}

/// Whole, non-negative count.
pub(crate) fn optional_count(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<NumberInput>,
) -> Option<i64> {
    let n = optional_number(errors, field, value)?;
    if n < 0.0 || n.fract() != 0.0 || n > i64::MAX as f64 {
        errors.push(field, "must be a whole number not below zero");
        return None;
    }
    Some(n as i64)
}

/// Trim; blank becomes absent.
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trimmed text with at least `min_chars` characters.
pub(crate) fn required_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<String>,
    min_chars: usize,
) -> String {
    match optional_text(value) {
        None => {
            errors.push(field, "is required");
            String::new()
        }
        Some(text) if text.chars().count() < min_chars => {
            errors.push(field, format!("must have at least {} characters", min_chars));
            text
        }
        Some(text) => text,
    }
}

/// Parse an enum from its wire name, falling back to `default` when blank.
pub(crate) fn enum_or_default<T: TextEnum>(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<String>,
    default: T,
) -> T {
    match optional_text(value) {
        None => default,
        Some(text) => required_enum(errors, field, Some(text)).unwrap_or(default),
    }
}

pub(crate) fn required_enum<T: TextEnum>(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<String>,
) -> Option<T> {
    let Some(text) = optional_text(value) else {
        errors.push(field, "is required");
        return None;
    };
    let parsed = T::from_text(&text);
    if parsed.is_none() {
        let allowed: Vec<&str> = T::variants().iter().map(|v| v.as_text()).collect();
        errors.push(field, format!("must be one of {}", allowed.join(", ")));
    }
    parsed
}

pub(crate) fn optional_amount(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<String>,
) -> Option<Cents> {
    let text = optional_text(value)?;
    match Cents::parse(&text) {
        Ok(amount) if amount.is_negative() => {
            errors.push(field, "must not be negative");
            None
        }
        Ok(amount) if amount > Cents::MAX => {
            errors.push(field, format!("must not exceed {}", Cents::MAX));
            None
        }
        Ok(amount) => Some(amount),
        Err(e) => {
            errors.push(field, e.to_string());
            None
        }
    }
}

/// Calendar date as `YYYY-MM-DD`, or the date part of a timestamp.
pub(crate) fn optional_date(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<String>,
) -> Option<NaiveDate> {
    let text = optional_text(value)?;
    let date_part = text.get(..10).unwrap_or(&text);
    match NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.push(field, "must be a date formatted YYYY-MM-DD");
            None
        }
    }
}

/// RFC 3339 timestamp. Offset-less local forms (`2026-03-02T09:30`) and
/// bare dates are read as UTC.
pub(crate) fn optional_timestamp(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<String>,
) -> Option<DateTime<Utc>> {
    let text = optional_text(value)?;
    match parse_timestamp(&text) {
        Some(ts) => Some(ts),
        None => {
            errors.push(field, "must be an ISO 8601 date-time");
            None
        }
    }
}

pub(crate) fn required_timestamp(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<String>,
) -> Option<DateTime<Utc>> {
    if optional_text(value.clone()).is_none() {
        errors.push(field, "is required");
        return None;
    }
    optional_timestamp(errors, field, value)
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
