//! Financial transaction form validation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use super::{
    enum_or_default, optional_amount, optional_date, optional_text, optional_timestamp,
    required_enum, required_text, ValidationErrors, ValidationResult,
};
use crate::models::{Cents, FinancialTransaction, TransactionStatus, TransactionType};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransactionInput {
    pub id: Option<String>,
    pub patient_id: Option<String>,
    pub appointment_id: Option<String>,
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub amount: Option<String>,
    pub due_date: Option<String>,
    pub paid_at: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionFields {
    pub id: Option<String>,
    pub patient_id: Option<String>,
    pub appointment_id: Option<String>,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub category: String,
    pub description: Option<String>,
    pub amount: Cents,
    pub due_date: Option<NaiveDate>,
    pub paid_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl TransactionFields {
    pub fn into_transaction(self) -> FinancialTransaction {
        let mut tx =
            FinancialTransaction::new(self.transaction_type, self.category.clone(), self.amount);
        self.apply_to(&mut tx);
        tx
    }

    pub fn apply_to(self, tx: &mut FinancialTransaction) {
        tx.patient_id = self.patient_id;
        tx.appointment_id = self.appointment_id;
        tx.transaction_type = self.transaction_type;
        tx.status = self.status;
        tx.category = self.category;
        tx.description = self.description;
        tx.amount = self.amount;
        tx.due_date = self.due_date;
        tx.paid_at = self.paid_at;
        tx.notes = self.notes;
    }
}

pub fn validate_transaction(input: TransactionInput) -> ValidationResult<TransactionFields> {
    let mut errors = ValidationErrors::new();

    let transaction_type = required_enum(&mut errors, "type", input.transaction_type);
    let status = enum_or_default(&mut errors, "status", input.status, TransactionStatus::default());
    let category = required_text(&mut errors, "category", input.category, 1);

    if optional_text(input.amount.clone()).is_none() {
        errors.push("amount", "is required");
    }
    let amount = optional_amount(&mut errors, "amount", input.amount);

    let due_date = optional_date(&mut errors, "dueDate", input.due_date);
    let paid_at = optional_timestamp(&mut errors, "paidAt", input.paid_at);

    let (Some(transaction_type), Some(amount)) = (transaction_type, amount) else {
        return Err(errors);
    };

    let fields = TransactionFields {
        id: optional_text(input.id),
        patient_id: optional_text(input.patient_id),
        appointment_id: optional_text(input.appointment_id),
        transaction_type,
        status,
        category,
        description: optional_text(input.description),
        amount,
        due_date,
        paid_at,
        notes: optional_text(input.notes),
    };

    errors.into_result(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transaction() {
        let fields = validate_transaction(TransactionInput {
            transaction_type: Some("INCOME".into()),
            category: Some("Consulta".into()),
            amount: Some("250,00".into()),
            patient_id: Some("".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(fields.transaction_type, TransactionType::Income);
        assert_eq!(fields.status, TransactionStatus::Pending);
        assert_eq!(fields.amount, Cents::from_units(250));
        assert_eq!(fields.patient_id, None);
    }

    #[test]
    fn test_missing_amount_and_type() {
        let errors = validate_transaction(TransactionInput {
            category: Some("Aluguel".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(errors.has("amount"));
        assert!(errors.has("type"));
        assert!(!errors.has("category"));
    }

    #[test]
    fn test_float_precision_amount_rejected() {
        let errors = validate_transaction(TransactionInput {
            transaction_type: Some("EXPENSE".into()),
            category: Some("Material".into()),
            amount: Some("10.999".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(errors.has("amount"));
    }

    #[test]
    fn test_oversized_amount_rejected() {
        let errors = validate_transaction(TransactionInput {
            transaction_type: Some("INCOME".into()),
            category: Some("Implantes".into()),
            amount: Some("90000000000000000".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(errors.has("amount"));
        assert_eq!(errors.errors.len(), 1);
    }
}
