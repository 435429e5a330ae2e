//! Anamnesis templates, questions, response sets and answers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Cents, PaymentStatus};

text_enum! {
    pub enum QuestionType {
        Text => "TEXT",
        Boolean => "BOOLEAN",
        Number => "NUMBER",
        MultipleChoice => "MULTIPLE_CHOICE",
    }
}

text_enum! {
    /// How prominently an answer should be flagged to the clinician.
    pub enum AlertLevel {
        None => "NONE",
        Info => "INFO",
        Warning => "WARNING",
        Critical => "CRITICAL",
    }
}

impl Default for AlertLevel {
    fn default() -> Self {
        AlertLevel::None
    }
}

text_enum! {
    pub enum ResponseStatus {
        Open => "OPEN",
        Finalized => "FINALIZED",
    }
}

impl Default for ResponseStatus {
    fn default() -> Self {
        ResponseStatus::Open
    }
}

/// A reusable questionnaire. Question ids and order stay stable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnamnesisTemplate {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Sorted by `order`
    pub questions: Vec<AnamnesisQuestion>,
}

impl AnamnesisTemplate {
    pub fn question(&self, question_id: &str) -> Option<&AnamnesisQuestion> {
        self.questions.iter().find(|q| q.id == question_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnamnesisQuestion {
    pub id: String,
    pub template_id: String,
    pub question: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub helper_text: Option<String>,
    pub alert_label: Option<String>,
    pub alert_level: AlertLevel,
    pub order: i64,
    pub is_required: bool,
    /// Only populated for multiple-choice questions
    pub options: Vec<String>,
}

impl AnamnesisQuestion {
    pub fn new(template_id: String, question: String, question_type: QuestionType, order: i64) -> Self {
        Self {
            id: super::new_id(),
            template_id,
            question,
            question_type,
            helper_text: None,
            alert_label: None,
            alert_level: AlertLevel::default(),
            order,
            is_required: false,
            options: Vec::new(),
        }
    }
}

/// One filled instance of a template for one patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnamnesisResponseSet {
    pub id: String,
    pub template_id: String,
    pub patient_id: String,
    pub appointment_id: Option<String>,
    pub filled_by_id: String,
    pub payment_status: PaymentStatus,
    pub amount_due: Option<Cents>,
    pub amount_paid: Option<Cents>,
    pub notes: Option<String>,
    pub status: ResponseStatus,
    /// Incremented on every save of the set or its odontogram
    pub version: i64,
    pub filled_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The value of one answer. Exactly one kind per answer, matching the
/// question's declared type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnswerValue {
    Text(String),
    Boolean(bool),
    Number(f64),
    Choices(Vec<String>),
}

impl AnswerValue {
    /// The question type this value answers.
    pub fn question_type(&self) -> QuestionType {
        match self {
            AnswerValue::Text(_) => QuestionType::Text,
            AnswerValue::Boolean(_) => QuestionType::Boolean,
            AnswerValue::Number(_) => QuestionType::Number,
            AnswerValue::Choices(_) => QuestionType::MultipleChoice,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnamnesisAnswer {
    pub id: String,
    pub response_set_id: String,
    pub question_id: String,
    pub value: AnswerValue,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_value_kind() {
        assert_eq!(AnswerValue::Text("x".into()).question_type(), QuestionType::Text);
        assert_eq!(
            AnswerValue::Choices(vec!["a".into()]).question_type(),
            QuestionType::MultipleChoice
        );
    }

    #[test]
    fn test_answer_value_json_shape() {
        let json = serde_json::to_value(AnswerValue::Boolean(true)).unwrap();
        assert_eq!(json["kind"], "BOOLEAN");
        assert_eq!(json["value"], true);
    }
}
