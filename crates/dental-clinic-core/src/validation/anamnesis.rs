//! Anamnesis template and response validation.

use serde::Deserialize;

use super::{
    enum_or_default, optional_amount, optional_number, optional_text, required_enum,
    required_text, NumberInput, ValidationErrors, ValidationResult,
};
use crate::models::{
    timestamp_now, AlertLevel, AnamnesisQuestion, AnamnesisTemplate, AnswerValue, Cents,
    PaymentStatus, QuestionType, ResponseStatus,
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplateInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub is_default: Option<bool>,
    pub questions: Vec<QuestionInput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuestionInput {
    pub question: Option<String>,
    #[serde(rename = "type")]
    pub question_type: Option<String>,
    pub helper_text: Option<String>,
    pub alert_label: Option<String>,
    pub alert_level: Option<String>,
    pub order: Option<i64>,
    pub is_required: Option<bool>,
    pub options: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateFields {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub is_default: bool,
    pub questions: Vec<QuestionFields>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuestionFields {
    pub question: String,
    pub question_type: QuestionType,
    pub helper_text: Option<String>,
    pub alert_label: Option<String>,
    pub alert_level: AlertLevel,
    pub order: i64,
    pub is_required: bool,
    pub options: Vec<String>,
}

impl TemplateFields {
    pub fn into_template(self) -> AnamnesisTemplate {
        let now = timestamp_now();
        let id = crate::models::new_id();
        AnamnesisTemplate {
            questions: self
                .questions
                .into_iter()
                .map(|q| q.into_question(&id))
                .collect(),
            id,
            name: self.name,
            description: self.description,
            category: self.category,
            is_default: self.is_default,
            created_at: now,
            updated_at: now,
        }
    }
}

impl QuestionFields {
    pub fn into_question(self, template_id: &str) -> AnamnesisQuestion {
        let mut question = AnamnesisQuestion::new(
            template_id.to_string(),
            self.question,
            self.question_type,
            self.order,
        );
        question.helper_text = self.helper_text;
        question.alert_label = self.alert_label;
        question.alert_level = self.alert_level;
        question.is_required = self.is_required;
        question.options = self.options;
        question
    }
}

pub fn validate_template(input: TemplateInput) -> ValidationResult<TemplateFields> {
    let mut errors = ValidationErrors::new();

    let name = required_text(&mut errors, "name", input.name, 3);
    if input.questions.is_empty() {
        errors.push("questions", "must contain at least one question");
    }
    let questions = collect_questions(&mut errors, input.questions);

    let fields = TemplateFields {
        name,
        description: optional_text(input.description),
        category: optional_text(input.category),
        is_default: input.is_default.unwrap_or(false),
        questions,
    };

    errors.into_result(fields)
}

/// Validate a batch of questions on its own, e.g. to append to a template.
pub fn validate_questions(questions: Vec<QuestionInput>) -> ValidationResult<Vec<QuestionFields>> {
    let mut errors = ValidationErrors::new();
    if questions.is_empty() {
        errors.push("questions", "must contain at least one question");
    }
    let fields = collect_questions(&mut errors, questions);
    errors.into_result(fields)
}

fn collect_questions(errors: &mut ValidationErrors, questions: Vec<QuestionInput>) -> Vec<QuestionFields> {
    questions
        .into_iter()
        .enumerate()
        .filter_map(|(index, q)| validate_question(errors, index, q))
        .collect()
}

fn validate_question(
    errors: &mut ValidationErrors,
    index: usize,
    input: QuestionInput,
) -> Option<QuestionFields> {
    let field = |name: &str| format!("questions[{}].{}", index, name);
    let before = errors.errors.len();

    let question = required_text(errors, &field("question"), input.question, 3);
    let question_type: Option<QuestionType> =
        required_enum(errors, &field("type"), input.question_type);
    let alert_level = enum_or_default(errors, &field("alertLevel"), input.alert_level, AlertLevel::None);

    let options: Vec<String> = input
        .options
        .unwrap_or_default()
        .into_iter()
        .filter_map(|o| optional_text(Some(o)))
        .collect();

    match question_type {
        Some(QuestionType::MultipleChoice) if options.is_empty() => {
            errors.push(field("options"), "multiple-choice questions need at least one option");
        }
        Some(t) if t != QuestionType::MultipleChoice && !options.is_empty() => {
            errors.push(field("options"), "only multiple-choice questions take options");
        }
        _ => {}
    }

    if errors.errors.len() > before {
        return None;
    }

    Some(QuestionFields {
        question,
        question_type: question_type?,
        helper_text: optional_text(input.helper_text),
        alert_label: optional_text(input.alert_label),
        alert_level,
        order: input.order.unwrap_or(index as i64),
        is_required: input.is_required.unwrap_or(false),
        options,
    })
}

/// A filled questionnaire, as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResponseInput {
    pub template_id: Option<String>,
    pub patient_id: Option<String>,
    pub appointment_id: Option<String>,
    pub payment_status: Option<String>,
    pub amount_due: Option<String>,
    pub amount_paid: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,
    pub answers: Vec<AnswerInput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnswerInput {
    pub question_id: Option<String>,
    pub value_text: Option<String>,
    pub value_boolean: Option<bool>,
    pub value_number: Option<NumberInput>,
    pub value_options: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseFields {
    pub template_id: String,
    pub patient_id: String,
    pub appointment_id: Option<String>,
    pub payment_status: PaymentStatus,
    pub amount_due: Option<Cents>,
    pub amount_paid: Option<Cents>,
    pub notes: Option<String>,
    pub status: ResponseStatus,
    pub answers: Vec<AnswerFields>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnswerFields {
    pub question_id: String,
    pub value: AnswerValue,
}

pub fn validate_response(input: ResponseInput) -> ValidationResult<ResponseFields> {
    let mut errors = ValidationErrors::new();

    let template_id = required_text(&mut errors, "templateId", input.template_id, 1);
    let patient_id = required_text(&mut errors, "patientId", input.patient_id, 1);
    let payment_status = enum_or_default(
        &mut errors,
        "paymentStatus",
        input.payment_status,
        PaymentStatus::default(),
    );
    let status = enum_or_default(&mut errors, "status", input.status, ResponseStatus::default());
    let amount_due = optional_amount(&mut errors, "amountDue", input.amount_due);
    let amount_paid = optional_amount(&mut errors, "amountPaid", input.amount_paid);

    if input.answers.is_empty() {
        errors.push("answers", "must contain at least one answer");
    }

    let answers = input
        .answers
        .into_iter()
        .enumerate()
        .filter_map(|(index, answer)| validate_answer(&mut errors, index, answer))
        .collect();

    let fields = ResponseFields {
        template_id,
        patient_id,
        appointment_id: optional_text(input.appointment_id),
        payment_status,
        amount_due,
        amount_paid,
        notes: optional_text(input.notes),
        status,
        answers,
    };

    errors.into_result(fields)
}

fn validate_answer(
    errors: &mut ValidationErrors,
    index: usize,
    input: AnswerInput,
) -> Option<AnswerFields> {
    let field = |name: &str| format!("answers[{}].{}", index, name);
    let question_id = required_text(errors, &field("questionId"), input.question_id, 1);

    let number = optional_number(errors, &field("valueNumber"), input.value_number);
    let mut values = Vec::new();
    if let Some(text) = optional_text(input.value_text) {
        values.push(AnswerValue::Text(text));
    }
    if let Some(flag) = input.value_boolean {
        values.push(AnswerValue::Boolean(flag));
    }
    if let Some(n) = number {
        values.push(AnswerValue::Number(n));
    }
    if let Some(options) = input.value_options.filter(|o| !o.is_empty()) {
        values.push(AnswerValue::Choices(options));
    }

    if values.len() != 1 {
        errors.push(field("value"), "exactly one value kind must be provided");
        return None;
    }
    if question_id.is_empty() {
        return None;
    }

    values.pop().map(|value| AnswerFields { question_id, value })
}
