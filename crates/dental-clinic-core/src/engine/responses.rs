//! Recording a filled anamnesis questionnaire.

use std::collections::HashSet;

use rusqlite::Connection;
use tracing::info;

use super::{ensure_actor, ensure_patient, EngineError, EngineResult};
use crate::db::{self, Database};
use crate::models::{
    new_id, timestamp_now, Actor, AnamnesisAnswer, AnamnesisResponseSet, AnamnesisTemplate,
    AnswerValue,
};
use crate::validation::{AnswerFields, ResponseFields, ValidationErrors};

/// Create a response set and all of its answers in one transaction.
///
/// Answers are checked against the template's stored questions: each must
/// reference a question of that template, at most once, with a value of
/// the question's type. Every required question must be answered.
pub fn record_response(
    db: &mut Database,
    actor: &Actor,
    fields: ResponseFields,
) -> EngineResult<AnamnesisResponseSet> {
    let set = db.immediate_transaction(|conn| record_in_transaction(conn, actor, fields))?;
    info!(response_set_id = %set.id, patient_id = %set.patient_id, "Recorded anamnesis response");
    Ok(set)
}

fn record_in_transaction(
    conn: &Connection,
    actor: &Actor,
    fields: ResponseFields,
) -> EngineResult<AnamnesisResponseSet> {
    ensure_actor(conn, actor)?;
    ensure_patient(conn, &fields.patient_id)?;

    let template = db::get_template(conn, &fields.template_id)?
        .ok_or_else(|| EngineError::NotFound(format!("template {}", fields.template_id)))?;

    if let Some(appointment_id) = &fields.appointment_id {
        if !db::appointment_belongs_to(conn, appointment_id, &fields.patient_id)? {
            return Err(EngineError::NotFound(format!("appointment {}", appointment_id)));
        }
    }

    check_answers(&template, &fields.answers)?;

    let now = timestamp_now();
    let set = AnamnesisResponseSet {
        id: new_id(),
        template_id: template.id,
        patient_id: fields.patient_id,
        appointment_id: fields.appointment_id,
        filled_by_id: actor.user_id.clone(),
        payment_status: fields.payment_status,
        amount_due: fields.amount_due,
        amount_paid: fields.amount_paid,
        notes: fields.notes,
        status: fields.status,
        version: 1,
        filled_at: now,
        updated_at: now,
    };
    db::insert_response_set(conn, &set)?;

    let answers: Vec<AnamnesisAnswer> = fields
        .answers
        .into_iter()
        .map(|answer| AnamnesisAnswer {
            id: new_id(),
            response_set_id: set.id.clone(),
            question_id: answer.question_id,
            value: answer.value,
            created_at: now,
        })
        .collect();
    db::insert_answers(conn, &answers)?;

    Ok(set)
}

/// Check answers against the template's questions, collecting every failure.
pub fn check_answers(template: &AnamnesisTemplate, answers: &[AnswerFields]) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let mut answered = HashSet::new();

    for (index, answer) in answers.iter().enumerate() {
        let field = |name: &str| format!("answers[{}].{}", index, name);

        let Some(question) = template.question(&answer.question_id) else {
            errors.push(field("questionId"), "question does not belong to this template");
            continue;
        };
        if !answered.insert(question.id.as_str()) {
            errors.push(field("questionId"), "question answered more than once");
            continue;
        }

        if answer.value.question_type() != question.question_type {
            errors.push(field("value"), format!("expected a {} answer", question.question_type));
            continue;
        }
        if let AnswerValue::Choices(chosen) = &answer.value {
            for option in chosen {
                if !question.options.contains(option) {
                    errors.push(field("value"), format!("unknown option: {}", option));
                }
            }
        }
    }

    for question in template.questions.iter().filter(|q| q.is_required) {
        if !answered.contains(question.id.as_str()) {
            errors.push(
                "answers",
                format!("required question not answered: {}", question.question),
            );
        }
    }

    errors.into_result(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AnamnesisQuestion, Appointment, Patient, PaymentStatus, QuestionType, ResponseStatus, User,
        UserRole,
    };
    use chrono::Duration;

    struct Fixture {
        db: Database,
        actor: Actor,
        patient: Patient,
        template: AnamnesisTemplate,
    }

    fn setup() -> Fixture {
        let mut db = Database::open_in_memory().unwrap();
        let user = User::new("Dra. Ana".into(), "ana@clinic.test".into(), UserRole::Provider);
        db.insert_user(&user).unwrap();
        let patient = Patient::new("Maria".into(), "Lima".into());
        db.insert_patient(&patient).unwrap();

        let now = timestamp_now();
        let id = new_id();
        let mut smokes = AnamnesisQuestion::new(id.clone(), "Fuma?".into(), QuestionType::Boolean, 0);
        smokes.is_required = true;
        let mut brush = AnamnesisQuestion::new(id.clone(), "Tipo de escova".into(), QuestionType::MultipleChoice, 1);
        brush.options = vec!["Macia".into(), "Média".into(), "Dura".into()];
        let weight = AnamnesisQuestion::new(id.clone(), "Peso (kg)".into(), QuestionType::Number, 2);
        let template = AnamnesisTemplate {
            id,
            name: "Anamnese geral".into(),
            description: None,
            category: None,
            is_default: true,
            created_at: now,
            updated_at: now,
            questions: vec![smokes, brush, weight],
        };
        db.create_template(&template).unwrap();

        Fixture {
            db,
            actor: Actor::from(&user),
            patient,
            template,
        }
    }

    fn answer(question: &AnamnesisQuestion, value: AnswerValue) -> AnswerFields {
        AnswerFields {
            question_id: question.id.clone(),
            value,
        }
    }

    fn response(f: &Fixture, answers: Vec<AnswerFields>) -> ResponseFields {
        ResponseFields {
            template_id: f.template.id.clone(),
            patient_id: f.patient.id.clone(),
            appointment_id: None,
            payment_status: PaymentStatus::Unpaid,
            amount_due: None,
            amount_paid: None,
            notes: None,
            status: ResponseStatus::Open,
            answers,
        }
    }

    #[test]
    fn test_records_set_and_answers() {
        let mut f = setup();
        let actor = f.actor.clone();
        let q = f.template.questions.clone();
        let fields = response(
            &f,
            vec![
                answer(&q[0], AnswerValue::Boolean(false)),
                answer(&q[1], AnswerValue::Choices(vec!["Macia".into()])),
                answer(&q[2], AnswerValue::Number(70.5)),
            ],
        );
        let set = record_response(&mut f.db, &actor, fields).unwrap();

        assert_eq!(set.filled_by_id, actor.user_id);
        let answers = f.db.list_answers(&set.id).unwrap();
        assert_eq!(answers.len(), 3);
        assert_eq!(answers[2].value, AnswerValue::Number(70.5));
    }

    #[test]
    fn test_rejects_nonconforming_answers() {
        let f = setup();
        let q = &f.template.questions;
        let err = check_answers(
            &f.template,
            &[
                answer(&q[1], AnswerValue::Choices(vec!["Elétrica".into()])),
                answer(&q[2], AnswerValue::Text("setenta".into())),
                AnswerFields {
                    question_id: "foreign".into(),
                    value: AnswerValue::Boolean(true),
                },
            ],
        )
        .unwrap_err();

        assert!(err.has("answers[0].value"));
        assert!(err.has("answers[1].value"));
        assert!(err.has("answers[2].questionId"));
        // "Fuma?" is required and missing
        assert!(err.has("answers"));
    }

    #[test]
    fn test_rejects_duplicate_answers() {
        let f = setup();
        let q = &f.template.questions;
        let err = check_answers(
            &f.template,
            &[
                answer(&q[0], AnswerValue::Boolean(true)),
                answer(&q[0], AnswerValue::Boolean(false)),
            ],
        )
        .unwrap_err();
        assert!(err.has("answers[1].questionId"));
    }

    #[test]
    fn test_invalid_answers_write_nothing() {
        let mut f = setup();
        let actor = f.actor.clone();
        let q = f.template.questions.clone();
        let fields = response(&f, vec![answer(&q[2], AnswerValue::Number(60.0))]);
        let err = record_response(&mut f.db, &actor, fields).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert!(f.db.list_response_sets_for_patient(&f.patient.id).unwrap().is_empty());
    }

    #[test]
    fn test_appointment_must_belong_to_patient() {
        let mut f = setup();
        let actor = f.actor.clone();
        let other = Patient::new("João".into(), "Souza".into());
        f.db.insert_patient(&other).unwrap();
        let start = timestamp_now();
        let appointment = Appointment::new(
            other.id.clone(),
            actor.user_id.clone(),
            "Avaliação".into(),
            start,
            start + Duration::minutes(30),
        );
        f.db.insert_appointment(&appointment).unwrap();

        let q = f.template.questions.clone();
        let mut fields = response(&f, vec![answer(&q[0], AnswerValue::Boolean(true))]);
        fields.appointment_id = Some(appointment.id);
        assert!(matches!(
            record_response(&mut f.db, &actor, fields),
            Err(EngineError::NotFound(_))
        ));
    }
}
