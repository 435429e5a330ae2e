//! Questionnaire and tooth-chart actions.

use tracing::info;

use super::{authorize, patient_path, Clinic, ClinicResult, ANAMNESIS_PATH, DASHBOARD_PATH};
use crate::db::AppendOutcome;
use crate::engine::{self, SaveOutcome};
use crate::models::{Actor, AnamnesisQuestion, AnamnesisResponseSet, AnamnesisTemplate};
use crate::validation::{
    validate_odontogram, validate_questions, validate_response, validate_template,
    OdontogramPayload, QuestionInput, ResponseInput, TemplateInput,
};

impl Clinic {
    /// Create a questionnaire template with its questions.
    pub fn create_template(
        &self,
        actor: Option<&Actor>,
        input: TemplateInput,
    ) -> ClinicResult<AnamnesisTemplate> {
        let mut db = self.lock();
        authorize(&db, actor)?;
        let template = validate_template(input)?.into_template();
        db.create_template(&template)?;
        drop(db);

        info!(template_id = %template.id, questions = template.questions.len(), "Template created");
        self.invalidate(&[ANAMNESIS_PATH]);
        Ok(template)
    }

    /// Add questions to an existing template. Questions whose text the
    /// template already has are skipped.
    pub fn append_template_questions(
        &self,
        actor: Option<&Actor>,
        template_id: &str,
        questions: Vec<QuestionInput>,
    ) -> ClinicResult<AppendOutcome> {
        let mut db = self.lock();
        authorize(&db, actor)?;
        let questions: Vec<AnamnesisQuestion> = validate_questions(questions)?
            .into_iter()
            .map(|q| q.into_question(template_id))
            .collect();
        let outcome = db.append_template_questions(template_id, &questions)?;
        drop(db);

        info!(template_id, added = outcome.added, skipped = outcome.skipped, "Template questions appended");
        self.invalidate(&[ANAMNESIS_PATH]);
        Ok(outcome)
    }

    /// Record a filled questionnaire for a patient.
    pub fn record_response(
        &self,
        actor: Option<&Actor>,
        input: ResponseInput,
    ) -> ClinicResult<AnamnesisResponseSet> {
        let mut db = self.lock();
        let actor = authorize(&db, actor)?;
        let fields = validate_response(input)?;
        let set = engine::record_response(&mut db, actor, fields)?;
        drop(db);

        self.invalidate(&[
            ANAMNESIS_PATH.to_string(),
            patient_path(&set.patient_id),
            DASHBOARD_PATH.to_string(),
        ]);
        Ok(set)
    }

    /// Create or update a response set's tooth chart, replacing its entries.
    pub fn save_odontogram(
        &self,
        actor: Option<&Actor>,
        payload: OdontogramPayload,
    ) -> ClinicResult<SaveOutcome> {
        let mut db = self.lock();
        let actor = authorize(&db, actor)?;
        let save = validate_odontogram(payload)?;
        let patient_id = save.patient_id.clone();
        let outcome = engine::save_response(&mut db, actor, save)?;
        drop(db);

        self.invalidate(&[patient_path(&patient_id), ANAMNESIS_PATH.to_string()]);
        Ok(outcome)
    }
}
