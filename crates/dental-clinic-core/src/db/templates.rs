//! Anamnesis template database operations.

use std::collections::HashSet;

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use super::{classify, enum_from_sql, ts_from_sql, ts_to_sql, Database, DbError, DbResult};
use crate::models::{timestamp_now, AnamnesisQuestion, AnamnesisTemplate};

/// Result of appending questions to an existing template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendOutcome {
    pub added: usize,
    /// Questions whose text the template already had
    pub skipped: usize,
}

impl Database {
    /// Insert a template and all its questions atomically.
    pub fn create_template(&mut self, template: &AnamnesisTemplate) -> DbResult<()> {
        self.immediate_transaction(|conn| insert_template(conn, template))
    }

    pub fn get_template(&self, id: &str) -> DbResult<Option<AnamnesisTemplate>> {
        get_template(&self.conn, id)
    }

    /// All templates with their questions, newest first.
    pub fn list_templates(&self) -> DbResult<Vec<AnamnesisTemplate>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, name, description, category, is_default, created_at, updated_at
            FROM anamnesis_templates
            ORDER BY created_at DESC
            "#,
        )?;
        let rows = stmt.query_map([], read_template_row)?;

        let mut templates = Vec::new();
        for row in rows {
            let mut template: AnamnesisTemplate = row?.try_into()?;
            template.questions = list_questions(&self.conn, &template.id)?;
            templates.push(template);
        }
        Ok(templates)
    }

    /// Append questions after the existing ones, skipping any whose text
    /// (trimmed, ignoring case) the template already has. New questions
    /// are numbered after the current question count.
    pub fn append_template_questions(
        &mut self,
        template_id: &str,
        questions: &[AnamnesisQuestion],
    ) -> DbResult<AppendOutcome> {
        self.immediate_transaction(|conn| {
            if !template_exists(conn, template_id)? {
                return Err(DbError::NotFound(format!("template {}", template_id)));
            }
            let existing = list_questions(conn, template_id)?;
            let mut seen: HashSet<String> = existing.iter().map(|q| question_key(&q.question)).collect();
            let start_order = existing.len() as i64;

            let mut added = 0;
            for question in questions {
                if !seen.insert(question_key(&question.question)) {
                    continue;
                }
                let mut question = question.clone();
                question.template_id = template_id.to_string();
                question.order = start_order + added as i64;
                insert_question(conn, &question)?;
                added += 1;
            }

            conn.execute(
                "UPDATE anamnesis_templates SET updated_at = ?2 WHERE id = ?1",
                params![template_id, ts_to_sql(&timestamp_now())],
            )?;

            Ok(AppendOutcome {
                added,
                skipped: questions.len() - added,
            })
        })
    }
}

fn question_key(text: &str) -> String {
    text.trim().to_lowercase()
}

pub(crate) fn insert_template(conn: &Connection, template: &AnamnesisTemplate) -> DbResult<()> {
    conn.execute(
        r#"
        INSERT INTO anamnesis_templates (
            id, name, description, category, is_default, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            template.id,
            template.name,
            template.description,
            template.category,
            template.is_default,
            ts_to_sql(&template.created_at),
            ts_to_sql(&template.updated_at),
        ],
    )
    .map_err(classify)?;

    for question in &template.questions {
        insert_question(conn, question)?;
    }
    Ok(())
}

fn insert_question(conn: &Connection, question: &AnamnesisQuestion) -> DbResult<()> {
    let options = serde_json::to_string(&question.options)?;
    conn.execute(
        r#"
        INSERT INTO anamnesis_questions (
            id, template_id, question, type, helper_text, alert_label,
            alert_level, sort_order, is_required, options
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
        params![
            question.id,
            question.template_id,
            question.question,
            question.question_type.as_str(),
            question.helper_text,
            question.alert_label,
            question.alert_level.as_str(),
            question.order,
            question.is_required,
            options,
        ],
    )
    .map_err(classify)?;
    Ok(())
}

pub(crate) fn template_exists(conn: &Connection, id: &str) -> DbResult<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM anamnesis_templates WHERE id = ?", [id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

pub(crate) fn get_template(conn: &Connection, id: &str) -> DbResult<Option<AnamnesisTemplate>> {
    let row = conn
        .query_row(
            r#"
            SELECT id, name, description, category, is_default, created_at, updated_at
            FROM anamnesis_templates
            WHERE id = ?
            "#,
            [id],
            read_template_row,
        )
        .optional()?;

    let Some(row) = row else {
        return Ok(None);
    };
    let mut template: AnamnesisTemplate = row.try_into()?;
    template.questions = list_questions(conn, &template.id)?;
    Ok(Some(template))
}

fn list_questions(conn: &Connection, template_id: &str) -> DbResult<Vec<AnamnesisQuestion>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id, template_id, question, type, helper_text, alert_label,
               alert_level, sort_order, is_required, options
        FROM anamnesis_questions
        WHERE template_id = ?
        ORDER BY sort_order ASC, rowid ASC
        "#,
    )?;
    let rows = stmt.query_map([template_id], |row| {
        Ok(QuestionRow {
            id: row.get(0)?,
            template_id: row.get(1)?,
            question: row.get(2)?,
            question_type: row.get(3)?,
            helper_text: row.get(4)?,
            alert_label: row.get(5)?,
            alert_level: row.get(6)?,
            order: row.get(7)?,
            is_required: row.get(8)?,
            options: row.get(9)?,
        })
    })?;

    let mut questions = Vec::new();
    for row in rows {
        questions.push(row?.try_into()?);
    }
    Ok(questions)
}

/// Intermediate row struct for database mapping.
struct TemplateRow {
    id: String,
    name: String,
    description: Option<String>,
    category: Option<String>,
    is_default: bool,
    created_at: String,
    updated_at: String,
}

fn read_template_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TemplateRow> {
    Ok(TemplateRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        is_default: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

impl TryFrom<TemplateRow> for AnamnesisTemplate {
    type Error = DbError;

    fn try_from(row: TemplateRow) -> Result<Self, Self::Error> {
        Ok(AnamnesisTemplate {
            id: row.id,
            name: row.name,
            description: row.description,
            category: row.category,
            is_default: row.is_default,
            created_at: ts_from_sql(&row.created_at)?,
            updated_at: ts_from_sql(&row.updated_at)?,
            questions: Vec::new(),
        })
    }
}

struct QuestionRow {
    id: String,
    template_id: String,
    question: String,
    question_type: String,
    helper_text: Option<String>,
    alert_label: Option<String>,
    alert_level: String,
    order: i64,
    is_required: bool,
    options: String,
}

impl TryFrom<QuestionRow> for AnamnesisQuestion {
    type Error = DbError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        Ok(AnamnesisQuestion {
            id: row.id,
            template_id: row.template_id,
            question: row.question,
            question_type: enum_from_sql(&row.question_type)?,
            helper_text: row.helper_text,
            alert_label: row.alert_label,
            alert_level: enum_from_sql(&row.alert_level)?,
            order: row.order,
            is_required: row.is_required,
            options: serde_json::from_str(&row.options)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{new_id, AlertLevel, QuestionType};

    fn new_question(template_id: &str, text: &str, kind: QuestionType, order: i64) -> AnamnesisQuestion {
        AnamnesisQuestion::new(template_id.to_string(), text.to_string(), kind, order)
    }

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn template(name: &str, questions: &[(&str, QuestionType)]) -> AnamnesisTemplate {
        let now = timestamp_now();
        let id = new_id();
        AnamnesisTemplate {
            questions: questions
                .iter()
                .enumerate()
                .map(|(i, (text, kind))| new_question(&id, text, *kind, i as i64))
                .collect(),
            id,
            name: name.into(),
            description: None,
            category: Some("Geral".into()),
            is_default: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_create_and_get_template() {
        let mut db = setup_db();
        let mut t = template(
            "Anamnese Odontológica",
            &[("Fuma?", QuestionType::Boolean), ("Alergias?", QuestionType::Text)],
        );
        t.questions[0].alert_level = AlertLevel::Info;
        db.create_template(&t).unwrap();

        let loaded = db.get_template(&t.id).unwrap().unwrap();
        assert_eq!(loaded, t);
        assert_eq!(db.list_templates().unwrap().len(), 1);
        assert!(db.get_template("missing").unwrap().is_none());
    }

    #[test]
    fn test_choice_options_persist() {
        let mut db = setup_db();
        let mut t = template("Hábitos", &[("Tipo de escova", QuestionType::MultipleChoice)]);
        t.questions[0].options = vec!["Macia".into(), "Média".into()];
        db.create_template(&t).unwrap();
        let loaded = db.get_template(&t.id).unwrap().unwrap();
        assert_eq!(loaded.questions[0].options, vec!["Macia".to_string(), "Média".to_string()]);
    }

    #[test]
    fn test_create_template_is_atomic() {
        let mut db = setup_db();
        let mut t = template("Geral", &[("Fuma?", QuestionType::Boolean), ("Bebe?", QuestionType::Boolean)]);
        // Same id twice: the second question insert fails
        t.questions[1].id = t.questions[0].id.clone();
        assert!(db.create_template(&t).is_err());
        assert!(db.get_template(&t.id).unwrap().is_none());
    }

    #[test]
    fn test_append_skips_existing_text() {
        let mut db = setup_db();
        let t = template("Geral", &[("Fuma?", QuestionType::Boolean)]);
        db.create_template(&t).unwrap();

        let incoming = vec![
            new_question("", "  fuma? ", QuestionType::Boolean, 0),
            new_question("", "Usa fio dental regularmente?", QuestionType::Boolean, 0),
            new_question("", "USA FIO DENTAL REGULARMENTE?", QuestionType::Boolean, 0),
            new_question("", "Escova os dentes quantas vezes ao dia?", QuestionType::Number, 0),
        ];
        let outcome = db.append_template_questions(&t.id, &incoming).unwrap();
        assert_eq!(outcome, AppendOutcome { added: 2, skipped: 2 });

        let loaded = db.get_template(&t.id).unwrap().unwrap();
        let orders: Vec<i64> = loaded.questions.iter().map(|q| q.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert_eq!(loaded.questions[2].question_type, QuestionType::Number);

        // Running again adds nothing
        let outcome = db.append_template_questions(&t.id, &incoming).unwrap();
        assert_eq!(outcome.added, 0);
    }

    #[test]
    fn test_append_to_missing_template() {
        let mut db = setup_db();
        let err = db
            .append_template_questions("nope", &[new_question("", "Fuma?", QuestionType::Boolean, 0)])
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
    }
}
