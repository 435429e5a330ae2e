//! Task form validation.

use chrono::NaiveDate;
use serde::Deserialize;

use super::{enum_or_default, optional_date, optional_text, required_text, ValidationErrors, ValidationResult};
use crate::models::{Task, TaskStatus};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskInput {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskFields {
    pub id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub due_date: Option<NaiveDate>,
}

impl TaskFields {
    pub fn into_task(self) -> Task {
        let mut task = Task::new(self.title.clone());
        self.apply_to(&mut task);
        task
    }

    pub fn apply_to(self, task: &mut Task) {
        task.title = self.title;
        task.description = self.description;
        task.status = self.status;
        task.due_date = self.due_date;
    }
}

pub fn validate_task(input: TaskInput) -> ValidationResult<TaskFields> {
    let mut errors = ValidationErrors::new();

    let fields = TaskFields {
        id: optional_text(input.id),
        title: required_text(&mut errors, "title", input.title, 3),
        description: optional_text(input.description),
        status: enum_or_default(&mut errors, "status", input.status, TaskStatus::default()),
        due_date: optional_date(&mut errors, "dueDate", input.due_date),
    };

    errors.into_result(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_defaults() {
        let fields = validate_task(TaskInput {
            title: Some("  Repor luvas ".into()),
            description: Some("".into()),
            due_date: Some("2026-03-10".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(fields.title, "Repor luvas");
        assert_eq!(fields.description, None);
        assert_eq!(fields.status, TaskStatus::Pending);
        assert_eq!(fields.due_date, NaiveDate::from_ymd_opt(2026, 3, 10));
    }

    #[test]
    fn test_task_rejects_bad_fields() {
        let errors = validate_task(TaskInput {
            title: Some("ok".into()),
            status: Some("LATER".into()),
            due_date: Some("10/03/2026".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(errors.has("title"));
        assert!(errors.has("status"));
        assert!(errors.has("dueDate"));
    }
}
