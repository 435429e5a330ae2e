//! Clinic to-do actions.

use tracing::info;

use super::{authorize, Clinic, ClinicError, ClinicResult, DASHBOARD_PATH, TASKS_PATH};
use crate::models::{timestamp_now, Actor, Task};
use crate::validation::{validate_task, TaskInput};

impl Clinic {
    /// Create a task, or update it when the input carries an id.
    pub fn save_task(&self, actor: Option<&Actor>, input: TaskInput) -> ClinicResult<Task> {
        let db = self.lock();
        authorize(&db, actor)?;
        let fields = validate_task(input)?;

        let task = match fields.id.clone() {
            Some(id) => {
                let mut task = db
                    .get_task(&id)?
                    .ok_or_else(|| ClinicError::NotFound(format!("task {}", id)))?;
                fields.apply_to(&mut task);
                task.updated_at = timestamp_now();
                if !db.update_task(&task)? {
                    return Err(ClinicError::NotFound(format!("task {}", id)));
                }
                info!(task_id = %task.id, status = %task.status, "Task updated");
                task
            }
            None => {
                let task = fields.into_task();
                db.insert_task(&task)?;
                info!(task_id = %task.id, "Task created");
                task
            }
        };
        drop(db);

        self.invalidate(&[TASKS_PATH, DASHBOARD_PATH]);
        Ok(task)
    }

    pub fn delete_task(&self, actor: Option<&Actor>, task_id: &str) -> ClinicResult<()> {
        let db = self.lock();
        authorize(&db, actor)?;
        if !db.delete_task(task_id)? {
            return Err(ClinicError::NotFound(format!("task {}", task_id)));
        }
        drop(db);

        info!(task_id, "Task deleted");
        self.invalidate(&[TASKS_PATH, DASHBOARD_PATH]);
        Ok(())
    }
}
