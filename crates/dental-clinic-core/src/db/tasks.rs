//! Task database operations.

use rusqlite::{params, OptionalExtension};

use super::{
    classify, date_to_sql, enum_from_sql, opt_date_from_sql, ts_from_sql, ts_to_sql, Database,
    DbError, DbResult,
};
use crate::models::Task;

const TASK_COLUMNS: &str = "id, title, description, status, due_date, created_at, updated_at";

impl Database {
    pub fn insert_task(&self, task: &Task) -> DbResult<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO tasks (id, title, description, status, due_date, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    task.id,
                    task.title,
                    task.description,
                    task.status.as_str(),
                    task.due_date.as_ref().map(date_to_sql),
                    ts_to_sql(&task.created_at),
                    ts_to_sql(&task.updated_at),
                ],
            )
            .map_err(classify)?;
        Ok(())
    }

    pub fn update_task(&self, task: &Task) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute(
                r#"
                UPDATE tasks SET
                    title = ?2,
                    description = ?3,
                    status = ?4,
                    due_date = ?5,
                    updated_at = ?6
                WHERE id = ?1
                "#,
                params![
                    task.id,
                    task.title,
                    task.description,
                    task.status.as_str(),
                    task.due_date.as_ref().map(date_to_sql),
                    ts_to_sql(&task.updated_at),
                ],
            )
            .map_err(classify)?;
        Ok(rows_affected > 0)
    }

    pub fn get_task(&self, id: &str) -> DbResult<Option<Task>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM tasks WHERE id = ?", TASK_COLUMNS),
                [id],
                read_task_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    pub fn delete_task(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM tasks WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    /// Tasks not yet done, soonest due first; undated tasks go last.
    pub fn list_pending_tasks(&self, limit: usize) -> DbResult<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM tasks
             WHERE status <> 'DONE'
             ORDER BY due_date IS NULL, due_date ASC, created_at ASC
             LIMIT ?1",
            TASK_COLUMNS
        ))?;
        let rows = stmt.query_map(params![limit as i64], read_task_row)?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?.try_into()?);
        }
        Ok(tasks)
    }
}

/// Intermediate row struct for database mapping.
struct TaskRow {
    id: String,
    title: String,
    description: Option<String>,
    status: String,
    due_date: Option<String>,
    created_at: String,
    updated_at: String,
}

fn read_task_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TaskRow> {
    Ok(TaskRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        status: row.get(3)?,
        due_date: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

impl TryFrom<TaskRow> for Task {
    type Error = DbError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(Task {
            id: row.id,
            title: row.title,
            description: row.description,
            status: enum_from_sql(&row.status)?,
            due_date: opt_date_from_sql(row.due_date)?,
            created_at: ts_from_sql(&row.created_at)?,
            updated_at: ts_from_sql(&row.updated_at)?,
        })
    }
}
