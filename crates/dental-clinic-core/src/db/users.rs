//! User database operations.

use rusqlite::{params, Connection, OptionalExtension};

use super::{classify, enum_from_sql, ts_from_sql, ts_to_sql, Database, DbError, DbResult};
use crate::models::{User, UserRole};

const USER_COLUMNS: &str = "id, name, email, role, created_at";

impl Database {
    /// Insert a new user. A taken email yields `DbError::Duplicate`.
    pub fn insert_user(&self, user: &User) -> DbResult<()> {
        self.conn
            .execute(
                "INSERT INTO users (id, name, email, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    user.id,
                    user.name,
                    user.email,
                    user.role.as_str(),
                    ts_to_sql(&user.created_at),
                ],
            )
            .map_err(classify)?;
        Ok(())
    }

    pub fn get_user(&self, id: &str) -> DbResult<Option<User>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS),
                [id],
                read_user_row,
            )
            .optional()?
            .map(TryInto::try_into)
            .transpose()
    }

    /// Users who can be booked for appointments, by name.
    pub fn list_providers(&self) -> DbResult<Vec<User>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM users WHERE role = 'PROVIDER' ORDER BY name",
            USER_COLUMNS
        ))?;
        let rows = stmt.query_map([], read_user_row)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?.try_into()?);
        }
        Ok(users)
    }
}

pub(crate) fn user_exists(conn: &Connection, id: &str) -> DbResult<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM users WHERE id = ?", [id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

struct UserRow {
    id: String,
    name: String,
    email: String,
    role: String,
    created_at: String,
}

fn read_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        role: row.get(3)?,
        created_at: row.get(4)?,
    })
}

impl TryFrom<UserRow> for User {
    type Error = DbError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            role: enum_from_sql::<UserRole>(&row.role)?,
            created_at: ts_from_sql(&row.created_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_insert_and_get_user() {
        let db = setup_db();
        let user = User::new("Dra. Ana".into(), "Ana@Clinic.test".into(), UserRole::Provider);
        db.insert_user(&user).unwrap();

        let loaded = db.get_user(&user.id).unwrap().unwrap();
        assert_eq!(loaded, user);
        assert_eq!(loaded.email, "ana@clinic.test");
        assert!(user_exists(db.conn(), &user.id).unwrap());
        assert!(!user_exists(db.conn(), "nobody").unwrap());
    }

    #[test]
    fn test_duplicate_user_email() {
        let db = setup_db();
        db.insert_user(&User::new("A".into(), "a@clinic.test".into(), UserRole::Staff))
            .unwrap();
        let err = db
            .insert_user(&User::new("B".into(), "A@CLINIC.TEST".into(), UserRole::Staff))
            .unwrap_err();
        assert!(matches!(err, DbError::Duplicate(ref column) if column == "users.email"));
    }

    #[test]
    fn test_list_providers_only() {
        let db = setup_db();
        db.insert_user(&User::new("Zeca".into(), "z@clinic.test".into(), UserRole::Provider))
            .unwrap();
        db.insert_user(&User::new("Bia".into(), "b@clinic.test".into(), UserRole::Provider))
            .unwrap();
        db.insert_user(&User::new("Recepção".into(), "r@clinic.test".into(), UserRole::Staff))
            .unwrap();

        let names: Vec<String> = db.list_providers().unwrap().into_iter().map(|u| u.name).collect();
        assert_eq!(names, vec!["Bia".to_string(), "Zeca".to_string()]);
    }
}
