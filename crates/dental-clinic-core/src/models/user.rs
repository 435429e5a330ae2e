//! Clinic staff and the acting identity behind writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

text_enum! {
    pub enum UserRole {
        Provider => "PROVIDER",
        Staff => "STAFF",
        Admin => "ADMIN",
    }
}

/// A clinic user: providers run appointments, everyone can author chart entries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, email: String, role: UserRole) -> Self {
        Self {
            id: super::new_id(),
            name,
            email: email.trim().to_lowercase(),
            role,
            created_at: super::timestamp_now(),
        }
    }
}

/// The authenticated user performing a write.
///
/// Session handling lives outside this crate; callers resolve the session
/// and pass the actor into every write explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_id: String,
}

impl Actor {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Actor::new(user.id.clone())
    }
}
