//! Questionnaire response engine.
//!
//! The transactional writes behind anamnesis responses: recording a filled
//! questionnaire with its answers, and saving a response set's odontogram.
//! Each call runs inside one `IMMEDIATE` SQLite transaction, so readers see
//! either the state before the call or the state after it, never a chart
//! with its entries half replaced.

mod odontogram;
mod responses;

pub use odontogram::*;
pub use responses::*;

use rusqlite::Connection;
use thiserror::Error;

use crate::db::{self, DbError};
use crate::models::Actor;
use crate::validation::ValidationErrors;

/// Engine errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The acting user does not exist.
    #[error("Unknown actor: {0}")]
    UnknownActor(String),

    #[error("Response set {response_set_id} is at version {actual}, expected {expected}")]
    VersionConflict {
        response_set_id: String,
        expected: i64,
        actual: i64,
    },
}

pub type EngineResult<T> = Result<T, EngineError>;

impl From<rusqlite::Error> for EngineError {
    fn from(e: rusqlite::Error) -> Self {
        EngineError::Database(db::classify(e))
    }
}

fn ensure_actor(conn: &Connection, actor: &Actor) -> EngineResult<()> {
    if !db::user_exists(conn, &actor.user_id)? {
        return Err(EngineError::UnknownActor(actor.user_id.clone()));
    }
    Ok(())
}

fn ensure_patient(conn: &Connection, patient_id: &str) -> EngineResult<()> {
    if !db::patient_exists(conn, patient_id)? {
        return Err(EngineError::NotFound(format!("patient {}", patient_id)));
    }
    Ok(())
}
