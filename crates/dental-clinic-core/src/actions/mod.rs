//! Server-side form actions.
//!
//! [`Clinic`] is the single entry point the rendered pages and the HTTP
//! layer call into. Every write takes the acting user explicitly and is
//! rejected as unauthorized before anything is validated or stored. Input
//! is validated next, then written. Once the write has committed, the
//! pages that show the changed data are invalidated through the
//! [`ViewInvalidator`] hook.

mod anamnesis;
mod inventory;
mod records;
mod tasks;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::db::{Database, DbError, PatientSearch};
use crate::engine::EngineError;
use crate::models::{
    Actor, AnamnesisTemplate, OdontogramRecord, Patient, User,
};
use crate::validation::{FieldError, InventoryInputError, ValidationErrors};
use crate::views::{
    DashboardSummary, FinanceOverview, FinancialReport, PatientDetail, ViewError, WeekSchedule,
};

/// Errors surfaced by clinic actions.
#[derive(Error, Debug)]
pub enum ClinicError {
    /// No authenticated actor, or the actor is not a known user.
    #[error("Unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("Missing fields")]
    MissingFields,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Email already belongs to another patient")]
    EmailAlreadyExists,

    #[error("Response set {response_set_id} is at version {actual}, expected {expected}")]
    VersionConflict {
        response_set_id: String,
        expected: i64,
        actual: i64,
    },

    #[error("Database error: {0}")]
    Database(DbError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ClinicResult<T> = Result<T, ClinicError>;

impl ClinicError {
    /// Stable code shown to the user in place of the raw error.
    pub fn code(&self) -> &'static str {
        match self {
            ClinicError::Unauthorized => "UNAUTHORIZED",
            ClinicError::Validation(_) | ClinicError::MissingFields => "VALIDATION_FAILED",
            ClinicError::NotFound(_) => "NOT_FOUND",
            ClinicError::EmailAlreadyExists => "EMAIL_ALREADY_EXISTS",
            ClinicError::VersionConflict { .. } => "VERSION_CONFLICT",
            ClinicError::Database(_) | ClinicError::Internal(_) => "INTERNAL",
        }
    }
}

impl From<DbError> for ClinicError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Duplicate(column) if column == "patients.email" => ClinicError::EmailAlreadyExists,
            DbError::NotFound(what) => ClinicError::NotFound(what),
            other => ClinicError::Database(other),
        }
    }
}

impl From<EngineError> for ClinicError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Database(db) => db.into(),
            EngineError::Json(json) => ClinicError::Internal(json.to_string()),
            EngineError::Validation(errors) => ClinicError::Validation(errors),
            EngineError::NotFound(what) => ClinicError::NotFound(what),
            EngineError::UnknownActor(_) => ClinicError::Unauthorized,
            EngineError::VersionConflict {
                response_set_id,
                expected,
                actual,
            } => ClinicError::VersionConflict {
                response_set_id,
                expected,
                actual,
            },
        }
    }
}

impl From<InventoryInputError> for ClinicError {
    fn from(e: InventoryInputError) -> Self {
        match e {
            InventoryInputError::MissingFields => ClinicError::MissingFields,
            InventoryInputError::Invalid(errors) => ClinicError::Validation(errors),
        }
    }
}

impl From<ViewError> for ClinicError {
    fn from(e: ViewError) -> Self {
        match e {
            ViewError::Database(db) => db.into(),
            ViewError::Amount(amount) => ClinicError::Internal(amount.to_string()),
        }
    }
}

/// The `{success, ...}` shape returned to a submitting form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub field_errors: Vec<FieldError>,
}

impl<T> From<ClinicResult<T>> for ActionOutcome<T> {
    fn from(result: ClinicResult<T>) -> Self {
        match result {
            Ok(data) => ActionOutcome {
                success: true,
                data: Some(data),
                error: None,
                field_errors: Vec::new(),
            },
            Err(e) => {
                let code = e.code();
                if code == "INTERNAL" {
                    error!(error = %e, "Action failed");
                }
                let field_errors = match e {
                    ClinicError::Validation(errors) => errors.errors,
                    _ => Vec::new(),
                };
                ActionOutcome {
                    success: false,
                    data: None,
                    error: Some(code),
                    field_errors,
                }
            }
        }
    }
}

/// Told which rendered pages went stale after a write.
pub trait ViewInvalidator: Send + Sync {
    fn invalidate(&self, path: &str);
}

/// Discards invalidations; for callers with no page cache.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInvalidator;

impl ViewInvalidator for NoopInvalidator {
    fn invalidate(&self, _path: &str) {}
}

/// Keeps every invalidated path in order.
#[derive(Debug, Default)]
pub struct RecordingInvalidator {
    paths: Mutex<Vec<String>>,
}

impl RecordingInvalidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Return and forget everything recorded so far.
    pub fn take(&self) -> Vec<String> {
        self.paths
            .lock()
            .map(|mut p| std::mem::take(&mut *p))
            .unwrap_or_default()
    }
}

impl ViewInvalidator for RecordingInvalidator {
    fn invalidate(&self, path: &str) {
        if let Ok(mut paths) = self.paths.lock() {
            paths.push(path.to_string());
        }
    }
}

pub(crate) const PATIENTS_PATH: &str = "/patients";
pub(crate) const SCHEDULE_PATH: &str = "/schedule";
pub(crate) const DASHBOARD_PATH: &str = "/dashboard";
pub(crate) const FINANCE_PATH: &str = "/finance";
pub(crate) const ANAMNESIS_PATH: &str = "/anamnesis";
pub(crate) const TASKS_PATH: &str = "/tasks";

pub(crate) fn patient_path(patient_id: &str) -> String {
    format!("{}/{}", PATIENTS_PATH, patient_id)
}

/// Thread-safe clinic handle shared by every request.
#[derive(Clone)]
pub struct Clinic {
    db: Arc<Mutex<Database>>,
    invalidator: Arc<dyn ViewInvalidator>,
}

impl std::fmt::Debug for Clinic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clinic").finish_non_exhaustive()
    }
}

impl Clinic {
    pub fn new(db: Database) -> Self {
        Self::with_invalidator(db, Arc::new(NoopInvalidator))
    }

    pub fn with_invalidator(db: Database, invalidator: Arc<dyn ViewInvalidator>) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            invalidator,
        }
    }

    /// Open or create the clinic database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> ClinicResult<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    pub fn open_in_memory() -> ClinicResult<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    /// A panic while the lock was held cannot leave a transaction open
    /// (rusqlite rolls back on drop), so a poisoned lock is taken over.
    fn lock(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(|poisoned| {
            warn!("Recovering database lock after a panic");
            poisoned.into_inner()
        })
    }

    fn invalidate<S: AsRef<str>>(&self, paths: &[S]) {
        for path in paths {
            self.invalidator.invalidate(path.as_ref());
        }
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Provision a staff account. Not an actor-gated action: accounts are
    /// created by whoever manages sessions.
    pub fn register_user(&self, user: &User) -> ClinicResult<()> {
        let db = self.lock();
        db.insert_user(user)?;
        Ok(())
    }

    /// Users who can be booked for appointments.
    pub fn list_providers(&self) -> ClinicResult<Vec<User>> {
        let db = self.lock();
        Ok(db.list_providers()?)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn patient_detail(&self, patient_id: &str) -> ClinicResult<PatientDetail> {
        let db = self.lock();
        PatientDetail::load(&db, patient_id)?
            .ok_or_else(|| ClinicError::NotFound(format!("patient {}", patient_id)))
    }

    pub fn search_patients(&self, search: &PatientSearch) -> ClinicResult<Vec<Patient>> {
        let db = self.lock();
        let patients = db.search_patients(search)?;
        debug!(matches = patients.len(), "Patient search");
        Ok(patients)
    }

    pub fn week_schedule(&self, base_date: NaiveDate) -> ClinicResult<WeekSchedule> {
        let db = self.lock();
        Ok(WeekSchedule::load(&db, base_date)?)
    }

    pub fn dashboard(&self, now: DateTime<Utc>) -> ClinicResult<DashboardSummary> {
        let db = self.lock();
        Ok(DashboardSummary::load(&db, now)?)
    }

    pub fn financial_report(&self, now: DateTime<Utc>) -> ClinicResult<FinancialReport> {
        let db = self.lock();
        Ok(FinancialReport::load(&db, now)?)
    }

    pub fn finance_overview(&self) -> ClinicResult<FinanceOverview> {
        let db = self.lock();
        Ok(FinanceOverview::load(&db)?)
    }

    /// The chart saved most recently for the patient, if any.
    pub fn latest_odontogram(&self, patient_id: &str) -> ClinicResult<Option<OdontogramRecord>> {
        let db = self.lock();
        Ok(db.latest_odontogram_for_patient(patient_id)?)
    }

    pub fn list_templates(&self) -> ClinicResult<Vec<AnamnesisTemplate>> {
        let db = self.lock();
        Ok(db.list_templates()?)
    }
}

/// Reject a missing actor, or one that names no known user.
fn authorize<'a>(db: &Database, actor: Option<&'a Actor>) -> ClinicResult<&'a Actor> {
    let actor = actor.ok_or(ClinicError::Unauthorized)?;
    if db.get_user(&actor.user_id)?.is_none() {
        return Err(ClinicError::Unauthorized);
    }
    Ok(actor)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::models::UserRole;

    pub struct Fixture {
        pub clinic: Clinic,
        pub views: Arc<RecordingInvalidator>,
        pub provider: User,
        pub actor: Actor,
    }

    pub fn fixture() -> Fixture {
        let views = Arc::new(RecordingInvalidator::new());
        let clinic = Clinic::with_invalidator(Database::open_in_memory().unwrap(), views.clone());
        let provider = User::new("Dra. Ana Souza".into(), "ana@clinic.test".into(), UserRole::Provider);
        clinic.register_user(&provider).unwrap();
        let actor = Actor::from(&provider);
        Fixture {
            clinic,
            views,
            provider,
            actor,
        }
    }
}
