//! Dental Clinic Core Library
//!
//! Patient records, scheduling, anamnesis questionnaires with tooth charts,
//! finances and stock for a single dental clinic, stored in SQLite.
//!
//! # Architecture
//!
//! ```text
//!   form / JSON input
//!          │
//!          ▼
//!   ┌──────────────┐   reject before any write
//!   │  validation  │──────────────────────────────┐
//!   └──────┬───────┘                              │
//!          ▼                                      ▼
//!   ┌──────────────┐   IMMEDIATE tx   ┌──────────────────┐
//!   │   actions    │─────────────────▶│      engine      │
//!   │   (Clinic)   │                  │ responses, charts│
//!   └──────┬───────┘                  └────────┬─────────┘
//!          │                                   │
//!          ▼                                   ▼
//!   ┌──────────────────────────────────────────────────┐
//!   │                    db (SQLite)                   │
//!   └──────────────────────────┬───────────────────────┘
//!                              ▼
//!                ┌──────────────────────────┐
//!                │          views           │
//!                │ patient page, week, dash │
//!                └──────────────────────────┘
//! ```
//!
//! # Core Principle
//!
//! **Every write names its actor.** There is no ambient current user; the
//! caller resolves the session and passes an [`Actor`] into each write.
//!
//! # Modules
//!
//! - [`models`]: Domain types (Patient, Appointment, AnamnesisTemplate, etc.)
//! - [`validation`]: Raw input to validated fields, all failures collected
//! - [`db`]: SQLite persistence gateway
//! - [`engine`]: Transactional response and odontogram writes
//! - [`views`]: Patient page, week calendar and dashboard rollups
//! - [`actions`]: The [`Clinic`] facade used by pages and the HTTP layer

pub mod actions;
pub mod db;
pub mod engine;
pub mod models;
pub mod validation;
pub mod views;

// Re-export commonly used types
pub use actions::{
    ActionOutcome, Clinic, ClinicError, ClinicResult, NoopInvalidator, RecordingInvalidator,
    ViewInvalidator,
};
pub use db::{Database, DbError, DbResult};
pub use engine::{EngineError, SaveOutcome};
pub use models::{
    Actor, AnamnesisResponseSet, AnamnesisTemplate, Appointment, Cents, FinancialTransaction,
    OdontogramRecord, Patient, Task, User, UserRole,
};
pub use validation::{FieldError, ValidationErrors};
pub use views::{
    DashboardSummary, FinanceOverview, FinancialReport, PatientDetail, ViewError, WeekSchedule,
};
