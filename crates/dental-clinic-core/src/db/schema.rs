//! SQLite schema definition.

/// Complete database schema for the clinic.
///
/// Timestamps are RFC 3339 text in UTC with millisecond precision, so they
/// sort correctly as strings. Money columns hold integer cents.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Users (providers, staff)
-- ============================================================================

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    role TEXT NOT NULL CHECK (role IN ('PROVIDER', 'STAFF', 'ADMIN')),
    created_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email ON users(email COLLATE NOCASE);

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id TEXT PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    full_name TEXT NOT NULL,
    email TEXT,
    phone TEXT,
    birth_date TEXT,                             -- YYYY-MM-DD
    gender TEXT NOT NULL DEFAULT 'UNDISCLOSED'
        CHECK (gender IN ('FEMALE', 'MALE', 'NON_BINARY', 'UNDISCLOSED')),
    status TEXT NOT NULL DEFAULT 'ACTIVE'
        CHECK (status IN ('ACTIVE', 'WAITING', 'DISCHARGED', 'INACTIVE')),
    document_number TEXT,
    notes TEXT,
    address TEXT,                                -- JSON object
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- NULL emails never collide
CREATE UNIQUE INDEX IF NOT EXISTS idx_patients_email ON patients(email COLLATE NOCASE);
CREATE INDEX IF NOT EXISTS idx_patients_created ON patients(created_at);

-- ============================================================================
-- Appointments
-- ============================================================================

CREATE TABLE IF NOT EXISTS appointments (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    provider_id TEXT NOT NULL REFERENCES users(id),
    title TEXT NOT NULL,
    description TEXT,
    start_at TEXT NOT NULL,
    end_at TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'SCHEDULED'
        CHECK (status IN ('SCHEDULED', 'COMPLETED', 'CANCELLED', 'MISSED')),
    payment_status TEXT NOT NULL DEFAULT 'UNPAID'
        CHECK (payment_status IN ('UNPAID', 'PARTIAL', 'PAID')),
    fee_cents INTEGER,
    paid_cents INTEGER,
    location TEXT,
    color TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    CHECK (end_at > start_at)
);

CREATE INDEX IF NOT EXISTS idx_appointments_start ON appointments(start_at);
CREATE INDEX IF NOT EXISTS idx_appointments_patient ON appointments(patient_id, start_at);

-- ============================================================================
-- Financial Transactions
-- ============================================================================

CREATE TABLE IF NOT EXISTS financial_transactions (
    id TEXT PRIMARY KEY,
    type TEXT NOT NULL CHECK (type IN ('INCOME', 'EXPENSE')),
    status TEXT NOT NULL DEFAULT 'PENDING'
        CHECK (status IN ('PENDING', 'PAID', 'OVERDUE')),
    category TEXT NOT NULL,
    description TEXT,
    amount_cents INTEGER NOT NULL,
    patient_id TEXT REFERENCES patients(id) ON DELETE SET NULL,
    appointment_id TEXT REFERENCES appointments(id) ON DELETE SET NULL,
    due_date TEXT,                               -- YYYY-MM-DD
    paid_at TEXT,
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_transactions_created ON financial_transactions(created_at);
CREATE INDEX IF NOT EXISTS idx_transactions_patient ON financial_transactions(patient_id);

-- ============================================================================
-- Anamnesis Templates
-- ============================================================================

CREATE TABLE IF NOT EXISTS anamnesis_templates (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    category TEXT,
    is_default INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS anamnesis_questions (
    id TEXT PRIMARY KEY,
    template_id TEXT NOT NULL REFERENCES anamnesis_templates(id) ON DELETE CASCADE,
    question TEXT NOT NULL,
    type TEXT NOT NULL CHECK (type IN ('TEXT', 'BOOLEAN', 'NUMBER', 'MULTIPLE_CHOICE')),
    helper_text TEXT,
    alert_label TEXT,
    alert_level TEXT NOT NULL DEFAULT 'NONE'
        CHECK (alert_level IN ('NONE', 'INFO', 'WARNING', 'CRITICAL')),
    sort_order INTEGER NOT NULL,
    is_required INTEGER NOT NULL DEFAULT 0,
    options TEXT NOT NULL DEFAULT '[]'           -- JSON array of strings
);

CREATE INDEX IF NOT EXISTS idx_questions_template ON anamnesis_questions(template_id, sort_order);

-- ============================================================================
-- Anamnesis Responses
-- ============================================================================

CREATE TABLE IF NOT EXISTS anamnesis_response_sets (
    id TEXT PRIMARY KEY,
    template_id TEXT NOT NULL REFERENCES anamnesis_templates(id) ON DELETE RESTRICT,
    patient_id TEXT NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    appointment_id TEXT REFERENCES appointments(id) ON DELETE SET NULL,
    filled_by_id TEXT NOT NULL REFERENCES users(id),
    payment_status TEXT NOT NULL DEFAULT 'UNPAID'
        CHECK (payment_status IN ('UNPAID', 'PARTIAL', 'PAID')),
    amount_due_cents INTEGER,
    amount_paid_cents INTEGER,
    notes TEXT,
    status TEXT NOT NULL DEFAULT 'OPEN' CHECK (status IN ('OPEN', 'FINALIZED')),
    version INTEGER NOT NULL DEFAULT 1 CHECK (version >= 1),
    filled_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_response_sets_patient ON anamnesis_response_sets(patient_id, filled_at);
CREATE INDEX IF NOT EXISTS idx_response_sets_payment ON anamnesis_response_sets(payment_status);

-- Exactly one value column is populated per answer
CREATE TABLE IF NOT EXISTS anamnesis_answers (
    id TEXT PRIMARY KEY,
    response_set_id TEXT NOT NULL REFERENCES anamnesis_response_sets(id) ON DELETE CASCADE,
    question_id TEXT NOT NULL REFERENCES anamnesis_questions(id),
    value_text TEXT,
    value_boolean INTEGER,
    value_number REAL,
    value_options TEXT,                          -- JSON array of strings
    created_at TEXT NOT NULL,
    CHECK (
        (value_text IS NOT NULL) + (value_boolean IS NOT NULL)
        + (value_number IS NOT NULL) + (value_options IS NOT NULL) = 1
    )
);

CREATE INDEX IF NOT EXISTS idx_answers_response_set ON anamnesis_answers(response_set_id);

-- ============================================================================
-- Odontogram
-- ============================================================================

CREATE TABLE IF NOT EXISTS odontogram_records (
    id TEXT PRIMARY KEY,
    response_set_id TEXT NOT NULL UNIQUE
        REFERENCES anamnesis_response_sets(id) ON DELETE CASCADE,
    patient_id TEXT NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    chart_type TEXT NOT NULL DEFAULT 'PERMANENT'
        CHECK (chart_type IN ('PERMANENT', 'DECIDUOUS')),
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_odontogram_patient ON odontogram_records(patient_id, updated_at);

CREATE TABLE IF NOT EXISTS odontogram_entries (
    id TEXT PRIMARY KEY,
    odontogram_id TEXT NOT NULL REFERENCES odontogram_records(id) ON DELETE CASCADE,
    tooth_number TEXT NOT NULL CHECK (length(trim(tooth_number)) > 0),
    region TEXT,
    annotations TEXT,
    status TEXT NOT NULL CHECK (status IN ('OPEN', 'IN_PROGRESS', 'COMPLETED', 'NOTE')),
    author_id TEXT NOT NULL REFERENCES users(id),
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_entries_odontogram ON odontogram_entries(odontogram_id, tooth_number);

-- Append-only snapshots of replaced entry sets
CREATE TABLE IF NOT EXISTS odontogram_revisions (
    id TEXT PRIMARY KEY,
    odontogram_id TEXT NOT NULL REFERENCES odontogram_records(id) ON DELETE CASCADE,
    version INTEGER NOT NULL,
    digest TEXT NOT NULL,                        -- hex SHA-256 of entries JSON
    entries TEXT NOT NULL,                       -- JSON array of entries
    replaced_by_id TEXT NOT NULL REFERENCES users(id),
    created_at TEXT NOT NULL,
    UNIQUE (odontogram_id, version)
);

CREATE TRIGGER IF NOT EXISTS odontogram_revisions_immutable BEFORE UPDATE ON odontogram_revisions
BEGIN
    SELECT RAISE(ABORT, 'Odontogram revisions are append-only');
END;

-- ============================================================================
-- Attachments (metadata only; bytes live in blob storage)
-- ============================================================================

CREATE TABLE IF NOT EXISTS attachments (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    appointment_id TEXT REFERENCES appointments(id) ON DELETE SET NULL,
    response_set_id TEXT REFERENCES anamnesis_response_sets(id) ON DELETE SET NULL,
    uploaded_by_id TEXT NOT NULL REFERENCES users(id),
    name TEXT NOT NULL,
    url TEXT NOT NULL,
    mime_type TEXT,
    size_bytes INTEGER NOT NULL DEFAULT 0 CHECK (size_bytes >= 0),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_attachments_patient ON attachments(patient_id, created_at);

-- ============================================================================
-- Tasks
-- ============================================================================

CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL DEFAULT 'PENDING'
        CHECK (status IN ('PENDING', 'IN_PROGRESS', 'DONE')),
    due_date TEXT,                               -- YYYY-MM-DD
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tasks_status_due ON tasks(status, due_date);

-- ============================================================================
-- Inventory
-- ============================================================================

CREATE TABLE IF NOT EXISTS implant_items (
    id TEXT PRIMARY KEY,
    type TEXT NOT NULL,
    length_mm REAL,
    diameter_mm REAL,
    quantity INTEGER NOT NULL DEFAULT 0,
    brand TEXT,
    image_url TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS surgery_items (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    quantity INTEGER NOT NULL DEFAULT 0,
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS restorative_items (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    quantity INTEGER NOT NULL DEFAULT 0,
    color TEXT,
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;
