//! SQL schema for the Gatehouse SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS visitors (
    visitor_id   TEXT PRIMARY KEY,
    cin          TEXT NOT NULL,   -- 8 digits; validated by the service
    last_name    TEXT,
    first_name   TEXT,
    fiscal_id    TEXT NOT NULL,   -- 7 digits + 1 letter
    visitor_type TEXT NOT NULL,   -- 'patient_visitor' | 'doctor' | 'supplier'
    entered_at   TEXT NOT NULL,   -- RFC 3339 UTC, fixed-width nanoseconds
    exited_at    TEXT,            -- NULL while the visit is open
    observation  TEXT,
    details      TEXT,
    entered_by   TEXT NOT NULL,
    exited_by    TEXT
);

-- At most one open visit per CIN. The service checks before inserting so it
-- can report the conflicting record id; this index closes the window between
-- that check and the insert under concurrent writers.
CREATE UNIQUE INDEX IF NOT EXISTS visitors_active_cin_idx
    ON visitors(cin) WHERE exited_at IS NULL;

CREATE INDEX IF NOT EXISTS visitors_entered_idx ON visitors(entered_at);
CREATE INDEX IF NOT EXISTS visitors_exited_idx  ON visitors(exited_at);

CREATE TABLE IF NOT EXISTS staff_users (
    username      TEXT PRIMARY KEY,
    password_hash TEXT NOT NULL,   -- argon2 PHC string
    created_at    TEXT NOT NULL
);

-- Append-only audit trail covering both persisted entities.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS audit_log (
    audit_id    TEXT PRIMARY KEY,
    entity      TEXT NOT NULL,    -- 'visitor' | 'user'
    entity_id   TEXT NOT NULL,
    operation   TEXT NOT NULL,    -- 'create' | 'update' | 'delete'
    snapshot    TEXT NOT NULL,    -- JSON snapshot of the entity at event time
    actor       TEXT,
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS audit_entity_idx   ON audit_log(entity, entity_id);
CREATE INDEX IF NOT EXISTS audit_recorded_idx ON audit_log(recorded_at);

PRAGMA user_version = 1;
";
