//! SQL schema for the Docket SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS credentials (
    credential_id TEXT PRIMARY KEY,
    subject_id    TEXT NOT NULL,
    subject_name  TEXT NOT NULL,
    subject_kind  TEXT NOT NULL,   -- 'employee' | 'equipment' | 'company'
    kind          TEXT NOT NULL,   -- normalised credential kind
    expires_on    TEXT,            -- YYYY-MM-DD, or raw text if it never parsed
    number        TEXT,
    serial        TEXT,            -- written at most once
    serial_family TEXT,            -- prefix the serial was allocated under
    created_at    TEXT NOT NULL    -- ISO 8601 UTC; server-assigned
);

-- The scan picks the next serial; this index is what makes it safe.
CREATE UNIQUE INDEX IF NOT EXISTS credentials_serial_idx
    ON credentials(serial) WHERE serial IS NOT NULL;

-- Serials are write-once.
CREATE TRIGGER IF NOT EXISTS credentials_serial_immutable
BEFORE UPDATE OF serial ON credentials
WHEN OLD.serial IS NOT NULL AND NEW.serial IS NOT OLD.serial
BEGIN
    SELECT RAISE(ABORT, 'serial is immutable once assigned');
END;

CREATE INDEX IF NOT EXISTS credentials_subject_idx ON credentials(subject_id);
CREATE INDEX IF NOT EXISTS credentials_kind_idx    ON credentials(kind);

PRAGMA user_version = 1;
";
