//! SQL schema for the registry ledger.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per issued certificate. Only `status` is ever updated.
CREATE TABLE IF NOT EXISTS records (
    fingerprint TEXT PRIMARY KEY,   -- 0x-prefixed lowercase hex, never zero
    label       TEXT NOT NULL,
    issued_at   TEXT NOT NULL,      -- ISO 8601 UTC; ledger-assigned
    issuer      TEXT NOT NULL,
    status      TEXT NOT NULL       -- 'active' | 'revoked' | 'updated'
);

-- Status history is strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS status_history (
    fingerprint TEXT    NOT NULL REFERENCES records(fingerprint),
    position    INTEGER NOT NULL,   -- 0-based insertion order
    status      TEXT    NOT NULL,
    changed_at  TEXT    NOT NULL,
    changed_by  TEXT    NOT NULL,
    reason      TEXT    NOT NULL DEFAULT '',
    PRIMARY KEY (fingerprint, position)
);

CREATE TRIGGER IF NOT EXISTS status_history_no_update
BEFORE UPDATE ON status_history
BEGIN
    SELECT RAISE(ABORT, 'status_history is append-only');
END;

CREATE TRIGGER IF NOT EXISTS status_history_no_delete
BEFORE DELETE ON status_history
BEGIN
    SELECT RAISE(ABORT, 'status_history is append-only');
END;

-- The ledger's total order: one row per committed transition.
CREATE TABLE IF NOT EXISTS transactions (
    sequence     INTEGER PRIMARY KEY AUTOINCREMENT,
    tx_id        TEXT NOT NULL UNIQUE,
    kind         TEXT NOT NULL,     -- 'certificate_issued' | 'status_changed'
    fingerprint  TEXT NOT NULL,
    caller       TEXT NOT NULL,
    committed_at TEXT NOT NULL,
    notification TEXT NOT NULL      -- JSON-encoded Notification
);

CREATE INDEX IF NOT EXISTS transactions_fingerprint_idx
    ON transactions(fingerprint);

PRAGMA user_version = 1;
";
