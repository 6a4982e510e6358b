//! SQL schema for the TRS SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// The `*_key` columns hold values normalised the same way the scorer
/// normalises them, so coarse retrieval can use plain equality.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS persons (
    person_id            TEXT PRIMARY KEY,
    created_at           TEXT NOT NULL,
    first_name           TEXT,
    middle_name          TEXT,
    last_name            TEXT,
    date_of_birth        TEXT,            -- YYYY-MM-DD
    nino                 TEXT,
    trn                  TEXT UNIQUE,
    itt_provider_id      TEXT,
    hus_id               TEXT UNIQUE,
    slug_id              TEXT UNIQUE,
    itt_slug_id          TEXT UNIQUE,
    has_active_sanctions INTEGER NOT NULL DEFAULT 0,
    has_qts_date         INTEGER NOT NULL DEFAULT 0,
    has_eyts_date        INTEGER NOT NULL DEFAULT 0,
    first_name_key       TEXT,
    middle_name_key      TEXT,
    last_name_key        TEXT,
    nino_key             TEXT
);

CREATE TABLE IF NOT EXISTS previous_names (
    person_id       TEXT NOT NULL REFERENCES persons(person_id),
    position        INTEGER NOT NULL,
    first_name      TEXT,
    middle_name     TEXT,
    last_name       TEXT,
    first_name_key  TEXT,
    middle_name_key TEXT,
    last_name_key   TEXT,
    PRIMARY KEY (person_id, position)
);

-- Review tasks and outbox messages are never updated once written.
CREATE TABLE IF NOT EXISTS review_tasks (
    artifact_id TEXT PRIMARY KEY,
    regarding   TEXT NOT NULL,
    duplicate   TEXT,
    category    TEXT NOT NULL,   -- task category code, e.g. 'DMSImportTrn'
    priority    TEXT NOT NULL,   -- 'normal' | 'high'
    description TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS outbox_messages (
    message_id       TEXT PRIMARY KEY,
    message_name     TEXT NOT NULL,
    payload          BLOB NOT NULL,
    target_person_id TEXT NOT NULL,
    created_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS trn_sequence (
    id         INTEGER PRIMARY KEY CHECK (id = 1),
    next_value INTEGER NOT NULL
);

INSERT OR IGNORE INTO trn_sequence (id, next_value) VALUES (1, 1000000);

CREATE INDEX IF NOT EXISTS persons_first_name_idx ON persons(first_name_key);
CREATE INDEX IF NOT EXISTS persons_last_name_idx  ON persons(last_name_key);
CREATE INDEX IF NOT EXISTS persons_dob_idx        ON persons(date_of_birth);
CREATE INDEX IF NOT EXISTS persons_nino_idx       ON persons(nino_key);
CREATE INDEX IF NOT EXISTS previous_names_idx     ON previous_names(first_name_key, last_name_key);

PRAGMA user_version = 1;
";
