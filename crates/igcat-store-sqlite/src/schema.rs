//! SQL schema for the IG catalog SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS packages (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    ig          TEXT NOT NULL,
    ig_version  TEXT NOT NULL,
    imported_at TEXT NOT NULL,     -- RFC 3339 UTC
    source_path TEXT NOT NULL,
    UNIQUE (ig, ig_version)
);

-- base_definition is a soft reference: parents may arrive later.
CREATE TABLE IF NOT EXISTS artifacts (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    package_id      INTEGER NOT NULL REFERENCES packages(id) ON DELETE CASCADE,
    resource_type   TEXT NOT NULL,
    canonical_url   TEXT NOT NULL,
    version         TEXT,
    name            TEXT,
    title           TEXT,
    sd_type         TEXT,
    base_definition TEXT,
    file_path       TEXT NOT NULL,
    sha256          TEXT NOT NULL,
    indexed_at      TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS uq_artifact_pkg_url_version
    ON artifacts(package_id, canonical_url, coalesce(version, ''));
CREATE INDEX IF NOT EXISTS ix_artifact_canonical ON artifacts(canonical_url);

CREATE TABLE IF NOT EXISTS sd_elements (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    artifact_id   INTEGER NOT NULL REFERENCES artifacts(id) ON DELETE CASCADE,
    element_id    TEXT,
    path          TEXT NOT NULL,
    min           INTEGER,
    max           TEXT,
    must_support  INTEGER,         -- NULL when the element does not say
    is_modifier   INTEGER,
    is_summary    INTEGER,
    types_json    TEXT,
    slicing_json  TEXT,
    raw_json      TEXT NOT NULL,
    source_choice TEXT NOT NULL,   -- 'differential' | 'snapshot'
    loaded_at     TEXT NOT NULL,
    UNIQUE (artifact_id, path)
);

-- value_set is '' rather than NULL so the unique key is well-defined.
CREATE TABLE IF NOT EXISTS sd_bindings (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    artifact_id   INTEGER NOT NULL REFERENCES artifacts(id) ON DELETE CASCADE,
    path          TEXT NOT NULL,
    strength      TEXT,
    value_set     TEXT NOT NULL DEFAULT '',
    binding_json  TEXT NOT NULL,
    source_choice TEXT NOT NULL,
    loaded_at     TEXT NOT NULL,
    UNIQUE (artifact_id, path, value_set)
);

CREATE TABLE IF NOT EXISTS sd_constraints (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    artifact_id     INTEGER NOT NULL REFERENCES artifacts(id) ON DELETE CASCADE,
    path            TEXT NOT NULL,
    key             TEXT NOT NULL,
    severity        TEXT,
    human           TEXT,
    expression      TEXT,
    xpath           TEXT,
    constraint_json TEXT NOT NULL,
    source_choice   TEXT NOT NULL,
    loaded_at       TEXT NOT NULL,
    UNIQUE (artifact_id, path, key)
);

CREATE INDEX IF NOT EXISTS ix_sd_bindings_value_set ON sd_bindings(value_set);

PRAGMA user_version = 1;
";

// ─── Fact upserts ────────────────────────────────────────────────────────────
//
// The DO UPDATE clause only fires when the stored raw JSON or source choice
// differs, so re-loading unchanged facts reports zero changed rows and keeps
// `loaded_at` untouched.

pub const ELEMENT_EXISTS: &str =
  "SELECT 1 FROM sd_elements WHERE artifact_id = ?1 AND path = ?2";

pub const ELEMENT_UPSERT: &str = "
INSERT INTO sd_elements (
    artifact_id, path, element_id, min, max, must_support, is_modifier,
    is_summary, types_json, slicing_json, raw_json, source_choice, loaded_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
ON CONFLICT (artifact_id, path) DO UPDATE SET
    element_id    = excluded.element_id,
    min           = excluded.min,
    max           = excluded.max,
    must_support  = excluded.must_support,
    is_modifier   = excluded.is_modifier,
    is_summary    = excluded.is_summary,
    types_json    = excluded.types_json,
    slicing_json  = excluded.slicing_json,
    raw_json      = excluded.raw_json,
    source_choice = excluded.source_choice,
    loaded_at     = excluded.loaded_at
WHERE sd_elements.raw_json IS NOT excluded.raw_json
   OR sd_elements.source_choice IS NOT excluded.source_choice";

pub const BINDING_EXISTS: &str =
  "SELECT 1 FROM sd_bindings WHERE artifact_id = ?1 AND path = ?2 AND value_set = ?3";

pub const BINDING_UPSERT: &str = "
INSERT INTO sd_bindings (
    artifact_id, path, value_set, strength, binding_json, source_choice, loaded_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
ON CONFLICT (artifact_id, path, value_set) DO UPDATE SET
    strength      = excluded.strength,
    binding_json  = excluded.binding_json,
    source_choice = excluded.source_choice,
    loaded_at     = excluded.loaded_at
WHERE sd_bindings.binding_json IS NOT excluded.binding_json
   OR sd_bindings.source_choice IS NOT excluded.source_choice";

pub const CONSTRAINT_EXISTS: &str =
  "SELECT 1 FROM sd_constraints WHERE artifact_id = ?1 AND path = ?2 AND key = ?3";

pub const CONSTRAINT_UPSERT: &str = "
INSERT INTO sd_constraints (
    artifact_id, path, key, severity, human, expression, xpath,
    constraint_json, source_choice, loaded_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
ON CONFLICT (artifact_id, path, key) DO UPDATE SET
    severity        = excluded.severity,
    human           = excluded.human,
    expression      = excluded.expression,
    xpath           = excluded.xpath,
    constraint_json = excluded.constraint_json,
    source_choice   = excluded.source_choice,
    loaded_at       = excluded.loaded_at
WHERE sd_constraints.constraint_json IS NOT excluded.constraint_json
   OR sd_constraints.source_choice IS NOT excluded.source_choice";
