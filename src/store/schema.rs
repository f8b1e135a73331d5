//! Relational schema for a persisted call graph.
//!
//! Row ids are registry ids plus one. The default package is stored as the
//! empty string so `UNIQUE(name, package)` holds for it too.

use rusqlite::Connection;

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS types (
    id           INTEGER PRIMARY KEY,
    name         TEXT NOT NULL,
    package      TEXT NOT NULL DEFAULT '',
    location     TEXT NOT NULL,
    is_interface INTEGER NOT NULL DEFAULT 0,
    is_abstract  INTEGER NOT NULL DEFAULT 0,
    superclass   TEXT,
    interfaces   TEXT NOT NULL DEFAULT '',
    UNIQUE(name, package)
);

CREATE TABLE IF NOT EXISTS members (
    id          INTEGER PRIMARY KEY,
    type_id     INTEGER NOT NULL REFERENCES types(id) ON DELETE CASCADE,
    name        TEXT NOT NULL,
    signature   TEXT NOT NULL,
    return_type TEXT NOT NULL,
    is_static   INTEGER NOT NULL DEFAULT 0,
    is_public   INTEGER NOT NULL DEFAULT 0,
    start_line  INTEGER NOT NULL,
    end_line    INTEGER NOT NULL,
    UNIQUE(type_id, signature)
);

CREATE TABLE IF NOT EXISTS call_edges (
    id                    INTEGER PRIMARY KEY,
    caller_member_id      INTEGER NOT NULL REFERENCES members(id) ON DELETE CASCADE,
    call_ordinal          INTEGER NOT NULL,
    kind                  TEXT NOT NULL,
    called_type_hint      TEXT,
    called_name           TEXT NOT NULL,
    called_signature_hint TEXT,
    line_number           INTEGER NOT NULL,
    resolved_member_id    INTEGER REFERENCES members(id) ON DELETE SET NULL,
    resolved_type         TEXT,
    in_try                INTEGER NOT NULL DEFAULT 0,
    in_catch              INTEGER NOT NULL DEFAULT 0,
    in_finally            INTEGER NOT NULL DEFAULT 0,
    loop_kind             TEXT,
    conditional_kind      TEXT,
    in_lambda             INTEGER NOT NULL DEFAULT 0,
    UNIQUE(caller_member_id, call_ordinal)
);

CREATE TABLE IF NOT EXISTS imports (
    id          INTEGER PRIMARY KEY,
    type_id     INTEGER NOT NULL REFERENCES types(id) ON DELETE CASCADE,
    path        TEXT NOT NULL,
    is_wildcard INTEGER NOT NULL DEFAULT 0,
    is_static   INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS fields (
    id        INTEGER PRIMARY KEY,
    type_id   INTEGER NOT NULL REFERENCES types(id) ON DELETE CASCADE,
    name      TEXT NOT NULL,
    type_name TEXT NOT NULL,
    is_static INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_members_type ON members(type_id);
CREATE INDEX IF NOT EXISTS idx_edges_caller ON call_edges(caller_member_id);
CREATE INDEX IF NOT EXISTS idx_edges_resolved ON call_edges(resolved_member_id);
CREATE INDEX IF NOT EXISTS idx_imports_type ON imports(type_id);
CREATE INDEX IF NOT EXISTS idx_fields_type ON fields(type_id);
"#;

/// Enable foreign keys and create any missing tables.
pub fn apply(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(SCHEMA)
}
