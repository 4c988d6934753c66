//! Database schema definitions

/// SQL to create the decisions table
///
/// `raw_json` is the canonical payload; the other columns exist for lookup.
pub const CREATE_DECISIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS decisions (
    id TEXT PRIMARY KEY,
    type TEXT NOT NULL,
    status TEXT NOT NULL,
    problem TEXT NOT NULL,
    choice TEXT NOT NULL,
    rationale TEXT,
    created_at TEXT NOT NULL,
    raw_json TEXT NOT NULL
)
"#;

/// SQL to create the decision_files table
pub const CREATE_DECISION_FILES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS decision_files (
    decision_id TEXT NOT NULL,
    file_path TEXT NOT NULL,
    PRIMARY KEY (decision_id, file_path)
)
"#;

/// SQL to create the decision_refs table
pub const CREATE_DECISION_REFS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS decision_refs (
    decision_id TEXT NOT NULL,
    ref_id TEXT NOT NULL,
    PRIMARY KEY (decision_id, ref_id)
)
"#;

/// SQL to create the decision_symbols table
pub const CREATE_DECISION_SYMBOLS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS decision_symbols (
    decision_id TEXT NOT NULL,
    symbol TEXT NOT NULL,
    PRIMARY KEY (decision_id, symbol)
)
"#;

/// SQL to create the metadata table
/// Holds bookkeeping such as the decisions log mtime at last rebuild
pub const CREATE_METADATA_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
"#;

/// SQL to create the full-text table over decision text
///
/// External-content FTS5: rows are keyed by `decisions.rowid` and the text is
/// read back from `decisions`, so it must be kept in sync by the triggers below.
pub const CREATE_DECISIONS_FTS_TABLE: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS decisions_fts USING fts5(
    id,
    problem,
    choice,
    rationale,
    content='decisions',
    content_rowid='rowid'
)
"#;

/// Triggers mirroring every write to `decisions` into `decisions_fts`
pub const CREATE_FTS_TRIGGERS: &[&str] = &[
    r#"
CREATE TRIGGER IF NOT EXISTS decisions_ai AFTER INSERT ON decisions BEGIN
    INSERT INTO decisions_fts(rowid, id, problem, choice, rationale)
    VALUES (new.rowid, new.id, new.problem, new.choice, new.rationale);
END
"#,
    r#"
CREATE TRIGGER IF NOT EXISTS decisions_ad AFTER DELETE ON decisions BEGIN
    INSERT INTO decisions_fts(decisions_fts, rowid, id, problem, choice, rationale)
    VALUES ('delete', old.rowid, old.id, old.problem, old.choice, old.rationale);
END
"#,
    r#"
CREATE TRIGGER IF NOT EXISTS decisions_au AFTER UPDATE ON decisions BEGIN
    INSERT INTO decisions_fts(decisions_fts, rowid, id, problem, choice, rationale)
    VALUES ('delete', old.rowid, old.id, old.problem, old.choice, old.rationale);
    INSERT INTO decisions_fts(rowid, id, problem, choice, rationale)
    VALUES (new.rowid, new.id, new.problem, new.choice, new.rationale);
END
"#,
];

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_decisions_type_status ON decisions(type, status)",
    "CREATE INDEX IF NOT EXISTS idx_decisions_created ON decisions(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_files_path ON decision_files(file_path)",
    "CREATE INDEX IF NOT EXISTS idx_refs_ref ON decision_refs(ref_id)",
    "CREATE INDEX IF NOT EXISTS idx_symbols_name ON decision_symbols(symbol)",
];

/// Tables a usable index must contain
///
/// `decisions_fts` is not required: search falls back to substring matching
/// on indexes built without it.
pub const REQUIRED_TABLES: &[&str] = &[
    "decisions",
    "decision_files",
    "decision_refs",
    "decision_symbols",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_DECISIONS_TABLE,
        CREATE_DECISION_FILES_TABLE,
        CREATE_DECISION_REFS_TABLE,
        CREATE_DECISION_SYMBOLS_TABLE,
        CREATE_DECISIONS_FTS_TABLE,
        CREATE_METADATA_TABLE,
    ];
    stmts.extend(CREATE_FTS_TRIGGERS.iter().copied());
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
