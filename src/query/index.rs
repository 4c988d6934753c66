//! Typed decision queries
//!
//! Provides the read operations over the index:
//! - Lookup by id
//! - Active decisions by file pattern, symbol or external ref
//! - Filtered listing and ranked full-text search
//! - Context resolution (file decisions + standing constraints)
//! - Raw enumeration of the file and ref association tables
//!
//! Every query returns decisions decoded from `raw_json`, newest first.

use rusqlite::{Params, OptionalExtension, params_from_iter};
use serde::{Deserialize, Serialize};
use crate::Result;
use crate::decision::{Decision, DecisionStatus, DecisionType};
use crate::storage::IndexStore;
use super::decode::decode_decisions;

/// Tie-break on insertion order when timestamps collide
const NEWEST_FIRST: &str = "ORDER BY d.created_at DESC, d.rowid DESC";

/// Optional filters for `all` and `search`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub kind: Option<DecisionType>,
    pub status: Option<DecisionStatus>,
    /// Maximum number of results; `<= 0` means unbounded
    pub limit: i64,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: DecisionType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn status(mut self, status: DecisionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }
}

/// Decisions relevant to a path, kept apart from the standing constraints
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContextResult {
    pub decisions: Vec<Decision>,
    pub constraints: Vec<Decision>,
}

impl ContextResult {
    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty() && self.constraints.is_empty()
    }
}

/// Decision-to-ref association
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefLink {
    pub decision_id: String,
    pub ref_id: String,
}

/// Decision-to-file association
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLink {
    pub decision_id: String,
    pub file_path: String,
}

/// Translate a `*` glob into a LIKE pattern (escape character `\`).
///
/// `*` is the only wildcard; literal `%`, `_` and `\` are escaped. A pattern
/// without `*` matches exactly.
pub fn glob_to_like(pattern: &str) -> String {
    let mut like = String::with_capacity(pattern.len() + 4);
    for c in pattern.chars() {
        match c {
            '*' => like.push('%'),
            _ => push_escaped(&mut like, c),
        }
    }
    like
}

/// LIKE pattern matching `text` anywhere, with no wildcards of its own
fn contains_like(text: &str) -> String {
    let mut like = String::with_capacity(text.len() + 4);
    like.push('%');
    for c in text.chars() {
        push_escaped(&mut like, c);
    }
    like.push('%');
    like
}

fn push_escaped(like: &mut String, c: char) {
    if matches!(c, '%' | '_' | '\\') {
        like.push('\\');
    }
    like.push(c);
}

/// Read-only query interface over an open index
pub struct DecisionIndex<'a> {
    store: &'a IndexStore,
}

impl<'a> DecisionIndex<'a> {
    pub fn new(store: &'a IndexStore) -> Self {
        Self { store }
    }

    /// Run a query selecting `raw_json` as its only column
    fn query_decisions<P: Params>(&self, label: &str, sql: &str, params: P) -> Result<Vec<Decision>> {
        let mut stmt = self.store.connection().prepare(sql)?;
        let rows = stmt.query_map(params, |row| row.get::<_, String>(0))?;
        let decoded = decode_decisions(rows);

        if decoded.skipped > 0 {
            tracing::warn!(query = label, skipped = decoded.skipped, "dropped undecodable rows");
        }
        tracing::debug!(query = label, count = decoded.items.len(), "query complete");

        Ok(decoded.into_inner())
    }

    /// Get a decision by id. Absent and undecodable rows both yield `None`.
    pub fn by_id(&self, id: &str) -> Result<Option<Decision>> {
        let raw: Option<String> = self
            .store
            .connection()
            .query_row("SELECT raw_json FROM decisions WHERE id = ?1", [id], |row| row.get(0))
            .optional()?;

        Ok(raw.and_then(|raw| match Decision::from_json(&raw) {
            Ok(decision) => Some(decision),
            Err(e) => {
                tracing::warn!(id, error = %e, "dropped undecodable decision");
                None
            }
        }))
    }

    /// Active decisions linked to a file matching `pattern` (`*` wildcard)
    pub fn by_file(&self, pattern: &str) -> Result<Vec<Decision>> {
        let sql = format!(
            r"SELECT d.raw_json FROM decisions d
              WHERE d.id IN (
                  SELECT decision_id FROM decision_files WHERE file_path LIKE ?1 ESCAPE '\'
              )
              AND d.status = 'active'
              {}",
            NEWEST_FIRST
        );
        self.query_decisions("by_file", &sql, [glob_to_like(pattern)])
    }

    /// Active decisions concerning exactly `symbol`
    pub fn by_symbol(&self, symbol: &str) -> Result<Vec<Decision>> {
        let sql = format!(
            "SELECT d.raw_json FROM decisions d
             WHERE d.id IN (SELECT decision_id FROM decision_symbols WHERE symbol = ?1)
             AND d.status = 'active'
             {}",
            NEWEST_FIRST
        );
        self.query_decisions("by_symbol", &sql, [symbol])
    }

    /// Active decisions linked to an external reference
    pub fn by_ref(&self, ref_id: &str) -> Result<Vec<Decision>> {
        let sql = format!(
            "SELECT d.raw_json FROM decisions d
             WHERE d.id IN (SELECT decision_id FROM decision_refs WHERE ref_id = ?1)
             AND d.status = 'active'
             {}",
            NEWEST_FIRST
        );
        self.query_decisions("by_ref", &sql, [ref_id])
    }

    /// All decisions matching the optional type and status filters
    pub fn all(&self, options: &QueryOptions) -> Result<Vec<Decision>> {
        let mut sql = String::from("SELECT d.raw_json FROM decisions d WHERE 1=1");
        let args = push_filters(&mut sql, options);
        push_order_and_limit(&mut sql, options);
        self.query_decisions("all", &sql, params_from_iter(args))
    }

    /// Active constraints, regardless of file association
    pub fn active_constraints(&self) -> Result<Vec<Decision>> {
        let sql = format!(
            "SELECT d.raw_json FROM decisions d
             WHERE d.type = 'constraint' AND d.status = 'active'
             {}",
            NEWEST_FIRST
        );
        self.query_decisions("active_constraints", &sql, [])
    }

    /// Decisions for a file path alongside every active constraint
    pub fn for_context(&self, path: &str) -> Result<ContextResult> {
        let decisions = self.by_file(path)?;
        let constraints = self.active_constraints()?;
        Ok(ContextResult { decisions, constraints })
    }

    /// Like `for_context`, falling back to a symbol lookup when no file
    /// decision matches `target`
    pub fn for_context_or_symbol(&self, target: &str) -> Result<ContextResult> {
        let mut result = self.for_context(target)?;
        if result.decisions.is_empty() {
            result.decisions = self.by_symbol(target)?;
        }
        Ok(result)
    }

    /// Full-text search over id, problem, choice and rationale, best match first.
    ///
    /// `text` is an FTS5 query. When it is not valid FTS5 syntax (or the index
    /// has no full-text table) the search falls back to a case-insensitive
    /// substring match, newest first.
    pub fn search(&self, text: &str, options: &QueryOptions) -> Result<Vec<Decision>> {
        match self.search_ranked(text, options) {
            Ok(decisions) => Ok(decisions),
            Err(e) => {
                tracing::debug!(query = text, error = %e, "full-text search failed, matching substrings");
                self.search_substring(text, options)
            }
        }
    }

    fn search_ranked(&self, text: &str, options: &QueryOptions) -> Result<Vec<Decision>> {
        let mut sql = String::from(
            "SELECT d.raw_json FROM decisions d
             JOIN (SELECT rowid, rank FROM decisions_fts WHERE decisions_fts MATCH ?1) f ON f.rowid = d.rowid
             WHERE 1=1",
        );
        let mut args = vec![text.to_string()];
        args.extend(push_filters(&mut sql, options));
        sql.push_str(" ORDER BY f.rank, d.created_at DESC, d.rowid DESC");
        push_limit(&mut sql, options);

        // FTS5 reports syntax errors while stepping; collect so they surface as errors
        let mut stmt = self.store.connection().prepare(&sql)?;
        let raw = stmt
            .query_map(params_from_iter(args), |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        let decoded = decode_decisions(raw.into_iter().map(Ok));
        if decoded.skipped > 0 {
            tracing::warn!(query = "search", skipped = decoded.skipped, "dropped undecodable rows");
        }
        Ok(decoded.into_inner())
    }

    fn search_substring(&self, text: &str, options: &QueryOptions) -> Result<Vec<Decision>> {
        let pattern = contains_like(text);
        let mut sql = String::from(
            r"SELECT d.raw_json FROM decisions d
              WHERE (d.problem LIKE ?1 ESCAPE '\' OR d.choice LIKE ?1 ESCAPE '\' OR d.rationale LIKE ?1 ESCAPE '\')",
        );
        let mut args = vec![pattern];
        args.extend(push_filters(&mut sql, options));
        push_order_and_limit(&mut sql, options);
        self.query_decisions("search", &sql, params_from_iter(args))
    }

    /// Every decision-to-ref link, in storage order
    pub fn all_refs(&self) -> Result<Vec<RefLink>> {
        let mut stmt = self
            .store
            .connection()
            .prepare("SELECT decision_id, ref_id FROM decision_refs")?;

        let links = stmt
            .query_map([], |row| {
                Ok(RefLink {
                    decision_id: row.get(0)?,
                    ref_id: row.get(1)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(links)
    }

    /// Every decision-to-file link, in storage order
    pub fn all_file_links(&self) -> Result<Vec<FileLink>> {
        let mut stmt = self
            .store
            .connection()
            .prepare("SELECT decision_id, file_path FROM decision_files")?;

        let links = stmt
            .query_map([], |row| {
                Ok(FileLink {
                    decision_id: row.get(0)?,
                    file_path: row.get(1)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(links)
    }
}

/// Append `AND` clauses for the type/status filters, returning their values.
/// Placeholders are anonymous so they number after any earlier `?N`.
fn push_filters(sql: &mut String, options: &QueryOptions) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(kind) = options.kind {
        sql.push_str(" AND d.type = ?");
        args.push(kind.as_str().to_string());
    }
    if let Some(status) = options.status {
        sql.push_str(" AND d.status = ?");
        args.push(status.as_str().to_string());
    }
    args
}

fn push_order_and_limit(sql: &mut String, options: &QueryOptions) {
    sql.push(' ');
    sql.push_str(NEWEST_FIRST);
    push_limit(sql, options);
}

fn push_limit(sql: &mut String, options: &QueryOptions) {
    if options.limit > 0 {
        sql.push_str(&format!(" LIMIT {}", options.limit));
    }
}
