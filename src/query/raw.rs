//! Raw query gateway
//!
//! Runs ad-hoc SQL against the index and shapes whatever comes back into
//! ordered rows of `RawValue`s.
//!
//! The write guard is a best-effort check on the first keyword of the query,
//! after any leading comments. It is not a parser: statements that mutate
//! behind a different leading keyword (`WITH ... DELETE`, multi-statement
//! text) are not caught by it. Indexes opened with `IndexStore::open` are read-only at the
//! connection level as well.

use rusqlite::types::ValueRef;
use serde::ser::{Serialize, SerializeMap, Serializer};
use crate::{Error, Result};
use crate::storage::IndexStore;

/// Leading keywords rejected by the gateway
pub const WRITE_KEYWORDS: &[&str] = &["INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "CREATE"];

/// A single cell of a raw result
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Integer(i64),
    Real(f64),
    /// TEXT columns, and BLOB columns rendered as text
    Text(String),
}

impl From<ValueRef<'_>> for RawValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => RawValue::Null,
            ValueRef::Integer(i) => RawValue::Integer(i),
            ValueRef::Real(f) => RawValue::Real(f),
            ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
                RawValue::Text(String::from_utf8_lossy(bytes).into_owned())
            }
        }
    }
}

impl std::fmt::Display for RawValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawValue::Null => write!(f, "NULL"),
            RawValue::Integer(i) => write!(f, "{}", i),
            RawValue::Real(r) => write!(f, "{}", r),
            RawValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl Serialize for RawValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            RawValue::Null => serializer.serialize_none(),
            RawValue::Integer(i) => serializer.serialize_i64(*i),
            RawValue::Real(r) => serializer.serialize_f64(*r),
            RawValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// One result row: column name to value, in column order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    cells: Vec<(String, RawValue)>,
}

impl RawRow {
    pub fn get(&self, column: &str) -> Option<&RawValue> {
        self.cells.iter().find(|(name, _)| name == column).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.cells.iter().map(|(name, v)| (name.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Serialize for RawRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (name, value) in &self.cells {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Rows returned by a raw query, in store order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResult {
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// The query text after leading whitespace and `--` / `/* */` comments
fn statement_start(query: &str) -> &str {
    let mut rest = query.trim_start();
    loop {
        if let Some(comment) = rest.strip_prefix("--") {
            rest = comment.split_once('\n').map_or("", |(_, after)| after).trim_start();
        } else if let Some(comment) = rest.strip_prefix("/*") {
            rest = comment.split_once("*/").map_or("", |(_, after)| after).trim_start();
        } else {
            return rest;
        }
    }
}

/// Reject queries whose first keyword mutates data or schema
pub fn check_read_only(query: &str) -> Result<()> {
    let normalized = statement_start(query).to_uppercase();
    let first = normalized
        .split(|c: char| !c.is_ascii_alphabetic())
        .next()
        .unwrap_or("");

    if WRITE_KEYWORDS.contains(&first) {
        return Err(Error::WriteForbidden(format!("{} statements are not allowed, only read queries", first)));
    }
    Ok(())
}

/// Validate and run a read query, shaping every row generically
pub fn execute_raw(store: &IndexStore, query: &str) -> Result<RawResult> {
    if statement_start(query).is_empty() {
        return Err(Error::Parse("empty query".to_string()));
    }
    check_read_only(query)?;

    let mut stmt = store.connection().prepare(query)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut rows = Vec::new();
    let mut cursor = stmt.query([])?;
    while let Some(row) = cursor.next()? {
        let mut cells = Vec::with_capacity(columns.len());
        for (idx, name) in columns.iter().enumerate() {
            cells.push((name.clone(), RawValue::from(row.get_ref(idx)?)));
        }
        rows.push(RawRow { cells });
    }

    tracing::debug!(columns = columns.len(), rows = rows.len(), "raw query complete");
    Ok(RawResult { columns, rows })
}
