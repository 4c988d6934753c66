//! SQLite storage implementation

use std::path::{Path, PathBuf};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use crate::{Error, Result};
use super::schema;

/// Handle to an open decision index.
///
/// The connection is released when the store is dropped; `close` does the
/// same but reports failures.
pub struct IndexStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl IndexStore {
    /// Open the index of a repository read-only.
    ///
    /// Fails with `Error::Connection` when the index file or its schema is
    /// missing.
    pub fn open(repo_root: &Path) -> Result<Self> {
        Self::open_path(&crate::config::default_index_path(repo_root))
    }

    /// Open an existing index file read-only
    pub fn open_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Connection(format!("no index at {}", path.display())));
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)
            .map_err(|e| Error::Connection(format!("{}: {}", path.display(), e)))?;

        let store = Self { conn, path: Some(path.to_path_buf()) };
        store.verify_schema()?;
        tracing::debug!(path = %path.display(), "opened index");
        Ok(store)
    }

    /// Open a database file read-write (creates file and schema if needed)
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| Error::Connection(format!("{}: {}", path.display(), e)))?;
        let store = Self { conn, path: Some(path.to_path_buf()) };
        store.initialize_schema()?;
        tracing::debug!(path = %path.display(), "opened index for writing");
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn, path: None };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    /// Check that every required table exists
    fn verify_schema(&self) -> Result<()> {
        let location = self.describe();
        let mut stmt = self
            .conn
            .prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1")
            .map_err(|e| Error::Connection(format!("{}: {}", location, e)))?;

        for table in schema::REQUIRED_TABLES {
            let found = stmt
                .exists([table])
                .map_err(|e| Error::Connection(format!("{}: {}", location, e)))?;
            if !found {
                return Err(Error::Connection(format!("{} is missing table '{}'", location, table)));
            }
        }
        Ok(())
    }

    /// Underlying connection, for query modules and fixtures
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Location of the index file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn describe(&self) -> String {
        self.path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| ":memory:".to_string())
    }

    /// Release the connection
    pub fn close(self) -> Result<()> {
        let location = self.describe();
        self.conn.close().map_err(|(_, e)| Error::Query(e))?;
        tracing::debug!(path = %location, "closed index");
        Ok(())
    }

    // ========== Bulk Operations ==========

    /// Begin a transaction for bulk operations
    pub fn begin_transaction(&mut self) -> Result<()> {
        self.conn.execute("BEGIN TRANSACTION", [])?;
        Ok(())
    }

    /// Commit a transaction
    pub fn commit(&mut self) -> Result<()> {
        self.conn.execute("COMMIT", [])?;
        Ok(())
    }

    /// Rollback a transaction
    pub fn rollback(&mut self) -> Result<()> {
        self.conn.execute("ROLLBACK", [])?;
        Ok(())
    }

    /// Delete all decisions and associations (for re-indexing)
    pub fn clear_all(&self) -> Result<()> {
        self.conn.execute("DELETE FROM decision_files", [])?;
        self.conn.execute("DELETE FROM decision_refs", [])?;
        self.conn.execute("DELETE FROM decision_symbols", [])?;
        self.conn.execute("DELETE FROM decisions", [])?;
        Ok(())
    }

    // ========== Metadata ==========

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| row.get(0))
            .optional()
            .map_err(Into::into)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    // ========== Statistics ==========

    fn count(&self, table: &str) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Get index statistics
    pub fn stats(&self) -> Result<IndexStats> {
        let active: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM decisions WHERE status = 'active'",
            [],
            |row| row.get(0),
        )?;

        Ok(IndexStats {
            decisions: self.count("decisions")?,
            active: active as usize,
            files: self.count("decision_files")?,
            refs: self.count("decision_refs")?,
            symbols: self.count("decision_symbols")?,
        })
    }
}

/// Index statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStats {
    pub decisions: usize,
    pub active: usize,
    pub files: usize,
    pub refs: usize,
    pub symbols: usize,
}

impl std::fmt::Display for IndexStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Index Statistics:")?;
        writeln!(f, "  Decisions: {} ({} active)", self.decisions, self.active)?;
        writeln!(f, "  File links: {}", self.files)?;
        writeln!(f, "  Ref links: {}", self.refs)?;
        writeln!(f, "  Symbol links: {}", self.symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_index() {
        let dir = tempfile::tempdir().unwrap();
        let err = IndexStore::open(dir.path()).err().unwrap();
        assert!(matches!(err, Error::Connection(_)));
    }

    #[test]
    fn test_open_without_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.sqlite");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute("CREATE TABLE decisions (id TEXT PRIMARY KEY)", []).unwrap();
        }

        match IndexStore::open_path(&path) {
            Err(Error::Connection(msg)) => assert!(msg.contains("decision_files")),
            other => panic!("expected connection error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_create_then_open_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".keel").join("index.sqlite");

        let store = IndexStore::create(&path).unwrap();
        store.set_metadata("jsonl_mtime", "42").unwrap();
        store.close().unwrap();

        let store = IndexStore::open_path(&path).unwrap();
        assert_eq!(store.get_metadata("jsonl_mtime").unwrap().as_deref(), Some("42"));
        assert!(store.set_metadata("jsonl_mtime", "43").is_err());
    }

    #[test]
    fn test_stats_empty() {
        let store = IndexStore::open_in_memory().unwrap();
        let stats = store.stats().unwrap();
        assert_eq!(stats.decisions, 0);
        assert_eq!(stats.active, 0);
        assert!(store.path().is_none());
    }
}
