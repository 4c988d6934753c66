//! Index builder - populates the index from the decisions log
//!
//! The log (`.keel/decisions.jsonl`) is append-only: a decision is written
//! once and later lines with the same id (e.g. a status change on supersede)
//! override its top-level fields.

use std::collections::HashMap;
use std::path::Path;
use std::time::UNIX_EPOCH;
use chrono::SecondsFormat;
use rusqlite::params;
use crate::decision::Decision;
use crate::Result;
use super::IndexStore;

/// Metadata key holding the log mtime (ms since epoch) at last rebuild
pub const JSONL_MTIME_KEY: &str = "jsonl_mtime";

/// Outcome of a rebuild
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildStats {
    pub lines: usize,
    pub indexed: usize,
    pub skipped: usize,
}

impl std::fmt::Display for RebuildStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} lines read, {} decisions indexed, {} lines skipped",
            self.lines, self.indexed, self.skipped
        )
    }
}

/// Insert or update a decision and add its associations
///
/// An upsert rather than `INSERT OR REPLACE`: REPLACE deletes the old row
/// without firing delete triggers, which would leave stale full-text entries.
pub fn index_decision(store: &IndexStore, decision: &Decision) -> Result<()> {
    let conn = store.connection();
    conn.execute(
        r#"
        INSERT INTO decisions (id, type, status, problem, choice, rationale, created_at, raw_json)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(id) DO UPDATE SET
            type = excluded.type,
            status = excluded.status,
            problem = excluded.problem,
            choice = excluded.choice,
            rationale = excluded.rationale,
            created_at = excluded.created_at,
            raw_json = excluded.raw_json
        "#,
        params![
            decision.id,
            decision.kind.as_str(),
            decision.status.as_str(),
            decision.problem,
            decision.choice,
            decision.rationale,
            decision.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            decision.to_json()?,
        ],
    )?;

    for file in &decision.files {
        conn.execute(
            "INSERT OR IGNORE INTO decision_files (decision_id, file_path) VALUES (?1, ?2)",
            params![decision.id, file],
        )?;
    }
    for symbol in &decision.symbols {
        conn.execute(
            "INSERT OR IGNORE INTO decision_symbols (decision_id, symbol) VALUES (?1, ?2)",
            params![decision.id, symbol],
        )?;
    }
    for ref_id in &decision.refs {
        conn.execute(
            "INSERT OR IGNORE INTO decision_refs (decision_id, ref_id) VALUES (?1, ?2)",
            params![decision.id, ref_id],
        )?;
    }
    Ok(())
}

/// Clear the index and reload it from a decisions log
pub fn rebuild_from_jsonl(store: &mut IndexStore, jsonl_path: &Path) -> Result<RebuildStats> {
    let mut stats = RebuildStats::default();

    let content = if jsonl_path.exists() {
        std::fs::read_to_string(jsonl_path)?
    } else {
        String::new()
    };

    // Merge lines by id, keeping first-seen order
    let mut order: Vec<String> = Vec::new();
    let mut merged: HashMap<String, serde_json::Map<String, serde_json::Value>> = HashMap::new();

    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        stats.lines += 1;

        let object = match serde_json::from_str::<serde_json::Value>(line) {
            Ok(serde_json::Value::Object(obj)) => obj,
            Ok(_) => {
                tracing::warn!(line = lineno + 1, "skipping non-object line in decisions log");
                stats.skipped += 1;
                continue;
            }
            Err(e) => {
                tracing::warn!(line = lineno + 1, error = %e, "skipping unparseable line in decisions log");
                stats.skipped += 1;
                continue;
            }
        };

        let Some(id) = object.get("id").and_then(|v| v.as_str()).map(str::to_string) else {
            tracing::warn!(line = lineno + 1, "skipping decisions log line without id");
            stats.skipped += 1;
            continue;
        };

        match merged.get_mut(&id) {
            Some(existing) => existing.extend(object),
            None => {
                order.push(id.clone());
                merged.insert(id, object);
            }
        }
    }

    let mut decisions = Vec::with_capacity(order.len());
    for id in order {
        let Some(object) = merged.remove(&id) else { continue };
        match serde_json::from_value::<Decision>(serde_json::Value::Object(object)) {
            Ok(decision) => decisions.push(decision),
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "skipping invalid decision");
                stats.skipped += 1;
            }
        }
    }

    store.begin_transaction()?;
    let written = write_all(store, &decisions, jsonl_path);
    match written {
        Ok(()) => store.commit()?,
        Err(e) => {
            store.rollback()?;
            return Err(e);
        }
    }

    stats.indexed = decisions.len();
    tracing::debug!(%stats, "rebuilt index");
    Ok(stats)
}

fn write_all(store: &IndexStore, decisions: &[Decision], jsonl_path: &Path) -> Result<()> {
    store.clear_all()?;
    for decision in decisions {
        index_decision(store, decision)?;
    }
    if let Some(mtime) = log_mtime_ms(jsonl_path)? {
        store.set_metadata(JSONL_MTIME_KEY, &mtime.to_string())?;
    }
    Ok(())
}

/// Bring the index at `index_path` up to date with the log.
///
/// Creates the index when needed and rebuilds it when the log is newer than
/// the last rebuild. Returns `None` when nothing was rebuilt, including when
/// there is no log at all (no index file is created in that case).
pub fn refresh_index(index_path: &Path, jsonl_path: &Path) -> Result<Option<RebuildStats>> {
    if !jsonl_path.exists() {
        return Ok(None);
    }

    let mut store = IndexStore::create(index_path)?;
    let rebuilt = if needs_rebuild(&store, jsonl_path)? {
        Some(rebuild_from_jsonl(&mut store, jsonl_path)?)
    } else {
        None
    };
    store.close()?;
    Ok(rebuilt)
}

/// Whether the log has changed since the index was last rebuilt
pub fn needs_rebuild(store: &IndexStore, jsonl_path: &Path) -> Result<bool> {
    let Some(current) = log_mtime_ms(jsonl_path)? else {
        return Ok(false);
    };

    let stored = store
        .get_metadata(JSONL_MTIME_KEY)?
        .and_then(|v| v.parse::<u128>().ok());

    Ok(match stored {
        Some(stored) => current > stored,
        None => true,
    })
}

fn log_mtime_ms(path: &Path) -> Result<Option<u128>> {
    if !path.exists() {
        return Ok(None);
    }
    let modified = std::fs::metadata(path)?.modified()?;
    let ms = modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    Ok(Some(ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::{DecisionStatus, DecisionType};
    use chrono::{TimeZone, Utc};

    fn write_log(dir: &Path, lines: &[&str]) -> std::path::PathBuf {
        let path = dir.join("decisions.jsonl");
        std::fs::write(&path, lines.join("\n")).unwrap();
        path
    }

    #[test]
    fn test_index_decision_associations() {
        let store = IndexStore::open_in_memory().unwrap();
        let created = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let decision = Decision::new("DEC-0a0a", DecisionType::Product, "Retries", "Exponential backoff", created)
            .with_files(["src/net/*", "src/net/*"])
            .with_symbols(["Client::send"])
            .with_refs(["bd-7"]);

        index_decision(&store, &decision).unwrap();
        index_decision(&store, &decision).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.decisions, 1);
        assert_eq!(stats.files, 1);
        assert_eq!(stats.symbols, 1);
        assert_eq!(stats.refs, 1);
    }

    #[test]
    fn test_rebuild_merges_and_skips() {
        let dir = tempfile::tempdir().unwrap();
        let log = write_log(dir.path(), &[
            r#"{"id":"DEC-0001","created_at":"2025-01-01T00:00:00Z","type":"constraint","status":"active","problem":"p1","choice":"c1","files":["src/a.rs"]}"#,
            "not json at all",
            r#"{"id":"DEC-0002","created_at":"2025-01-02T00:00:00Z","type":"product","status":"active","problem":"p2","choice":"c2"}"#,
            r#"{"id":"DEC-0001","status":"superseded","superseded_by":"DEC-0002"}"#,
            r#"{"id":"DEC-0003","created_at":"2025-01-03T00:00:00Z","type":"product","status":"active","problem":"missing choice"}"#,
            "",
        ]);

        let mut store = IndexStore::open_in_memory().unwrap();
        let stats = rebuild_from_jsonl(&mut store, &log).unwrap();

        assert_eq!(stats.lines, 5);
        assert_eq!(stats.indexed, 2);
        assert_eq!(stats.skipped, 2);

        let status: String = store
            .connection()
            .query_row("SELECT status FROM decisions WHERE id = 'DEC-0001'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(status, DecisionStatus::Superseded.as_str());
        assert!(!needs_rebuild(&store, &log).unwrap());
    }

    #[test]
    fn test_rebuild_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = IndexStore::open_in_memory().unwrap();
        let created = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        index_decision(&store, &Decision::new("DEC-dead", DecisionType::Learning, "old", "gone", created)).unwrap();

        let log = write_log(dir.path(), &[
            r#"{"id":"DEC-0001","created_at":"2025-01-01T00:00:00Z","type":"process","status":"active","problem":"p","choice":"c"}"#,
        ]);
        rebuild_from_jsonl(&mut store, &log).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.decisions, 1);
    }

    #[test]
    fn test_reindexing_updates_full_text() {
        let store = IndexStore::open_in_memory().unwrap();
        let created = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        index_decision(&store, &Decision::new("DEC-0a0a", DecisionType::Product, "Queue", "Use cron", created)).unwrap();
        index_decision(&store, &Decision::new("DEC-0a0a", DecisionType::Product, "Queue", "Use a broker", created)).unwrap();

        let count = |term: &str| -> i64 {
            store
                .connection()
                .query_row("SELECT COUNT(*) FROM decisions_fts WHERE decisions_fts MATCH ?1", [term], |row| row.get(0))
                .unwrap()
        };
        assert_eq!(count("cron"), 0);
        assert_eq!(count("broker"), 1);
        assert_eq!(store.stats().unwrap().decisions, 1);
    }

    #[test]
    fn test_refresh_index_builds_fresh_repo() {
        let dir = tempfile::tempdir().unwrap();
        let index_path = dir.path().join("keel/index.sqlite");
        let log = dir.path().join("decisions.jsonl");

        assert_eq!(refresh_index(&index_path, &log).unwrap(), None);
        assert!(!index_path.exists());

        write_log(dir.path(), &[
            r#"{"id":"DEC-0001","created_at":"2025-01-01T00:00:00Z","type":"process","status":"active","problem":"p","choice":"c"}"#,
        ]);
        let stats = refresh_index(&index_path, &log).unwrap().unwrap();
        assert_eq!(stats.indexed, 1);

        assert_eq!(refresh_index(&index_path, &log).unwrap(), None);
        let store = IndexStore::open_path(&index_path).unwrap();
        assert_eq!(store.stats().unwrap().decisions, 1);
    }

    #[test]
    fn test_needs_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::open_in_memory().unwrap();
        let log = dir.path().join("decisions.jsonl");

        assert!(!needs_rebuild(&store, &log).unwrap());

        std::fs::write(&log, "").unwrap();
        assert!(needs_rebuild(&store, &log).unwrap());

        store.set_metadata(JSONL_MTIME_KEY, &u128::MAX.to_string()).unwrap();
        assert!(!needs_rebuild(&store, &log).unwrap());

        store.set_metadata(JSONL_MTIME_KEY, "0").unwrap();
        assert!(needs_rebuild(&store, &log).unwrap());
    }
}
