//! End-to-end checks against an on-disk repository layout

use std::path::Path;
use keel::config;
use keel::query::{self, DecisionIndex, QueryOptions, RawValue};
use keel::storage::{self, IndexStore};
use keel::{DecisionStatus, DecisionType, Error};

const LOG: &str = r#"{"id":"DEC-0001","created_at":"2025-01-01T09:00:00Z","type":"constraint","status":"active","problem":"Money precision","choice":"Integer cents","files":["src/billing/*"]}
{"id":"DEC-0002","created_at":"2025-01-02T09:00:00Z","type":"product","status":"active","problem":"Invoice retries","choice":"Retry three times","files":["src/billing/handler"],"symbols":["Invoice::send"],"refs":["bd-12"]}
{"id":"DEC-0003","created_at":"2025-01-03T09:00:00Z","type":"product","status":"active","problem":"Sessions","choice":"Signed cookies","files":["src/auth/handler"]}
this line is garbage
{"id":"DEC-0004","created_at":"2025-01-04T09:00:00Z","type":"constraint","status":"active","problem":"No unsafe","choice":"Forbid unsafe code"}
{"id":"DEC-0003","status":"superseded","superseded_by":"DEC-0005"}
{"id":"DEC-0005","created_at":"2025-01-05T09:00:00Z","type":"product","status":"active","problem":"Sessions","choice":"Server-side sessions","supersedes":"DEC-0003","files":["src/auth/handler"]}
"#;

fn build_repo(root: &Path) {
    std::fs::create_dir_all(config::keel_dir(root)).unwrap();
    std::fs::write(config::default_decisions_path(root), LOG).unwrap();

    let mut store = IndexStore::create(&config::default_index_path(root)).unwrap();
    let stats = storage::rebuild_from_jsonl(&mut store, &config::default_decisions_path(root)).unwrap();
    assert_eq!(stats.indexed, 5);
    assert_eq!(stats.skipped, 1);
    store.close().unwrap();
}

#[test]
fn context_resolution_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    build_repo(dir.path());

    let store = IndexStore::open(dir.path()).unwrap();
    let index = DecisionIndex::new(&store);

    let auth = index.for_context("src/auth/handler").unwrap();
    let ids: Vec<_> = auth.decisions.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["DEC-0005"]);
    let constraint_ids: Vec<_> = auth.constraints.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(constraint_ids, vec!["DEC-0004", "DEC-0001"]);

    let superseded = index.by_id("DEC-0003").unwrap().unwrap();
    assert_eq!(superseded.status, DecisionStatus::Superseded);
    assert_eq!(superseded.superseded_by.as_deref(), Some("DEC-0005"));

    let options = QueryOptions::new()
        .kind(DecisionType::Constraint)
        .status(DecisionStatus::Active)
        .limit(2);
    assert_eq!(index.all(&options).unwrap().len(), 2);

    store.close().unwrap();
}

#[test]
fn glob_pattern_covers_stored_globs() {
    let dir = tempfile::tempdir().unwrap();
    build_repo(dir.path());

    let store = IndexStore::open(dir.path()).unwrap();
    let index = DecisionIndex::new(&store);

    // "src/billing/*" is both a stored association and a query pattern
    let exact: Vec<_> = index.by_file("src/billing/*").unwrap().into_iter().map(|d| d.id).collect();
    assert_eq!(exact, vec!["DEC-0002", "DEC-0001"]);

    let links = index.all_file_links().unwrap();
    assert!(links.iter().any(|l| l.file_path == "src/billing/*"));
}

#[test]
fn raw_gateway_is_read_only() {
    let dir = tempfile::tempdir().unwrap();
    build_repo(dir.path());

    let store = IndexStore::open(dir.path()).unwrap();

    let rejected = query::execute_raw(&store, "Drop Table decisions").unwrap_err();
    assert!(matches!(rejected, Error::WriteForbidden(_)));

    // Passes the keyword guard but the connection itself is read-only
    let cte = query::execute_raw(&store, "WITH t AS (SELECT 1) DELETE FROM decision_files");
    assert!(matches!(cte, Err(Error::Query(_))));

    let count = query::execute_raw(&store, "SELECT COUNT(*) AS n FROM decision_files").unwrap();
    assert_eq!(count.rows[0].get("n"), Some(&RawValue::Integer(4)));
}

#[test]
fn open_fails_before_any_query() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(IndexStore::open(dir.path()), Err(Error::Connection(_))));

    std::fs::create_dir_all(config::keel_dir(dir.path())).unwrap();
    std::fs::write(config::default_index_path(dir.path()), b"definitely not sqlite").unwrap();
    assert!(matches!(IndexStore::open(dir.path()), Err(Error::Connection(_))));
}

#[test]
fn stale_index_detection() {
    let dir = tempfile::tempdir().unwrap();
    build_repo(dir.path());

    let store = IndexStore::open(dir.path()).unwrap();
    let log = config::default_decisions_path(dir.path());
    assert!(!storage::needs_rebuild(&store, &log).unwrap());
}

#[test]
fn fresh_repository_is_indexed_on_first_use() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(config::keel_dir(dir.path())).unwrap();
    std::fs::write(config::default_decisions_path(dir.path()), LOG).unwrap();

    let config = config::load_config(dir.path()).unwrap();
    assert!(config.auto_reindex);
    let stats = storage::refresh_index(
        &config::resolve_index_path(dir.path(), &config),
        &config::resolve_decisions_path(dir.path(), &config),
    )
    .unwrap()
    .unwrap();
    assert_eq!(stats.indexed, 5);

    let store = IndexStore::open(dir.path()).unwrap();
    let found = DecisionIndex::new(&store).search("sessions", &QueryOptions::new()).unwrap();
    let ids: Vec<_> = found.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["DEC-0005", "DEC-0003"]);
}
