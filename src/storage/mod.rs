//! Storage Layer - SQLite-backed decision index
//!
//! The index lives at `<repo>/.keel/index.sqlite` with tables:
//! - decisions(id, type, status, problem, choice, rationale, created_at, raw_json)
//! - decision_files(decision_id, file_path)
//! - decision_refs(decision_id, ref_id)
//! - decision_symbols(decision_id, symbol)
//! - decisions_fts: FTS5 over id, problem, choice and rationale, kept in sync
//!   with `decisions` by triggers
//! - metadata(key, value)

pub mod builder;
pub mod schema;
pub mod sqlite;

pub use builder::{RebuildStats, index_decision, needs_rebuild, rebuild_from_jsonl, refresh_index};
pub use sqlite::{IndexStore, IndexStats};
