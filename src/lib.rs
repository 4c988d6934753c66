//! # Keel - Decision Index
//!
//! Queryable index of architectural decisions recorded against a repository.
//!
//! Keel provides:
//! - A `Decision` model with a canonical JSON form
//! - SQLite-backed storage with file, symbol and ref associations
//! - Typed read queries and context resolution (file decisions + standing constraints)
//! - A guarded raw query gateway for ad-hoc read-only inspection
//! - An index builder that loads the append-only decisions log

pub mod decision;
pub mod storage;
pub mod query;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use decision::{Decision, DecisionStatus, DecisionType};
pub use query::{ContextResult, DecisionIndex, QueryOptions};
pub use storage::IndexStore;

/// Result type alias for Keel operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Keel operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to open index: {0}")]
    Connection(String),

    #[error("Write operations forbidden: {0}")]
    WriteForbidden(String),

    #[error("Query failed: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("Invalid decision ID: {0}. Expected format: DEC-xxxx (4 hex chars)")]
    InvalidId(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
