//! Decision types - the domain model of the index
//!
//! A decision records a problem, the choice made and why. Decisions are
//! classified by type:
//! - `Product`: what the software does
//! - `Process`: how the team works
//! - `Constraint`: a standing rule that applies regardless of file
//! - `Learning`: something discovered along the way
//!
//! The serialized JSON form is the canonical payload stored in `raw_json`.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Prefix shared by every decision identifier
pub const ID_PREFIX: &str = "DEC";

/// Decision classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionType {
    Product,
    Process,
    /// Standing rule, always relevant while active
    Constraint,
    Learning,
}

impl DecisionType {
    /// Get the string representation stored in the `type` column
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionType::Product => "product",
            DecisionType::Process => "process",
            DecisionType::Constraint => "constraint",
            DecisionType::Learning => "learning",
        }
    }

    /// Get all decision types
    pub fn all() -> &'static [DecisionType] {
        &[
            DecisionType::Product,
            DecisionType::Process,
            DecisionType::Constraint,
            DecisionType::Learning,
        ]
    }
}

impl FromStr for DecisionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "product" => Ok(DecisionType::Product),
            "process" => Ok(DecisionType::Process),
            "constraint" => Ok(DecisionType::Constraint),
            "learning" => Ok(DecisionType::Learning),
            _ => Err(Error::Parse(format!("Unknown decision type: {}", s))),
        }
    }
}

impl std::fmt::Display for DecisionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionStatus {
    /// Currently in force
    Active,
    /// Replaced by a newer decision (see `superseded_by`)
    Superseded,
    Retracted,
}

impl DecisionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionStatus::Active => "active",
            DecisionStatus::Superseded => "superseded",
            DecisionStatus::Retracted => "retracted",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, DecisionStatus::Active)
    }
}

impl FromStr for DecisionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "active" => Ok(DecisionStatus::Active),
            "superseded" => Ok(DecisionStatus::Superseded),
            "retracted" => Ok(DecisionStatus::Retracted),
            _ => Err(Error::Parse(format!("Unknown decision status: {}", s))),
        }
    }
}

impl std::fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Who made a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeciderRole {
    Human,
    Agent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecidedBy {
    pub role: DeciderRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
}

/// A recorded architectural decision.
///
/// Association lists (`files`, `symbols`, `refs`) are carried as the writer
/// embedded them. The relationship tables are the join source for queries;
/// these fields are returned verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Unique identifier, `DEC-xxxx`
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: DecisionType,
    pub status: DecisionStatus,
    pub problem: String,
    pub choice: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tradeoffs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<DecidedBy>,
    /// File paths or glob patterns this decision affects
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symbols: Vec<String>,
    /// External reference ids (issues, tickets)
    #[serde(default, alias = "beads", skip_serializing_if = "Vec::is_empty")]
    pub refs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supersedes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superseded_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hypothesis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_criteria: Option<String>,
}

impl Decision {
    /// Create an active decision with minimal required fields
    pub fn new(
        id: impl Into<String>,
        kind: DecisionType,
        problem: impl Into<String>,
        choice: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            created_at,
            kind,
            status: DecisionStatus::Active,
            problem: problem.into(),
            choice: choice.into(),
            rationale: None,
            tradeoffs: Vec::new(),
            decided_by: None,
            files: Vec::new(),
            symbols: Vec::new(),
            refs: Vec::new(),
            supersedes: None,
            superseded_by: None,
            hypothesis: None,
            success_criteria: None,
        }
    }

    pub fn with_status(mut self, status: DecisionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }

    pub fn with_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.symbols = symbols.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_refs<I, S>(mut self, refs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.refs = refs.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn is_constraint(&self) -> bool {
        self.kind == DecisionType::Constraint
    }

    /// Parse the canonical JSON payload
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Serialize to the canonical JSON payload
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Check whether `id` has the `DEC-xxxx` form (case-insensitive)
pub fn is_valid_id(id: &str) -> bool {
    match id.get(..4) {
        Some(prefix) if prefix.eq_ignore_ascii_case("DEC-") => is_hex_suffix(&id[4..]),
        _ => false,
    }
}

/// Normalize user input to a canonical decision id.
///
/// Accepts `DEC-a1b2`, `dec-A1B2` or a bare `a1b2`; the suffix is always
/// lowercased.
pub fn normalize_id(input: &str) -> Result<String> {
    let trimmed = input.trim();

    let suffix = match trimmed.get(..4) {
        Some(prefix) if prefix.eq_ignore_ascii_case("DEC-") => &trimmed[4..],
        _ => trimmed,
    };

    if !is_hex_suffix(suffix) {
        return Err(Error::InvalidId(input.to_string()));
    }

    Ok(format!("{}-{}", ID_PREFIX, suffix.to_ascii_lowercase()))
}

fn is_hex_suffix(s: &str) -> bool {
    s.len() == 4 && s.chars().all(|c| c.is_ascii_hexdigit())
}
