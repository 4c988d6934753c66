use tabled::{settings::Style, Table, Tabled};
use crate::decision::Decision;
use crate::query::{FileLink, RefLink};

const PROBLEM_WIDTH: usize = 60;

#[derive(Tabled)]
pub struct DecisionRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Type")]
    pub kind: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Created")]
    pub created: String,
    #[tabled(rename = "Problem")]
    pub problem: String,
}

impl From<&Decision> for DecisionRow {
    fn from(decision: &Decision) -> Self {
        Self {
            id: decision.id.clone(),
            kind: decision.kind.to_string(),
            status: decision.status.to_string(),
            created: decision.created_at.format("%Y-%m-%d").to_string(),
            problem: truncate(&decision.problem, PROBLEM_WIDTH),
        }
    }
}

pub struct DecisionTable {
    rows: Vec<DecisionRow>,
}

impl DecisionTable {
    pub fn new(decisions: &[Decision]) -> Self {
        Self {
            rows: decisions.iter().map(DecisionRow::from).collect(),
        }
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }
        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

#[derive(Tabled)]
pub struct LinkRow {
    #[tabled(rename = "Decision")]
    pub decision_id: String,
    #[tabled(rename = "Target")]
    pub target: String,
}

pub struct LinkTable {
    rows: Vec<LinkRow>,
}

impl LinkTable {
    pub fn from_refs(links: &[RefLink]) -> Self {
        Self {
            rows: links
                .iter()
                .map(|l| LinkRow { decision_id: l.decision_id.clone(), target: l.ref_id.clone() })
                .collect(),
        }
    }

    pub fn from_files(links: &[FileLink]) -> Self {
        Self {
            rows: links
                .iter()
                .map(|l| LinkRow { decision_id: l.decision_id.clone(), target: l.file_path.clone() })
                .collect(),
        }
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }
        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

fn truncate(text: &str, width: usize) -> String {
    let first_line = text.lines().next().unwrap_or("");
    if first_line.chars().count() <= width {
        return first_line.to_string();
    }
    let mut cut: String = first_line.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::DecisionType;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("first\nsecond", 10), "first");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }

    #[test]
    fn test_decision_table() {
        let created = Utc.with_ymd_and_hms(2025, 4, 2, 0, 0, 0).unwrap();
        let decisions = vec![Decision::new("DEC-00aa", DecisionType::Constraint, "No unsafe", "Forbid", created)];
        let rendered = DecisionTable::new(&decisions).build();
        assert!(rendered.contains("DEC-00aa"));
        assert!(rendered.contains("constraint"));
        assert!(rendered.contains("2025-04-02"));

        assert!(DecisionTable::new(&[]).build().is_empty());
    }
}
