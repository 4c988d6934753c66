use std::path::Path;
use crate::decision::Decision;
use crate::storage::RebuildStats;
use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;

/// Dimmed field label, e.g. `Problem:`
pub fn label(text: &str) -> String {
    text.style(theme().label).to_string()
}

/// Distinct "nothing found" line, never printed for errors
pub fn empty(text: &str) {
    println!("{} {}", Icons::EMPTY, label(text));
}

pub fn failure(message: &str) {
    eprintln!("{} {}", Icons::CROSS, message.style(theme().failure));
}

pub fn context_header(target: &str) {
    println!("{} Context for {}", Icons::PIN, target.style(theme().heading));
}

/// Section rule with an item count, e.g. `━ 🔒 Active constraints (2) ━`
pub fn section(icon: &str, title: &str, count: usize) {
    println!();
    println!("━{}━", format!(" {} {} ({}) ", icon, title, count).style(theme().heading));
}

/// Summary of a finished `reindex`
pub fn rebuilt(stats: &RebuildStats, index: &Path) {
    let t = theme();
    println!("{} {}", Icons::CHECK, format!("Index rebuilt: {}", stats).style(t.heading));
    println!("{} {}: {}", Icons::INFO, label("Index"), index.display());
    if stats.skipped > 0 {
        eprintln!(
            "{} {}",
            Icons::WARN,
            format!("{} log lines could not be indexed", stats.skipped).style(t.caution)
        );
    }
}

/// Multi-line rendering of a single decision
pub fn decision_block(decision: &Decision) {
    let t = theme();
    println!(
        "{} {} {}",
        decision.id.style(t.id),
        format!("[{}]", decision.kind).style(t.kind(decision.kind)),
        decision.status.as_str().style(t.status(decision.status)),
    );
    println!("  {} {}", label("Problem:"), decision.problem);
    println!("  {} {}", label("Choice:"), decision.choice);
    if let Some(rationale) = &decision.rationale {
        println!("  {} {}", label("Why:"), rationale);
    }
    if !decision.tradeoffs.is_empty() {
        println!("  {} {}", label("Tradeoffs:"), decision.tradeoffs.join("; "));
    }
    if !decision.files.is_empty() {
        println!("  {} {} {}", Icons::FILE, label("Files:"), decision.files.join(", "));
    }
    if !decision.symbols.is_empty() {
        println!("  {} {}", label("Symbols:"), decision.symbols.join(", "));
    }
    if !decision.refs.is_empty() {
        println!("  {} {} {}", Icons::LINK, label("Refs:"), decision.refs.join(", "));
    }
    if let Some(next) = &decision.superseded_by {
        println!("  {} {}", label("Superseded by:"), next.style(t.id));
    }
    println!("  {} {}", label("Created:"), decision.created_at.format("%Y-%m-%d %H:%M"));
}
