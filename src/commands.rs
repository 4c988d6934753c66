use std::path::Path;
use anyhow::Context;
use crate::{OutputMode, emit_json};
use keel::config::{self, KeelConfig};
use keel::decision::{self, Decision, DecisionStatus, DecisionType};
use keel::query::{self, DecisionIndex, QueryOptions, RawResult};
use keel::storage::{self, IndexStore};
use keel::ui::{self, DecisionTable, Icons, LinkTable};

/// Open the index read-only, refreshing it from the log first unless
/// `auto_reindex` is turned off
fn open_index(repo: &Path) -> anyhow::Result<(IndexStore, KeelConfig)> {
    let config = config::load_config(repo)?;
    let index_path = config::resolve_index_path(repo, &config);

    if config.auto_reindex {
        let log = config::resolve_decisions_path(repo, &config);
        if let Some(stats) = storage::refresh_index(&index_path, &log)? {
            tracing::info!(%stats, "index was stale, rebuilt");
        }
    }

    let store = IndexStore::open_path(&index_path)
        .with_context(|| format!("could not open the decision index of {} (run `keel reindex` first)", repo.display()))?;
    Ok((store, config))
}

fn build_options(
    kind: Option<&str>,
    status: Option<&str>,
    limit: Option<i64>,
    config: &KeelConfig,
) -> anyhow::Result<QueryOptions> {
    let mut options = QueryOptions::new().limit(limit.or(config.default_limit).unwrap_or(0));
    if let Some(kind) = kind {
        options = options.kind(kind.parse::<DecisionType>()?);
    }
    if let Some(status) = status {
        options = options.status(status.parse::<DecisionStatus>()?);
    }
    Ok(options)
}

fn print_decisions(decisions: &[Decision], mode: OutputMode, none: &str) -> anyhow::Result<()> {
    if !mode.is_human() {
        return emit_json(&decisions);
    }
    if decisions.is_empty() {
        ui::empty(none);
    } else {
        println!("{}", DecisionTable::new(decisions).build());
    }
    Ok(())
}

pub fn run_sql(repo: &Path, query: &str, mode: OutputMode) -> anyhow::Result<()> {
    // Reject before opening anything
    query::check_read_only(query)?;

    let (store, _) = open_index(repo)?;
    let result = query::execute_raw(&store, query)?;
    store.close()?;

    if !mode.is_human() {
        return emit_json(&result.rows);
    }
    print_raw(&result);
    Ok(())
}

fn print_raw(result: &RawResult) {
    if result.is_empty() {
        ui::empty("No results.");
        return;
    }

    for (i, row) in result.rows.iter().enumerate() {
        if row.len() == 1 {
            if let Some((_, value)) = row.iter().next() {
                println!("{}", value);
            }
        } else {
            for (column, value) in row.iter() {
                println!("{} {}", ui::label(&format!("{}:", column)), value);
            }
        }
        if i + 1 < result.len() {
            println!();
        }
    }
}

pub fn run_context(repo: &Path, path: &str, mode: OutputMode) -> anyhow::Result<()> {
    let (store, _) = open_index(repo)?;
    let result = DecisionIndex::new(&store).for_context_or_symbol(path)?;
    store.close()?;

    if !mode.is_human() {
        return emit_json(&result);
    }

    if result.is_empty() {
        ui::empty(&format!("No decisions or constraints apply to {}", path));
        return Ok(());
    }

    ui::context_header(path);
    ui::section(Icons::FILE, "Decisions", result.decisions.len());
    if result.decisions.is_empty() {
        ui::empty("None linked to this path or symbol.");
    }
    for decision in &result.decisions {
        ui::decision_block(decision);
    }

    ui::section(Icons::LOCK, "Active constraints", result.constraints.len());
    if result.constraints.is_empty() {
        ui::empty("None.");
    }
    for constraint in &result.constraints {
        ui::decision_block(constraint);
    }
    Ok(())
}

pub fn run_why(repo: &Path, id: &str, mode: OutputMode) -> anyhow::Result<()> {
    let id = decision::normalize_id(id)?;

    let (store, _) = open_index(repo)?;
    let found = DecisionIndex::new(&store).by_id(&id)?;
    store.close()?;

    match (found, mode) {
        (Some(decision), OutputMode::Json) => emit_json(&decision),
        (None, OutputMode::Json) => emit_json(&serde_json::Value::Null),
        (Some(decision), OutputMode::Human) => {
            ui::decision_block(&decision);
            Ok(())
        }
        (None, OutputMode::Human) => {
            ui::empty(&format!("Decision {} not found.", id));
            Ok(())
        }
    }
}

pub fn run_list(
    repo: &Path,
    kind: Option<&str>,
    status: Option<&str>,
    limit: Option<i64>,
    mode: OutputMode,
) -> anyhow::Result<()> {
    let (store, config) = open_index(repo)?;
    let options = build_options(kind, status, limit, &config)?;
    let decisions = DecisionIndex::new(&store).all(&options)?;
    store.close()?;

    print_decisions(&decisions, mode, "No decisions found.")
}

pub fn run_search(
    repo: &Path,
    text: &str,
    kind: Option<&str>,
    status: Option<&str>,
    limit: Option<i64>,
    mode: OutputMode,
) -> anyhow::Result<()> {
    let (store, config) = open_index(repo)?;
    let options = build_options(kind, status, limit, &config)?;
    let decisions = DecisionIndex::new(&store).search(text, &options)?;
    store.close()?;

    print_decisions(&decisions, mode, &format!("No decisions mention '{}'.", text))
}

pub fn run_refs(repo: &Path, ref_id: &str, mode: OutputMode) -> anyhow::Result<()> {
    let (store, _) = open_index(repo)?;
    let decisions = DecisionIndex::new(&store).by_ref(ref_id)?;
    store.close()?;

    print_decisions(&decisions, mode, &format!("No active decisions linked to {}.", ref_id))
}

pub fn run_links(repo: &Path, files: bool, mode: OutputMode) -> anyhow::Result<()> {
    let (store, _) = open_index(repo)?;
    let index = DecisionIndex::new(&store);

    let table = if files {
        let links = index.all_file_links()?;
        if !mode.is_human() {
            return emit_json(&links);
        }
        LinkTable::from_files(&links)
    } else {
        let links = index.all_refs()?;
        if !mode.is_human() {
            return emit_json(&links);
        }
        LinkTable::from_refs(&links)
    };

    let rendered = table.build();
    if rendered.is_empty() {
        ui::empty("No links.");
    } else {
        println!("{}", rendered);
    }
    Ok(())
}

pub fn run_reindex(repo: &Path, mode: OutputMode) -> anyhow::Result<()> {
    let config = config::load_config(repo)?;
    let index_path = config::resolve_index_path(repo, &config);
    let log = config::resolve_decisions_path(repo, &config);

    let mut store = IndexStore::create(&index_path)?;
    let stats = storage::rebuild_from_jsonl(&mut store, &log)?;
    store.close()?;

    if mode.is_human() {
        ui::rebuilt(&stats, &index_path);
    } else {
        emit_json(&serde_json::json!({
            "lines": stats.lines,
            "indexed": stats.indexed,
            "skipped": stats.skipped,
            "index": index_path.display().to_string(),
        }))?;
    }
    Ok(())
}

pub fn run_stats(repo: &Path, mode: OutputMode) -> anyhow::Result<()> {
    let (store, _) = open_index(repo)?;
    let stats = store.stats()?;
    store.close()?;

    if mode.is_human() {
        println!("{} {}", Icons::DATABASE, stats);
    } else {
        emit_json(&serde_json::json!({
            "decisions": stats.decisions,
            "active": stats.active,
            "files": stats.files,
            "refs": stats.refs,
            "symbols": stats.symbols,
        }))?;
    }
    Ok(())
}
