//! Keel CLI - query the decision index of a repository

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "keel")]
#[command(version)]
#[command(about = "Decision index - architectural decisions and constraints for your code")]
#[command(long_about = r#"
Keel indexes the decisions recorded in .keel/decisions.jsonl and answers:
  • Which decisions affect this file or symbol?
  • Which constraints are always in force?
  • Why was this choice made?

Example usage:
  keel context src/billing/handler.rs
  keel why DEC-a1b2
  keel list --type constraint --status active
  keel sql "SELECT raw_json FROM decisions WHERE status = 'active'"
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Repository root
    #[arg(short, long, global = true, default_value = ".")]
    repo: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute read-only SQL against the decision index
    #[command(long_about = r#"Execute a SQL query directly against the SQLite index.

Schema:
  decisions (id, type, status, problem, choice, rationale, created_at, raw_json)
  decision_files (decision_id, file_path)
  decision_refs (decision_id, ref_id)
  decision_symbols (decision_id, symbol)

Examples:
  keel sql "SELECT raw_json FROM decisions WHERE status = 'active'"
  keel sql "SELECT * FROM decisions WHERE type = 'constraint'"
  keel sql "SELECT d.raw_json FROM decisions d JOIN decision_files df ON d.id = df.decision_id WHERE df.file_path LIKE '%billing%'""#)]
    Sql {
        /// Query to run
        query: String,
    },

    /// Decisions affecting a file (or symbol) plus all active constraints
    Context {
        /// File path, glob pattern (`*`) or symbol name
        path: String,
    },

    /// Show a decision by ID
    Why {
        /// Decision ID (DEC-xxxx or just xxxx)
        id: String,
    },

    /// List decisions
    List {
        /// Filter by type (product, process, constraint, learning)
        #[arg(short = 't', long = "type")]
        kind: Option<String>,

        /// Filter by status (active, superseded, retracted)
        #[arg(short, long)]
        status: Option<String>,

        /// Maximum number of results (0 = unbounded)
        #[arg(short, long)]
        limit: Option<i64>,
    },

    /// Search problem, choice and rationale text
    Search {
        /// Text to look for
        text: String,

        #[arg(short = 't', long = "type")]
        kind: Option<String>,

        #[arg(short, long)]
        status: Option<String>,

        #[arg(short, long)]
        limit: Option<i64>,
    },

    /// Active decisions linked to an external reference
    Refs {
        /// Reference ID (issue, ticket)
        ref_id: String,
    },

    /// Dump decision-to-ref or decision-to-file links
    Links {
        /// Show file links instead of ref links
        #[arg(long)]
        files: bool,
    },

    /// Rebuild the index from the decisions log
    Reindex,

    /// Show index statistics
    Stats,
}

/// How results are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(&self) -> bool {
        matches!(self, OutputMode::Human)
    }
}

/// Print a serializable value as pretty JSON
pub fn emit_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so --json output stays clean
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(e) = run(cli) {
        keel::ui::failure(&format!("Error: {:#}", e));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mode = if cli.json { OutputMode::Json } else { OutputMode::Human };
    let repo = cli.repo;

    match cli.command {
        Commands::Sql { query } => commands::run_sql(&repo, &query, mode),
        Commands::Context { path } => commands::run_context(&repo, &path, mode),
        Commands::Why { id } => commands::run_why(&repo, &id, mode),
        Commands::List { kind, status, limit } => {
            commands::run_list(&repo, kind.as_deref(), status.as_deref(), limit, mode)
        }
        Commands::Search { text, kind, status, limit } => {
            commands::run_search(&repo, &text, kind.as_deref(), status.as_deref(), limit, mode)
        }
        Commands::Refs { ref_id } => commands::run_refs(&repo, &ref_id, mode),
        Commands::Links { files } => commands::run_links(&repo, files, mode),
        Commands::Reindex => commands::run_reindex(&repo, mode),
        Commands::Stats => commands::run_stats(&repo, mode),
    }
}
