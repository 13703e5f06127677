//! # Harvest Index CLI (`hvx`)
//!
//! Loads a harvest document into an in-memory subterm index and prints a
//! summary of what was parsed and indexed.
//!
//! ```bash
//! # Parse a harvest file and show the summary
//! hvx load corpus/arxiv-001.harvest
//!
//! # Same, as JSON (includes diagnostics and index stats)
//! hvx load corpus/arxiv-001.harvest --json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use harvest_index::index::MemoryIndex;
use harvest_index::loader::{load_harvest_from_memory, ParseStatus};

/// Harvest Index CLI: a streaming ingestion pipeline for harvest documents
/// of mathematical expressions.
#[derive(Parser)]
#[command(
    name = "hvx",
    about = "Stream a harvest document into a content-addressed subterm index",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a harvest file and index every subterm in memory
    Load {
        /// Path to the harvest document
        file: PathBuf,
        /// Emit the outcome as JSON instead of the text summary
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Load { file, json } => run_load(&file, json),
    }
}

fn run_load(file: &Path, json: bool) -> Result<()> {
    let buffer =
        fs::read(file).with_context(|| format!("reading harvest file {}", file.display()))?;

    let index = MemoryIndex::new();
    let outcome = load_harvest_from_memory(&buffer, &index);

    for diagnostic in &outcome.diagnostics {
        eprintln!("{diagnostic}");
    }

    if json {
        let report = serde_json::json!({
            "file": file.display().to_string(),
            "status": outcome.status,
            "expressions_completed": outcome.expressions_completed,
            "subterms_indexed": outcome.subterms_indexed,
            "distinct_subterms": index.distinct_subterms(),
            "warnings": outcome.warnings,
            "error_detected": outcome.error_detected,
            "diagnostics": outcome.diagnostics,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("load {}", file.display());
        println!("  expressions completed: {}", outcome.expressions_completed);
        println!("  subterms indexed: {}", outcome.subterms_indexed);
        println!("  distinct subterms: {}", index.distinct_subterms());
        println!("  warnings: {}", outcome.warnings);
        if outcome.error_detected {
            println!("  recoverable parse errors were logged");
        }
        if outcome.status == ParseStatus::Ok {
            println!("ok");
        }
    }

    if outcome.status == ParseStatus::Failed {
        bail!("event source aborted while parsing {}", file.display());
    }
    Ok(())
}
