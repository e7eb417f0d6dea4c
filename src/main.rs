//! # Setlist
//!
//! Turns the per-stream timeline files typed by moderators into one catalog of
//! every song sung, with links to each performance.
//!
//! ## Usage
//!
//! ```bash
//! # Build data.json from the timeline directory
//! setlist build timeline
//!
//! # Same, also storing the catalog in SQLite
//! setlist build timeline --db catalog.db
//!
//! # Search the built catalog
//! setlist search "dreamland"
//!
//! # Convert the discography list
//! setlist disc timeline/disc.txt --output disc.json
//! ```

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser};
use log::{debug, info};
use setlist::catalog::{self, CatalogOptions};
use setlist::cli::{self, Command};
use setlist::config::{self, RuntimeConfig};
use setlist::rules::{self, RuleSet};
use setlist::{completion, discography, store, timeline};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

struct BuildArgs {
    timeline_dir: PathBuf,
    rules_dir: Option<PathBuf>,
    output: PathBuf,
    db: Option<PathBuf>,
    config: Option<PathBuf>,
    strict: bool,
}

fn run_build(args: BuildArgs) -> Result<()> {
    let config = RuntimeConfig::load(args.config.as_deref())?;
    debug!("Using configuration {config:?}");

    let rules_dir = args.rules_dir.as_deref().unwrap_or(&args.timeline_dir);
    let (rules, mut diagnostics) = RuleSet::load(rules_dir, &config)?;
    let (sources, read_diagnostics) = timeline::read_dir(&args.timeline_dir, &config)?;
    diagnostics.extend(read_diagnostics);

    info!("Building catalog from {} timeline files", sources.len());
    let build = catalog::build_catalog(&sources, &rules, &CatalogOptions::from_config(&config));
    diagnostics.extend(build.diagnostics);
    diagnostics.sort();

    catalog::write_json(&args.output, &build.entries)?;
    if let Some(db) = args.db {
        store::export(&db, &build.entries)?;
        eprintln!("Stored catalog in {}", db.display());
    }

    let stats = catalog::stats(&build.entries);
    eprintln!(
        "Wrote {} songs ({} performances) to {}",
        stats.entries,
        stats.occurrences,
        args.output.display()
    );

    if !diagnostics.is_empty() {
        eprintln!(
            "{} problems ({} files skipped):",
            diagnostics.len(),
            diagnostics.skipped_files()
        );
        eprint!("{diagnostics}");
        if args.strict {
            bail!("{} problems found while building the catalog", diagnostics.len());
        }
    }
    Ok(())
}

fn run_search(catalog_path: &Path, query: &str) -> Result<()> {
    let entries = catalog::read_json(catalog_path)?;
    let hits = catalog::search(&entries, query);
    for entry in &hits {
        match entry.latest_occurrence() {
            Some(occurrence) => println!(
                "{} / {}  ({}x, last {} {})  {}",
                entry.song_name,
                entry.artist,
                entry.occurrences.len(),
                occurrence.date,
                occurrence.time,
                occurrence.link
            ),
            None => println!("{} / {}", entry.song_name, entry.artist),
        }
    }
    eprintln!("{} of {} songs match", hits.len(), entries.len());
    Ok(())
}

fn run_mark_private(exceptions: &Path, ids: &[String]) -> Result<()> {
    let text = match fs::read_to_string(exceptions) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", exceptions.display()))
        }
    };
    let merged = rules::merge_private_ids(&text, ids);
    fs::write(exceptions, merged)
        .with_context(|| format!("Failed to write {}", exceptions.display()))?;
    info!("Marked {} videos private in {}", ids.len(), exceptions.display());
    Ok(())
}

fn run_disc(input: &Path, output: &Path) -> Result<()> {
    let (disc, diagnostics) = discography::load(input)?;
    discography::write_json(output, &disc)?;
    eprintln!("Wrote {} albums to {}", disc.album_count(), output.display());
    if !diagnostics.is_empty() {
        eprintln!("{} lines skipped:", diagnostics.len());
        eprint!("{diagnostics}");
    }
    Ok(())
}

/// Initializes logging, parses command-line arguments, and routes commands.
///
/// Logging is controlled via `RUST_LOG`:
/// - `RUST_LOG=debug setlist build timeline` - Per-file progress
/// - `RUST_LOG=setlist::timeline=trace setlist build timeline` - Every parsed line
fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();

    match args.command {
        Command::Build {
            timeline_dir,
            rules_dir,
            output,
            store: store_requested,
            db,
            config: config_path,
            strict,
        } => {
            let db = match (store_requested, db) {
                (_, Some(db)) => Some(db),
                (true, None) => Some(config::get_db_path()?),
                (false, None) => None,
            };
            run_build(BuildArgs {
                timeline_dir,
                rules_dir,
                output,
                db,
                config: config_path,
                strict,
            })?;
        }
        Command::Search { query, catalog: catalog_path } => {
            run_search(&catalog_path, &query)?;
        }
        Command::VideoIds { catalog: catalog_path } => {
            let entries = catalog::read_json(&catalog_path)?;
            for id in catalog::video_ids(&entries) {
                println!("{id}");
            }
        }
        Command::MarkPrivate { exceptions, ids } => {
            run_mark_private(&exceptions, &ids)?;
        }
        Command::Disc { input, output } => {
            run_disc(&input, &output)?;
        }
        Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            completion::generate_completions(completion::shell_to_completion_shell(&shell), &mut cmd);
        }
    }

    Ok(())
}
