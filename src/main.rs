//! dirstat — disk usage analyser.
//!
//! Thin binary entry point. All scanning logic lives in `dirstat-core`;
//! this file parses arguments, drives a background scan and hands the
//! result to an exporter.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use dirstat_core::analysis::top_files;
use dirstat_core::export::{write_csv, write_json};
use dirstat_core::model::size::{format_count, format_size_with, SizeUnits};
use dirstat_core::scanner::progress::ScanProgress;
use dirstat_core::{start_scan, ScanOptions, ScanOutcome};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// One CSV row per entry
    Csv,
    /// JSON array of entries
    Json,
    /// Totals only
    Summary,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory (or file) to scan
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Size of the I/O worker pool
    #[arg(long, short = 'w')]
    workers: Option<usize>,

    /// Traverse symlinked directories
    #[arg(long, short = 'L')]
    follow_links: bool,

    /// JSON file with scan options; flags override it
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output format written to stdout
    #[arg(long, short = 'f', value_enum, default_value_t = Format::Summary)]
    format: Format,

    /// Also list the N largest files (summary format only)
    #[arg(long, value_name = "N", default_value_t = 0)]
    top: usize,

    /// Print sizes in powers of 1000 instead of 1024
    #[arg(long)]
    si: bool,

    /// Log per-phase progress
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(io::stderr)
        .init();

    let mut options = match &args.config {
        Some(path) => ScanOptions::from_json_file(path)
            .with_context(|| format!("loading options from {}", path.display()))?,
        None => ScanOptions::default(),
    };
    if let Some(workers) = args.workers {
        options.workers = workers;
    }
    if args.follow_links {
        options.follow_links = true;
    }

    let handle = start_scan(args.path.clone(), options)?;

    // Log progress until the scan thread drops its sender.
    loop {
        match handle.progress_rx.recv_timeout(Duration::from_millis(250)) {
            Ok(message) => log_progress(&message),
            Err(err) if err.is_timeout() => {
                if handle.is_finished() {
                    break;
                }
            }
            Err(_) => break,
        }
    }

    let outcome = handle
        .join()
        .with_context(|| format!("scanning {}", args.path.display()))?;
    if let ScanOutcome::Cancelled(_) = outcome {
        tracing::warn!("Scan was cancelled; sizes are incomplete");
    }
    let table = outcome.table();
    let summary = table.summary();
    let units = if args.si {
        SizeUnits::Decimal
    } else {
        SizeUnits::Binary
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.format {
        Format::Csv => write_csv(table, &mut out)?,
        Format::Json => {
            write_json(table, &mut out)?;
            writeln!(out)?;
        }
        Format::Summary => {
            writeln!(
                out,
                "{}  {}  ({} files, {} directories)",
                format_size_with(summary.total_size, units),
                table.root_path().display(),
                format_count(summary.files),
                format_count(summary.dirs),
            )?;
            for file in top_files(table, args.top) {
                writeln!(out, "{:>12}  {}", format_size_with(file.size, units), file.path)?;
            }
        }
    }

    if !summary.is_exact() {
        tracing::warn!(
            "{} entries could not be sized; totals are lower bounds",
            format_count(summary.unresolved)
        );
    }

    Ok(())
}

fn log_progress(message: &ScanProgress) {
    match message {
        ScanProgress::Phase(phase) => tracing::debug!("Phase: {phase:?}"),
        ScanProgress::Enumerated { entries, .. } => {
            tracing::debug!("Enumerated {} entries", format_count(*entries))
        }
        ScanProgress::Resolved { done, total } => {
            tracing::debug!(
                "Resolved {} / {} files",
                format_count(*done),
                format_count(*total)
            )
        }
        ScanProgress::LevelAggregated { depth, directories } => {
            tracing::debug!("Aggregated depth {depth} ({directories} directories)")
        }
        ScanProgress::EntryError { path, message, .. } => {
            tracing::debug!("Skipping {path}: {message}")
        }
        ScanProgress::Complete { duration, .. } => tracing::debug!("Finished in {duration:?}"),
        ScanProgress::Cancelled { phase } => tracing::debug!("Cancelled during {phase:?}"),
    }
}
