//! coldstore - catalog offline archive disks.
//!
//! Usage:
//!   coldstore scan <PATH>           Scan a disk into a tree document
//!   coldstore directories <DOC>     Print the directory index of a document
//!   coldstore summary <DOC>         Build a summary report of a document
//!   coldstore --help                Show help

use std::path::{Path, PathBuf};
use std::thread;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result, bail};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use coldstore_core::defaults::{DEFAULT_CHECKPOINT_INTERVAL, DEFAULT_MAX_DEPTH, PHOTO_VIDEO_EXTENSIONS};
use coldstore_index::{SummaryReport, disk_id_from_name, flatten, materialize};
use coldstore_scan::{
    CancellationToken, ScanConfig, ScanOutcome, ScanProgress, TreeDocument, TreeScanner,
};

/// Log a progress line every this many directories.
const PROGRESS_EVERY: u64 = 250;

#[derive(Parser)]
#[command(
    name = "coldstore",
    version,
    about = "Catalog offline archive disks",
    long_about = "coldstore walks an archive disk once and records every folder and file \
                  in a JSON tree document, so the disk can be browsed and searched \
                  without mounting it again.\n\n\
                  Interrupted scans resume from their checkpoint when re-run with the \
                  same output."
)]
struct Cli {
    /// Log level filter (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a disk and write its tree document
    Scan {
        /// Root of the disk to scan
        path: PathBuf,

        /// Tree document to write (defaults to <disk name>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only catalog these extensions (comma separated)
        #[arg(long, value_delimiter = ',', conflicts_with_all = ["photo_only", "all_extensions"])]
        extensions: Option<Vec<String>>,

        /// Only catalog photo and video formats
        #[arg(long, conflicts_with = "all_extensions")]
        photo_only: bool,

        /// Catalog every file regardless of extension
        #[arg(long)]
        all_extensions: bool,

        /// Extra exclusion regex, matched case-insensitively against full paths
        #[arg(long = "exclude", value_name = "PATTERN")]
        exclude: Vec<String>,

        /// Maximum depth below the root
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: u32,

        /// Ignore an existing checkpoint and start over
        #[arg(long)]
        no_resume: bool,

        /// Directories between checkpoints (0 = only when stopping)
        #[arg(long, default_value_t = DEFAULT_CHECKPOINT_INTERVAL)]
        checkpoint_interval: usize,

        /// Follow symbolic links
        #[arg(long)]
        follow_symlinks: bool,

        /// Skip the directory counting pass
        #[arg(long)]
        no_precount: bool,

        /// Also write a summary report to this file
        #[arg(long, value_name = "FILE")]
        summary: Option<PathBuf>,
    },

    /// Print the materialized directory index of a tree document as JSON
    Directories {
        /// Tree document produced by `scan`
        document: PathBuf,

        /// Disk id to stamp on the records (defaults to one derived from the file name)
        #[arg(long)]
        disk_id: Option<String>,
    },

    /// Build a summary report from a tree document
    Summary {
        /// Tree document produced by `scan`
        document: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    match cli.command {
        Command::Scan {
            path,
            output,
            extensions,
            photo_only,
            all_extensions,
            exclude,
            max_depth,
            no_resume,
            checkpoint_interval,
            follow_symlinks,
            no_precount,
            summary,
        } => {
            let include_extensions = if all_extensions {
                None
            } else if photo_only {
                Some(PHOTO_VIDEO_EXTENSIONS.iter().map(|e| e.to_string()).collect())
            } else {
                extensions
            };

            let mut builder = ScanConfig::builder();
            builder
                .root(path)
                .output(output)
                .max_depth(max_depth)
                .resume(!no_resume)
                .checkpoint_interval(checkpoint_interval)
                .follow_symlinks(follow_symlinks)
                .precount(!no_precount);
            // Unset means the built-in allow-list.
            if include_extensions.is_some() || all_extensions {
                builder.include_extensions(include_extensions);
            }
            let mut config = builder.build().context("Invalid scan configuration")?;
            config.exclude_patterns.extend(exclude);

            run_scan(&config, summary.as_deref())?;
        }
        Command::Directories { document, disk_id } => {
            run_directories(&document, disk_id)?;
        }
        Command::Summary { document, output } => {
            run_summary(&document, output.as_deref())?;
        }
    }

    Ok(())
}

fn setup_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "coldstore={level},coldstore_scan={level},coldstore_index={level},coldstore_core={level},warn"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Scan a disk, reporting progress until it completes or is interrupted.
fn run_scan(config: &ScanConfig, summary: Option<&Path>) -> Result<()> {
    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, saving checkpoint...");
        handler_token.cancel();
    })
    .context("Failed to set signal handler")?;

    let scanner = TreeScanner::new();
    let mut progress_rx = scanner.subscribe();
    let reporter = thread::spawn(move || {
        loop {
            match progress_rx.blocking_recv() {
                Ok(progress) => report_progress(&progress),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    let outcome = scanner.scan(config, &cancel);
    drop(scanner);
    if reporter.join().is_err() {
        tracing::warn!("progress reporter thread panicked");
    }

    match outcome.context("Scan failed")? {
        ScanOutcome::Completed(document) => {
            print_scan_summary(&document, &config.output_path());
            if let Some(path) = summary {
                SummaryReport::from_document(&document)
                    .write_to(path)
                    .context("Failed to write summary report")?;
                eprintln!("Summary written to {}", path.display());
            }
            Ok(())
        }
        ScanOutcome::Interrupted { checkpoint, saved } => {
            if saved {
                bail!(
                    "Scan interrupted; re-run the same command to resume from {}",
                    checkpoint.display()
                );
            }
            bail!("Scan interrupted and the checkpoint could not be saved");
        }
    }
}

fn report_progress(progress: &ScanProgress) {
    if progress.dirs_processed % PROGRESS_EVERY != 0 {
        return;
    }
    match progress.fraction() {
        Some(fraction) => tracing::info!(
            "{:>5.1}%  {} dirs, {} files, {}  {}",
            fraction * 100.0,
            progress.dirs_processed,
            progress.files_found,
            format_size(progress.bytes_found),
            progress.current_path.display()
        ),
        None => tracing::info!(
            "{} dirs, {} files, {}  {}",
            progress.dirs_processed,
            progress.files_found,
            format_size(progress.bytes_found),
            progress.current_path.display()
        ),
    }
}

fn print_scan_summary(document: &TreeDocument, output: &Path) {
    let stats = &document.statistics;

    println!();
    println!("{}", "─".repeat(60));
    println!(" {} - {}", document.scan_info.root_path, format_size(stats.total_size));
    println!(
        " {} files, {} directories, max depth {}",
        stats.total_files, stats.total_directories, stats.max_depth
    );
    println!(" Scanned in {:.2}s", stats.scan_duration_seconds);
    println!("{}", "─".repeat(60));

    let top = stats.top_extensions(10);
    if !top.is_empty() {
        println!();
        println!(" Top extensions:");
        for (ext, count) in top {
            println!("   {:<10} {:>10}", ext, count);
        }
    }

    if stats.largest_file.size > 0 {
        println!();
        println!(
            " Largest file: {} ({})",
            stats.largest_file.name,
            format_size(stats.largest_file.size)
        );
    }

    if stats.has_warnings() {
        println!();
        println!("{} warning(s) during scan", stats.errors_warnings.len());
    }

    println!();
    println!("Tree document written to {}", output.display());
}

/// Print the directory index of a document.
fn run_directories(document: &Path, disk_id: Option<String>) -> Result<()> {
    let doc = TreeDocument::load(document).context("Failed to load tree document")?;
    doc.validate().context("Tree document is inconsistent")?;

    let disk_id = disk_id.unwrap_or_else(|| {
        let name = document
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        disk_id_from_name(&name)
    });

    let records = materialize(&disk_id, &flatten(&doc.tree));
    eprintln!("{} directories for disk '{}'", records.len(), disk_id);
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

/// Build a summary report for a document.
fn run_summary(document: &Path, output: Option<&Path>) -> Result<()> {
    let doc = TreeDocument::load(document).context("Failed to load tree document")?;
    let report = SummaryReport::from_document(&doc);

    match output {
        Some(path) => {
            report
                .write_to(path)
                .context("Failed to write summary report")?;
            eprintln!("Summary written to {}", path.display());
        }
        None => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    eprintln!(
        " Root folders: {}, depth: {} levels, extensions: {}",
        report.structure_analysis.root_directories.len(),
        report.structure_analysis.total_depth,
        report.statistics.file_extensions.len()
    );
    for recommendation in &report.recommendations {
        eprintln!(" - {recommendation}");
    }
    Ok(())
}

fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
