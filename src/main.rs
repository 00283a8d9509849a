//! Cloudsweep main entry point
//!
//! This is the command-line interface for scanning, analyzing and cleaning a
//! remote file store.

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use cloudsweep::config::{load_config_with_hash, Config};
use cloudsweep::crawler::{self, CrawlError};
use cloudsweep::dedupe::{
    duplicate_report, group_duplicates, plan_target, read_plan_file, write_plan_file,
};
use cloudsweep::deleter::{BatchDeleter, DeleteSettings};
use cloudsweep::inventory::InventoryIndex;
use cloudsweep::output::{format_delete_summary, format_duplicates, format_inventory, format_plan};
use cloudsweep::remote::{load_token, DropboxClient};
use cloudsweep::storage::{InventoryStore, ScanRecord, SqliteStorage, StorageError};
use cloudsweep::{Entry, SweepError};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Cloudsweep: inventory, deduplicate and bulk-clean a remote file store
///
/// Scans are resumable: an interrupted or failed scan continues from its
/// last checkpoint on the next run.
#[derive(Parser, Debug)]
#[command(name = "cloudsweep")]
#[command(version)]
#[command(about = "Inventory, deduplicate and bulk-clean a remote file store", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the remote store into the database, resuming if possible
    Scan {
        /// Discard any checkpoint and start from the first page
        #[arg(long)]
        fresh: bool,
    },

    /// Show inventory and duplicate breakdowns of the latest scan
    Report,

    /// Write a deletion plan for a configured target
    Plan {
        /// Name of a [[target]] table
        #[arg(long)]
        target: String,

        /// Plan file to write (default: <plan-dir>/<target>-delete.txt)
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Execute a plan file
    Delete {
        /// Plan file with one path per line
        #[arg(value_name = "PLAN")]
        plan: PathBuf,

        /// Show what would be deleted without contacting the remote
        #[arg(long)]
        dry_run: bool,

        /// Where to write failed and skipped paths (default: <PLAN>.retry)
        #[arg(long, value_name = "FILE")]
        failed_out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::debug!("Configuration hash: {}", config_hash);

    match cli.command {
        Command::Scan { fresh } => handle_scan(&config, &config_hash, fresh).await,
        Command::Report => handle_report(&config),
        Command::Plan { target, output } => handle_plan(&config, &target, output),
        Command::Delete {
            plan,
            dry_run,
            failed_out,
        } => handle_delete(&config, &plan, dry_run, failed_out).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("cloudsweep=info,warn"),
            1 => EnvFilter::new("cloudsweep=debug,info"),
            2 => EnvFilter::new("cloudsweep=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Raises the returned flag on Ctrl-C
fn install_interrupt_flag() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&flag);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current step");
            handler_flag.store(true, Ordering::SeqCst);
        }
    });
    flag
}

fn open_storage(config: &Config) -> anyhow::Result<SqliteStorage> {
    let path = Path::new(&config.output.database_path);
    SqliteStorage::new(path).with_context(|| format!("failed to open {}", path.display()))
}

fn build_client(config: &Config) -> anyhow::Result<DropboxClient> {
    let token = load_token(&config.remote)?;
    Ok(DropboxClient::new(&config.remote, token)?)
}

/// Loads the latest scan and its entries
fn load_latest(storage: &SqliteStorage) -> anyhow::Result<(ScanRecord, Vec<Entry>)> {
    let scan = storage.get_latest_scan()?.ok_or(SweepError::NoScan)?;
    let entries = storage.load_entries(scan.id)?;
    Ok((scan, entries))
}

/// Handles `scan`: crawls and records a new inventory
async fn handle_scan(config: &Config, config_hash: &str, fresh: bool) -> anyhow::Result<()> {
    let client = build_client(config)?;
    let storage = open_storage(config)?;
    let cancel = install_interrupt_flag();

    match crawler::scan(client, storage, config, config_hash, fresh, Some(cancel)).await {
        Ok(outcome) => {
            println!(
                "Scan {} complete: {} files, {} folders ({} pages{})",
                outcome.scan_id,
                outcome.files,
                outcome.folders,
                outcome.pages_fetched,
                if outcome.resumed { ", resumed" } else { "" }
            );
            Ok(())
        }
        Err(SweepError::Storage(StorageError::CheckpointCorrupt(detail))) => bail!(
            "the scan checkpoint in {} is corrupt ({}); rerun with --fresh to start over, \
             or inspect the database before discarding it",
            config.output.database_path,
            detail
        ),
        Err(SweepError::Crawl(e @ CrawlError::RootMismatch { .. })) => bail!(
            "{}; rerun with --fresh to start over under the configured root, \
             or restore the previous root-path to finish the old scan",
            e
        ),
        Err(SweepError::Crawl(e)) if e.is_resumable() => {
            tracing::error!("{}", e);
            bail!("scan stopped; run `scan` again to resume from the checkpoint")
        }
        Err(e) => Err(e.into()),
    }
}

/// Handles `report`: prints inventory and duplicate breakdowns
fn handle_report(config: &Config) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let (scan, entries) = load_latest(&storage)?;
    let rows = config.output.top_n;

    let index = InventoryIndex::build(&entries, Utc::now(), rows);
    println!("{}", format_inventory(&scan, &index, rows));

    let groups = group_duplicates(&entries);
    let report = duplicate_report(&groups);
    println!("{}", format_duplicates(&report, rows));

    Ok(())
}

/// Handles `plan`: resolves a target and writes its plan file
fn handle_plan(config: &Config, target: &str, output: Option<PathBuf>) -> anyhow::Result<()> {
    let target = config
        .target(target)
        .ok_or_else(|| SweepError::UnknownTarget(target.to_string()))?;

    let storage = open_storage(config)?;
    let (scan, entries) = load_latest(&storage)?;
    tracing::info!("Planning against scan {} ({} files)", scan.id, entries.len());

    let plan = plan_target(&entries, target);
    let output = output.unwrap_or_else(|| {
        Path::new(&config.output.plan_dir).join(format!("{}-delete.txt", target.name))
    });
    write_plan_file(&output, &plan.paths())?;

    println!("{}", format_plan(&target.name, &plan, 50));
    println!("Plan written to {}", output.display());
    Ok(())
}

/// Handles `delete`: executes a plan file and records the outcomes
async fn handle_delete(
    config: &Config,
    plan: &Path,
    dry_run: bool,
    failed_out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let paths = read_plan_file(plan)?;
    println!("Loaded {} paths from {}", paths.len(), plan.display());

    if dry_run {
        for path in paths.iter().take(50) {
            println!("  would delete {}", path);
        }
        if paths.len() > 50 {
            println!("  ... and {} more", paths.len() - 50);
        }
        return Ok(());
    }

    let client = build_client(config)?;
    let mut storage = open_storage(config)?;
    let deleter = BatchDeleter::new(client, DeleteSettings::from(&config.deleter))
        .with_cancel(install_interrupt_flag());

    let summary = deleter.execute(&paths).await;
    let run_id = storage.record_delete_run(&plan.display().to_string(), &summary.outcomes)?;
    tracing::info!("Recorded delete run {}", run_id);

    print!("{}", format_delete_summary(&summary));

    let retry = summary.retry_paths();
    if !retry.is_empty() {
        let retry_file = failed_out.unwrap_or_else(|| {
            let mut name = plan.as_os_str().to_owned();
            name.push(".retry");
            PathBuf::from(name)
        });
        write_plan_file(&retry_file, &retry)?;
        println!(
            "{} paths to retry written to {}",
            retry.len(),
            retry_file.display()
        );
    }

    Ok(())
}
