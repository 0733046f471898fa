//! Command-line interface for curator.
//!
//! Provides commands for checking canonical names, scanning download
//! directories, reconciling candidates into the library, pruning stale
//! records, and showing the resolved configuration.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::{AssetProbe, FfprobeProbe};
use crate::config;
use crate::core::executor::write_text_atomic;
use crate::core::sink::{ActionEvent, ActionSink, FileActionLog, MemorySink, MultiSink, TracingSink};
use crate::core::{scan, Curator, DeleteMode, ExecutorOptions, RunOptions, RunSummary, ScanOptions};
use crate::domain::MetricsMap;
use crate::library::{LocalView, MetadataStore};
use crate::naming::{classify, parse};

/// curator - Media library curation
#[derive(Parser, Debug)]
#[command(name = "curator")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse canonical file names and show their segments
    Parse {
        /// File names (or paths; only the file name is parsed)
        #[arg(required = true)]
        names: Vec<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Scan a directory and probe every video into a metrics map
    Scan {
        /// Directory to scan
        root: PathBuf,

        /// Write the metrics map here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Concurrent probes
        #[arg(short, long)]
        workers: Option<usize>,

        /// Probe timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Reconcile candidates against the library and apply the result
    Reconcile {
        /// Metrics map (JSON) of the candidates
        #[arg(conflicts_with = "scan", required_unless_present = "scan")]
        external: Option<PathBuf>,

        /// Scan this directory for candidates instead of reading a map
        #[arg(long)]
        scan: Option<PathBuf>,

        /// Library root (defaults to the configured library)
        #[arg(short, long, env = "CURATOR_LIBRARY")]
        library_root: Option<PathBuf>,

        /// Show what would happen without touching any file
        #[arg(long)]
        dry_run: bool,

        /// Allow moves onto existing files
        #[arg(long)]
        overwrite: bool,

        /// Delete replaced files instead of moving them to the recycle directory
        #[arg(long)]
        permanent: bool,

        /// Concurrent decisions
        #[arg(short, long)]
        workers: Option<usize>,

        /// Library metadata store (defaults to $CURATOR_HOME/library.json)
        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// Drop library records whose file no longer exists
    Prune {
        #[arg(long)]
        dry_run: bool,

        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// Show resolved configuration
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Parse { names, json } => parse_names(&names, json),
            Commands::Scan {
                root,
                output,
                workers,
                timeout,
            } => scan_root(&root, output, workers, timeout).await,
            Commands::Reconcile {
                external,
                scan,
                library_root,
                dry_run,
                overwrite,
                permanent,
                workers,
                store,
            } => {
                let options = ReconcileArgs {
                    library_root,
                    dry_run,
                    overwrite,
                    permanent,
                    workers,
                    store,
                };
                run_reconcile(external, scan, options).await
            }
            Commands::Prune { dry_run, store } => prune(dry_run, store).await,
            Commands::Config => show_config(),
        }
    }
}

struct ReconcileArgs {
    library_root: Option<PathBuf>,
    dry_run: bool,
    overwrite: bool,
    permanent: bool,
    workers: Option<usize>,
    store: Option<PathBuf>,
}

/// Parse and display canonical names
fn parse_names(names: &[String], json: bool) -> Result<()> {
    let mut invalid = 0;
    let mut parsed = Vec::new();

    for name in names {
        let file_name = Path::new(name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.clone());

        match parse(&file_name) {
            Ok(asset) => parsed.push(asset),
            Err(e) => {
                eprintln!("✗ {}", e);
                invalid += 1;
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&parsed)?);
    } else if !parsed.is_empty() {
        println!(
            "{:<30} {:<6} {:<8} {:<10} {:<12} {:<12}",
            "TITLE", "YEAR", "DEF", "SOURCE", "GROUP", "CLASS"
        );
        println!("{}", "-".repeat(82));
        for asset in &parsed {
            println!(
                "{:<30} {:<6} {:<8} {:<10} {:<12} {:<12}",
                asset.title,
                asset.year,
                asset.definition,
                asset.source,
                asset.release_group,
                classify(asset).to_string()
            );
        }
    }

    if invalid > 0 {
        anyhow::bail!("{} of {} names are not canonical", invalid, names.len());
    }
    Ok(())
}

fn scan_options(workers: Option<usize>, timeout: Option<u64>) -> Result<(ScanOptions, Arc<dyn AssetProbe>)> {
    let settings = &config::config()?.scan;
    let probe_timeout = timeout.map(Duration::from_secs).unwrap_or(settings.probe_timeout);

    let options = ScanOptions {
        workers: workers.unwrap_or(settings.workers),
        probe_timeout,
        ignore_patterns: Vec::new(),
    }
    .with_ignore(&settings.ignore)?;

    let probe: Arc<dyn AssetProbe> =
        Arc::new(FfprobeProbe::with_binary_path(settings.ffprobe.clone()).with_timeout(probe_timeout));
    Ok((options, probe))
}

/// Scan a directory and emit its metrics map
async fn scan_root(
    root: &Path,
    output: Option<PathBuf>,
    workers: Option<usize>,
    timeout: Option<u64>,
) -> Result<()> {
    let (options, probe) = scan_options(workers, timeout)?;
    let map = scan(root, probe, &options).await?;

    let json = format!("{}\n", serde_json::to_string_pretty(&map)?);
    match output {
        Some(path) => {
            write_text_atomic(&path, &json)
                .await
                .with_context(|| format!("Failed to write metrics map: {}", path.display()))?;
            eprintln!("✓ {} videos written to {}", map.len(), path.display());
        }
        None => print!("{}", json),
    }
    Ok(())
}

async fn load_external(path: &Path) -> Result<MetricsMap> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read metrics map: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid metrics map: {}", path.display()))
}

fn open_store(store: Option<PathBuf>) -> Result<MetadataStore> {
    match store {
        Some(path) => Ok(MetadataStore::new(path)),
        None => MetadataStore::open_default(),
    }
}

/// Reconcile candidates into the library
async fn run_reconcile(
    external: Option<PathBuf>,
    scan_root: Option<PathBuf>,
    args: ReconcileArgs,
) -> Result<()> {
    let cfg = config::config()?;

    let external = match (external, scan_root) {
        (Some(path), _) => load_external(&path).await?,
        (None, Some(root)) => {
            let (options, probe) = scan_options(None, None)?;
            scan(&root, probe, &options).await?
        }
        (None, None) => anyhow::bail!("Either a metrics map or --scan is required"),
    };

    let delete_mode = if args.permanent {
        DeleteMode::Permanent
    } else {
        DeleteMode::Recycle(config::paths::recycle_dir()?)
    };

    let mut options = RunOptions::new(args.library_root.unwrap_or_else(|| cfg.library.clone()));
    options.overwrite = args.overwrite || cfg.execute.overwrite;
    options.executor = ExecutorOptions {
        dry_run: args.dry_run,
        create_dirs: true,
        delete_mode,
        workers: args.workers.unwrap_or(cfg.execute.workers),
    };

    let log = Arc::new(FileActionLog::open(config::paths::action_log()?)?);
    let outcomes = Arc::new(MemorySink::new());
    let sinks: Vec<Arc<dyn ActionSink>> = vec![Arc::new(TracingSink), log.clone(), outcomes.clone()];
    let sink: Arc<dyn ActionSink> = Arc::new(MultiSink::new(sinks));

    let curator = Curator::new(open_store(args.store)?, Arc::new(LocalView), sink);
    log.note(&format!(
        "run started ({} candidates{})",
        external.len(),
        if args.dry_run { ", dry-run" } else { "" }
    ));

    let summary = curator.run(&external, &options).await?;
    log.note(&format!("run {} finished", summary.run_id));

    for event in outcomes.events() {
        if !matches!(event, ActionEvent::Planned(_)) {
            println!("{}", event);
        }
    }
    print_summary(&summary, curator.store().path());

    if !summary.is_success() {
        anyhow::bail!("{} action(s) failed", summary.failures.len());
    }
    Ok(())
}

fn print_summary(summary: &RunSummary, store: &Path) {
    println!();
    println!("Run:      {}{}", summary.run_id, if summary.dry_run { " (dry-run)" } else { "" });
    println!("Store:    {}", store.display());
    println!("Pruned:   {}", summary.pruned);
    println!("Accepted: {}", summary.accepted);
    println!("Skipped:  {}", summary.skipped);
    println!("Applied:  {}", summary.applied);
    println!("Stored:   {}", summary.stored);
    if !summary.failures.is_empty() {
        println!("Failures:");
        for failure in &summary.failures {
            println!("  {}", failure);
        }
    }
}

/// Remove stale records
async fn prune(dry_run: bool, store: Option<PathBuf>) -> Result<()> {
    let curator = Curator::new(open_store(store)?, Arc::new(LocalView), Arc::new(TracingSink));
    let removed = curator.prune(dry_run).await?;

    if removed.is_empty() {
        println!("Library is clean.");
        return Ok(());
    }

    println!("{:<16} {:<60}", "KEY", "MISSING FILE");
    println!("{}", "-".repeat(78));
    for record in &removed {
        println!("{:<16} {:<60}", record.key, record.canonical_path().display());
    }
    println!(
        "\n{} {} record(s)",
        if dry_run { "Would remove" } else { "Removed" },
        removed.len()
    );
    Ok(())
}

/// Show the resolved configuration (for debugging)
fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("Curator Configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home (state):  {}", cfg.home.display());
    println!("  Library:       {}", cfg.library.display());
    println!("  Store:         {}", config::paths::library_store()?.display());
    println!("  Action log:    {}", config::paths::action_log()?.display());
    println!("  Recycle:       {}", config::paths::recycle_dir()?.display());
    println!();
    println!("Scan:");
    println!("  Workers:       {}", cfg.scan.workers);
    println!("  Probe timeout: {}s", cfg.scan.probe_timeout.as_secs());
    println!("  ffprobe:       {}", cfg.scan.ffprobe);
    if !cfg.scan.ignore.is_empty() {
        println!("  Ignore:        {}", cfg.scan.ignore.join(", "));
    }
    println!();
    println!("Execute:");
    println!("  Workers:       {}", cfg.execute.workers);
    println!("  Overwrite:     {}", cfg.execute.overwrite);

    Ok(())
}
