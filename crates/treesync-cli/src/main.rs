//! TreeSync - Incremental one-way folder synchronization
//!
//! Mirrors a source folder into a destination, copying only the folders whose
//! content fingerprint changed since the previous run.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;
use treesync_config::{Config, ConfigLoader, LoggingConfig};
use treesync_core::{PathValidator, ScanProgress, SyncOptions, SyncService, TransferProgress};

mod display;
mod json_output;
mod progress;

use display::{
    display_error, display_fingerprint, display_info, display_run_report, display_scan_counts,
    display_success, display_warning, format_duration,
};
use json_output::{OperationMetadata, RunResultJson, ScanResultJson};
use progress::RunProgressDisplay;

/// TreeSync - Incremental one-way folder synchronization
#[derive(Parser)]
#[command(
    name = "treesync",
    version = env!("CARGO_PKG_VERSION"),
    about = "Incremental one-way folder synchronization",
    long_about = "TreeSync mirrors a source folder into a destination folder.\n\
                  Each destination folder records the fingerprint of the source content\n\
                  it was last synced from, so unchanged subtrees are skipped on later runs."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Quiet mode - minimal output
    #[arg(short, long)]
    quiet: bool,

    /// Verbose mode - detailed output
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mirror a source folder into a destination folder
    Sync {
        /// Source folder
        source: String,
        /// Destination folder
        destination: String,
        /// Stop the run after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fingerprint a source folder without copying anything
    Scan {
        /// Source folder
        source: String,
        /// Print the scan summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
        /// Write a default configuration file (format from the extension)
        #[arg(long, value_name = "FILE", conflicts_with = "default")]
        init: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&cli, &config.logging)?;

    info!("TreeSync v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Sync {
            ref source,
            ref destination,
            timeout,
            json,
        } => {
            sync_command(&config, source, destination, timeout, json, cli.quiet).await?;
        }
        Commands::Scan { ref source, json } => {
            scan_command(&config, source, json, cli.quiet).await?;
        }
        Commands::Config { default, ref init } => {
            config_command(&config, default, init.as_deref(), cli.config.as_deref())?;
        }
    }

    Ok(())
}

fn init_logging(cli: &Cli, logging: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else if cli.quiet {
        "error"
    } else {
        logging.level.as_str()
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Invalid log filter")?;

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .with_ansi(logging.colored_output)
        .with_writer(std::io::stderr);

    let installed = if logging.json_format {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}

async fn sync_command(
    config: &Config,
    source: &str,
    destination: &str,
    timeout: Option<u64>,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let validator = PathValidator::new();
    let source = validated_folder(&validator, "Source", source)?;
    let destination = validated_folder(&validator, "Destination", destination)?;
    ensure_disjoint(&source, &destination)?;

    let options = SyncOptions::from(&config.sync)
        .with_timeout(timeout.map(Duration::from_secs).or(config.sync.run_timeout()));
    let service = Arc::new(SyncService::new(options));
    let chatty = !quiet && !json;

    if chatty {
        println!(
            "{} Synchronizing {} into {}",
            style("⟲").blue().bold(),
            style(source.display()).cyan(),
            style(destination.display()).cyan()
        );
    }

    let started = Instant::now();
    let scan = service.start_scan(&source)?;
    let transfer = match service.start_transfer(&source, &destination, &scan) {
        Ok(transfer) => transfer,
        Err(e) => {
            service.stop();
            join_workers(Arc::clone(&service)).await?;
            return Err(e.into());
        }
    };

    let display = RunProgressDisplay::new(
        chatty && config.progress.enabled,
        true,
        config.progress.interval(),
    );
    watch_run(&service, &display, &scan, Some(&transfer), config.progress.interval()).await;
    join_workers(Arc::clone(&service)).await?;
    display.finish();

    let report = service.report(&source, &destination, &scan, &transfer, started.elapsed());
    info!(
        run_id = %report.run_id,
        copied = report.transfer.file_count,
        "Sync finished in {}",
        format_duration(report.duration)
    );

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&RunResultJson::from_report(&report))?
        );
    } else if !quiet {
        display_run_report(&report);
        if report.cancelled {
            display_warning("Run stopped before completion; rerun to finish the remaining folders");
        } else {
            display_success("Sync completed");
        }
    }

    Ok(())
}

async fn scan_command(config: &Config, source: &str, json: bool, quiet: bool) -> Result<()> {
    let source = validated_folder(&PathValidator::new(), "Source", source)?;
    // Nothing drains the queue during a scan-only run, so it must not block the scanner
    let options = SyncOptions {
        queue_capacity: None,
        ..SyncOptions::from(&config.sync)
    };
    let service = Arc::new(SyncService::new(options));
    let chatty = !quiet && !json;

    let scan = service.start_scan(&source)?;
    let display = RunProgressDisplay::new(
        chatty && config.progress.enabled,
        false,
        config.progress.interval(),
    );
    watch_run(&service, &display, &scan, None, config.progress.interval()).await;
    join_workers(Arc::clone(&service)).await?;
    display.finish();

    if json {
        let output = ScanResultJson {
            metadata: OperationMetadata::new("scan", scan.run_id(), &source, None),
            scan: scan.snapshot(),
            root_fingerprint: scan.root_hash(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if !quiet {
        println!();
        println!("{}", style("Scan Summary:").bold().underlined());
        display_scan_counts(&scan.snapshot());
        display_fingerprint(scan.root_hash());
    }

    Ok(())
}

fn config_command(
    config: &Config,
    default: bool,
    init: Option<&Path>,
    path: Option<&Path>,
) -> Result<()> {
    if let Some(target) = init {
        if target.exists() {
            bail!("Refusing to overwrite existing file {}", target.display());
        }
        ConfigLoader::generate_default_config(target)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        display_success(&format!("Wrote default configuration to {}", target.display()));
    } else if default {
        println!("{} Default configuration:", style("⚙").blue().bold());
        print!("{}", serde_yaml::to_string(&Config::default())?);
    } else {
        println!("{} Current configuration:", style("⚙").blue().bold());
        match path.map(Path::to_path_buf).or_else(ConfigLoader::config_exists) {
            Some(file) => display_info(&format!("Loaded from {}", file.display())),
            None => display_info("No configuration file found, using defaults"),
        }
        print!("{}", serde_yaml::to_string(config)?);
    }
    Ok(())
}

/// Poll both walkers at the configured cadence until they are done; Ctrl-C stops the run
async fn watch_run(
    service: &SyncService,
    display: &RunProgressDisplay,
    scan: &ScanProgress,
    transfer: Option<&TransferProgress>,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut stopping = false;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                display.update(scan, transfer);
                if scan.is_done() && transfer.map_or(true, TransferProgress::is_done) {
                    break;
                }
            }
            _ = &mut ctrl_c, if !stopping => {
                stopping = true;
                display.note("Stopping...");
                service.stop();
            }
        }
    }
}

async fn join_workers(service: Arc<SyncService>) -> Result<()> {
    tokio::task::spawn_blocking(move || service.join())
        .await
        .context("Worker join task failed")??;
    Ok(())
}

fn validated_folder(validator: &PathValidator, label: &str, input: &str) -> Result<PathBuf> {
    let result = validator.validate(input);
    if !result.valid {
        for message in &result.errors {
            display_error(message);
        }
        bail!("{} path is invalid: '{}'", label, input);
    }
    result
        .path
        .ok_or_else(|| anyhow!("{} path is invalid: '{}'", label, input))
}

/// Refuse destinations whose mirror would land inside the source tree
fn ensure_disjoint(source: &Path, destination: &Path) -> Result<()> {
    let source = source
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", source.display()))?;
    let destination = destination
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", destination.display()))?;
    if destination.starts_with(&source) {
        bail!(
            "Destination {} is inside source {}",
            destination.display(),
            source.display()
        );
    }

    let mirror = match source.file_name() {
        Some(name) => destination.join(name),
        None => destination.clone(),
    };
    let mirror = mirror.canonicalize().unwrap_or(mirror);
    if mirror.starts_with(&source) {
        bail!(
            "Destination {} would mirror {} onto itself",
            destination.display(),
            source.display()
        );
    }
    Ok(())
}
