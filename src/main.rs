use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use gce_sd::{Config, DiscoveryMetrics, GceInstanceGroupProvider, Target};
use prometheus::{Encoder, Registry, TextEncoder};
use std::io::Write;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Discover scrape targets from GCE instance groups
#[derive(Parser, Debug)]
#[command(name = "gce-sd", version, about, long_about = None)]
struct Args {
    /// Path to the YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Only run discovery for this job
    #[arg(short, long)]
    job: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print discovery metrics to stderr after the run
    #[arg(long)]
    metrics: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(
    level: LogLevel,
    log_file: Option<&PathBuf>,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let Some(log_path) = log_file else {
        tracing_subscriber::fmt()
            .with_max_level(tracing_level)
            .with_writer(std::io::stderr)
            .with_target(true)
            .init();
        return Ok(None);
    };

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("gce-sd started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level, args.log_file.as_ref())?;

    let config_path = args
        .config
        .clone()
        .or_else(Config::default_path)
        .context("No config file given and no config directory found")?;
    let config = Config::load(&config_path)?;

    let jobs: Vec<_> = match &args.job {
        Some(name) => vec![config
            .job(name)
            .with_context(|| format!("No job named {:?} in config", name))?
            .clone()],
        None => config.jobs.clone(),
    };

    let registry = Registry::new();
    let metrics = DiscoveryMetrics::new().context("Failed to create metrics")?;
    metrics
        .register(&registry)
        .context("Failed to register metrics")?;

    let mut all_targets: Vec<Target> = Vec::new();
    let mut failed = Vec::new();

    for job in jobs {
        let name = job.name.clone();
        let provider =
            GceInstanceGroupProvider::new(job, config.global_labels.clone(), metrics.clone())
                .with_context(|| format!("Failed to set up discovery for job {}", name))?;

        match provider.targets().await {
            Ok(targets) => {
                tracing::info!("Job {}: {} targets", name, targets.len());
                all_targets.extend(targets);
            }
            Err(e) => {
                tracing::warn!("Job {}: discovery failed: {}", name, e);
                failed.push(name);
            }
        }
    }

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &all_targets)?;
    writeln!(stdout)?;

    if args.metrics {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&registry.gather(), &mut buf)?;
        std::io::stderr().write_all(&buf)?;
    }

    if !failed.is_empty() {
        anyhow::bail!("Discovery failed for jobs: {}", failed.join(", "));
    }

    Ok(())
}
