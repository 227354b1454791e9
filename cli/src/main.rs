//! Command-line front end for the slatecast batch coordinator.
//!
//! Wires the coordinator to the in-memory collaborators so a full batch
//! lifecycle can be exercised from a shell: a synthetic slate, a seeded
//! line source, and a simulated worker pool whose failure and silence
//! behavior is controlled by flags.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use slatecast::config::Settings;
use slatecast::coordinator::{BatchDisposition, BatchOutcome, Coordinator};
use slatecast::dispatch::Dispatcher;
use slatecast::event::EventRouter;
use slatecast::inmem::{
    InMemoryEntitySource, InMemoryLineSource, SimulatedWorkerQueue, WorkerSimConfig,
};
use slatecast::progress::ProgressTracker;
use slatecast::report::{JsonlReportSink, LogReportSink, ReportSink};
use slatecast::request::RequestBuilder;

#[derive(Parser)]
#[command(name = "slatecast")]
#[command(about = "Coordinate batches of player projection jobs", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a TOML settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one batch against the simulated worker pool
    Run(RunArgs),
    /// Print the effective settings
    Config,
}

#[derive(clap::Args)]
struct RunArgs {
    /// Slate date as YYYY-MM-DD (defaults to tomorrow)
    #[arg(long)]
    date: Option<String>,

    /// Number of synthetic players on the slate
    #[arg(long, default_value = "25")]
    players: usize,

    /// Dispatch the five-line ladder around each resolved line
    #[arg(long)]
    ladder: bool,

    /// Override the stall threshold, in seconds
    #[arg(long)]
    stall_threshold: Option<u64>,

    /// Override the whole-batch timeout, in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Simulated worker latency in milliseconds
    #[arg(long, default_value = "10")]
    latency_ms: u64,

    /// Player key whose worker reports a failure (repeatable)
    #[arg(long = "fail", value_name = "KEY")]
    fail_keys: Vec<String>,

    /// Player key whose worker never answers (repeatable)
    #[arg(long = "silent", value_name = "KEY")]
    silent_keys: Vec<String>,

    /// How many times each completion event is delivered
    #[arg(long, default_value = "1")]
    deliveries: u32,

    /// Directory for JSONL batch reports (log-only when unset)
    #[arg(long, value_name = "DIR")]
    report_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("slatecast=debug,warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("slatecast=info,warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;

    match cli.command {
        Commands::Run(args) => run_batch(&settings, args).await,
        Commands::Config => {
            print_settings(&settings);
            Ok(())
        }
    }
}

async fn run_batch(settings: &Settings, args: RunArgs) -> Result<()> {
    let slate_date = match &args.date {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .with_context(|| format!("invalid slate date '{}', expected YYYY-MM-DD", raw))?,
        None => Utc::now().date_naive() + ChronoDuration::days(1),
    };

    let mut coordinator_config = settings.coordinator_config();
    if let Some(secs) = args.stall_threshold {
        coordinator_config = coordinator_config.with_stall_threshold(Duration::from_secs(secs));
    }
    if let Some(secs) = args.timeout {
        coordinator_config = coordinator_config.with_batch_timeout(Duration::from_secs(secs));
    }

    let mut builder_config = settings.builder_config();
    if args.ladder {
        builder_config = builder_config.with_ladder(true);
    }
    debug!(
        stall_threshold = ?coordinator_config.stall_threshold,
        batch_timeout = ?coordinator_config.batch_timeout,
        ladder = builder_config.ladder,
        "effective batch settings"
    );

    let mut sim = WorkerSimConfig::new()
        .with_latency(Duration::from_millis(args.latency_ms))
        .with_deliveries_per_completion(args.deliveries);
    for key in &args.fail_keys {
        sim = sim.with_fail_key(key);
    }
    for key in &args.silent_keys {
        sim = sim.with_silent_key(key);
    }

    let tracker = ProgressTracker::new(0);
    let queue = Arc::new(SimulatedWorkerQueue::new(
        EventRouter::new(tracker.clone()),
        sim,
    ));

    let entities = Arc::new(InMemoryEntitySource::synthetic(args.players));
    let lines = Arc::new(seeded_line_source(args.players));
    let builder = RequestBuilder::new(builder_config, entities, lines);

    let sink: Arc<dyn ReportSink> = match &args.report_dir {
        Some(dir) => Arc::new(
            JsonlReportSink::new(dir.clone()).context("failed to create report directory")?,
        ),
        None => Arc::new(LogReportSink),
    };

    let coordinator = Coordinator::with_tracker(
        coordinator_config,
        builder,
        Dispatcher::new(queue.clone()),
        sink,
        tracker,
    );

    println!("Slate {}: {} players", slate_date, args.players);

    let outcome = coordinator.run(slate_date).await?;
    queue.drain().await;

    print_outcome(&outcome);
    if let Some(dir) = &args.report_dir {
        let path = dir.join(format!("{}.jsonl", outcome.batch_id));
        println!();
        println!("Report written to {}", path.display());
    }

    Ok(())
}

fn print_outcome(outcome: &BatchOutcome) {
    let label = match outcome.disposition {
        BatchDisposition::Completed => "COMPLETED".green().bold(),
        BatchDisposition::Stalled => "STALLED".yellow().bold(),
        BatchDisposition::Aborted => "ABORTED".red().bold(),
        BatchDisposition::Empty => "EMPTY".blue().bold(),
    };

    println!();
    println!("Batch {} finished: {}", outcome.batch_id, label);
    println!();
    print!("{}", outcome.summary.format_table());

    if !outcome.failures.is_empty() {
        println!();
        println!("{}", "Failures:".yellow());
        for failure in &outcome.failures {
            println!("  {} - {}", failure.entity_key, failure.reason);
        }
    }

    if !outcome.missing.is_empty() {
        println!();
        println!("{}", "Missing after reconciliation:".red());
        for entity_key in &outcome.missing {
            println!("  {}", entity_key);
        }
    }
}

fn print_settings(settings: &Settings) {
    println!("[coordinator]");
    println!("poll_interval_ms = {}", settings.coordinator.poll_interval_ms);
    println!(
        "stall_threshold_secs = {}",
        settings.coordinator.stall_threshold_secs
    );
    println!(
        "batch_timeout_secs = {}",
        settings.coordinator.batch_timeout_secs
    );
    println!();
    println!("[builder]");
    println!(
        "min_projected_minutes = {}",
        settings.builder.min_projected_minutes
    );
    println!(
        "max_lookahead_days = {}",
        settings.builder.max_lookahead_days
    );
    println!("default_line = {}", settings.builder.default_line);
    println!("ladder = {}", settings.builder.ladder);
}

/// Seed published lines for a third of the slate and scoring history for
/// another third. The remainder fall through to the default line.
fn seeded_line_source(players: usize) -> InMemoryLineSource {
    let mut lines = InMemoryLineSource::new();
    for i in 1..=players {
        let key = format!("player-{:03}", i);
        match i % 3 {
            0 => lines = lines.with_published(&key, 18.5 + (i % 20) as f64),
            1 => lines = lines.with_average(&key, 14.2 + (i % 17) as f64 * 0.9),
            _ => {}
        }
    }
    lines
}
