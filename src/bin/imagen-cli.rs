use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use tracing::{info, warn, Level};

use imagen::batch::BatchScheduler;
use imagen::config::GenerationSettings;
use imagen::encode::StdEncoder;
use imagen::estimate::{estimate_count, estimate_total_size, estimated_unit_size};
use imagen::progress::BatchReport;
use imagen::sink::DirSink;

#[derive(Parser)]
#[command(name = "imagen-cli", version, about = "Generate batches of random images")]
struct Opts {
    /// Log more (-v for debug, -vv for trace).
    #[clap(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors.
    #[clap(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate images into a directory.
    Generate(GenerateArgs),
    /// Estimate total output size for a count, or a count for a total size.
    Estimate(EstimateArgs),
}

#[derive(clap::Args)]
struct GenerateArgs {
    /// Number of images to generate.
    count: u64,

    /// Output directory, created if missing.
    #[clap(short, long, default_value = "out")]
    out: PathBuf,

    /// File name prefix.
    #[clap(long, default_value = "image")]
    prefix: String,

    /// Worker threads. Defaults to the number of cores.
    #[clap(long)]
    threads: Option<usize>,

    /// Cancel the batch after this many seconds.
    #[clap(long)]
    timeout: Option<f64>,

    /// Read generation settings from a JSON file instead of the flags.
    #[clap(long)]
    settings: Option<PathBuf>,

    #[clap(flatten)]
    config: GenerationSettings,
}

#[derive(clap::Args)]
struct EstimateArgs {
    /// Image count to estimate the total size of.
    #[clap(long, conflicts_with = "total_size", required_unless_present = "total_size")]
    count: Option<u64>,

    /// Total size in bytes to estimate the image count for.
    #[clap(long)]
    total_size: Option<u64>,

    #[clap(flatten)]
    config: GenerationSettings,
}

fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();

    let level = match (opts.quiet, opts.verbose) {
        (true, _) => Level::WARN,
        (false, 0) => Level::INFO,
        (false, 1) => Level::DEBUG,
        (false, _) => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match opts.cmd {
        Command::Generate(args) => cmd_generate(args),
        Command::Estimate(args) => cmd_estimate(args),
    }
}

const POLL_INTERVAL: Duration = Duration::from_millis(500);

fn cmd_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let settings = match &args.settings {
        Some(path) => GenerationSettings::from_path(path)?,
        None => args.config,
    };
    settings.validate()?;

    let sink = DirSink::create(&args.out, args.prefix)
        .with_context(|| format!("create output dir '{}'", args.out.display()))?;
    let scheduler = BatchScheduler::new(Arc::new(StdEncoder), Arc::new(sink), args.threads)?;
    info!(
        count = args.count,
        threads = scheduler.threads(),
        out = %args.out.display(),
        "generating"
    );

    let deadline = args
        .timeout
        .map(|secs| Instant::now() + Duration::from_secs_f64(secs));
    let progress = scheduler.start(args.count, &settings)?;
    let report: BatchReport = loop {
        if let Some(report) = progress.wait_timeout(POLL_INTERVAL) {
            break report;
        }
        info!(
            completed = progress.completed(),
            total = progress.total(),
            "{:.1}%",
            progress.fraction_completed() * 100.0
        );
        if deadline.is_some_and(|d| Instant::now() >= d) && progress.cancel() {
            warn!("timeout reached, cancelling batch");
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_estimate(args: EstimateArgs) -> anyhow::Result<()> {
    let settings = args.config;
    settings.validate()?;
    info!(
        bytes = estimated_unit_size(&settings),
        "estimated size per image"
    );
    match (args.count, args.total_size) {
        (Some(count), _) => {
            let total = estimate_total_size(count, &settings);
            println!("approx. {} total", format_bytes(total));
        }
        (None, Some(total_size)) => {
            let count = estimate_count(total_size, &settings);
            let noun = if count == 1 { "image" } else { "images" };
            println!("{} {}", format_count(count), noun);
        }
        (None, None) => unreachable!("clap requires one of --count and --total-size"),
    }
    Ok(())
}

/// Decimal byte count with one fractional digit, e.g. `798.1 KB`.
fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["KB", "MB", "GB", "TB", "PB"];
    if bytes < 1000 {
        return format!("{} bytes", bytes);
    }
    let mut value = bytes as f64 / 1000.0;
    let mut unit = 0;
    while value >= 1000.0 && unit + 1 < UNITS.len() {
        value /= 1000.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Rounds large counts to thousands or millions, e.g. `12 K`.
fn format_count(count: u64) -> String {
    if count >= 1_000_000 {
        format!("{} M", (count as f64 / 1_000_000.0).round())
    } else if count >= 1_000 {
        format!("{} K", (count as f64 / 1_000.0).round())
    } else {
        count.to_string()
    }
}
