//! Constellation CLI
//!
//! Usage:
//!   constellation snapshots --out snapshots --steps 50 --step-seconds 600
//!   constellation clusters --links engLogs/clusters/000 \
//!                          --snapshot snapshots/000 \
//!                          --plane-start 1 --plane-end 5 \
//!                          --output clusters_000.json

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use cluster_analysis::ClusterAssignmentBuilder;
use constellation_tool::{io, ClusterReport, RunConfig};
use orbital_mechanics::{SnapshotSequence, TwoBodyPropagator};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "constellation",
    about = "Walker Delta snapshots and per-timestep cluster reports"
)]
struct Cli {
    /// JSON run configuration (defaults apply to missing fields)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate the constellation and write one snapshot file per step
    Snapshots(SnapshotArgs),
    /// Build the cluster assignment for one link log
    Clusters(ClusterArgs),
}

#[derive(Args, Debug)]
struct SnapshotArgs {
    /// Output directory
    #[arg(short, long, default_value = "snapshots")]
    out: PathBuf,

    #[arg(long)]
    planes: Option<u32>,

    #[arg(long)]
    sats_per_plane: Option<u32>,

    #[arg(long)]
    altitude_km: Option<f64>,

    #[arg(long)]
    inclination_deg: Option<f64>,

    /// Walker phasing factor
    #[arg(long)]
    phasing: Option<u32>,

    /// Seconds between snapshots
    #[arg(long)]
    step_seconds: Option<f64>,

    /// Number of snapshots
    #[arg(long)]
    steps: Option<usize>,
}

#[derive(Args, Debug)]
struct ClusterArgs {
    /// Link/cluster log for one timestep
    #[arg(short, long)]
    links: PathBuf,

    /// Snapshot of the same timestep, adds map coordinates to members
    #[arg(short, long)]
    snapshot: Option<PathBuf>,

    /// First plane of the view (1-based)
    #[arg(long)]
    plane_start: Option<u32>,

    /// Last plane of the view (inclusive)
    #[arg(long)]
    plane_end: Option<u32>,

    #[arg(long)]
    sats_per_plane: Option<u32>,

    /// Report file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "constellation=debug,orbital_mechanics=debug,cluster_analysis=debug,constellation_tool=debug"
    } else {
        "constellation=info,constellation_tool=info,cluster_analysis=warn,orbital_mechanics=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => RunConfig::load(path)
            .with_context(|| format!("loading configuration from {:?}", path))?,
        None => RunConfig::default(),
    };

    match cli.command {
        Command::Snapshots(args) => run_snapshots(&mut config, args),
        Command::Clusters(args) => run_clusters(&mut config, args),
    }
}

fn run_snapshots(config: &mut RunConfig, args: SnapshotArgs) -> Result<()> {
    let shell = &mut config.constellation;
    if let Some(v) = args.planes {
        shell.planes = v;
    }
    if let Some(v) = args.sats_per_plane {
        shell.sats_per_plane = v;
    }
    if let Some(v) = args.altitude_km {
        shell.altitude_km = v;
    }
    if let Some(v) = args.inclination_deg {
        shell.inclination_deg = v;
    }
    if let Some(v) = args.phasing {
        shell.phasing = v;
    }
    if let Some(v) = args.step_seconds {
        config.schedule.step_seconds = v;
    }
    if let Some(v) = args.steps {
        config.schedule.steps = v;
    }
    config.validate_propagation()?;

    let shell = &config.constellation;
    info!(
        "Walker {:.1}°: {}/{}/{} at {} km",
        shell.inclination_deg,
        shell.total_satellites(),
        shell.planes,
        shell.phasing,
        shell.altitude_km
    );

    let satellites = shell.generate()?;
    info!("Total satellites created: {}", satellites.len());

    let sequence = SnapshotSequence::new(
        satellites,
        TwoBodyPropagator::for_body(&shell.body),
        config.schedule.step_seconds,
        config.schedule.steps,
    )?;

    let manifest = io::write_snapshot_sequence(&args.out, sequence, config)
        .with_context(|| format!("writing snapshots to {:?}", args.out))?;
    info!(
        "Done: {} snapshots, {} satellites each",
        manifest.snapshot_files.len(),
        manifest.satellites
    );

    Ok(())
}

fn run_clusters(config: &mut RunConfig, args: ClusterArgs) -> Result<()> {
    if let Some(v) = args.plane_start {
        config.clusters.plane_start = v;
    }
    if let Some(v) = args.plane_end {
        config.clusters.plane_end = v;
    }
    if let Some(v) = args.sats_per_plane {
        config.constellation.sats_per_plane = v;
    }
    let range = config.cluster_range()?;
    info!("Cluster view: satellites {}..={}", range.min, range.max);

    let log = io::read_link_log(&args.links)
        .with_context(|| format!("reading link log {:?}", args.links))?;
    let assignment = ClusterAssignmentBuilder::new(range).build(&log);

    let positions = match &args.snapshot {
        Some(path) => Some(
            io::read_snapshot(path).with_context(|| format!("reading snapshot {:?}", path))?,
        ),
        None => None,
    };
    let report = ClusterReport::new(range, &assignment, positions.as_deref())?;

    info!(
        "{} clusters, {} heads, {} findings, {} lines skipped, {} records out of range",
        report.clusters.len(),
        report.heads.len(),
        report.findings.len(),
        report.skipped_lines,
        report.out_of_range
    );
    for finding in &report.findings {
        warn!("{:?}", finding);
    }

    match &args.output {
        Some(path) => {
            let file = File::create(path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &report)?;
            writer.flush()?;
            info!("Wrote report to {:?}", path);
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = stdout.lock();
            serde_json::to_writer_pretty(&mut writer, &report)?;
            writeln!(writer)?;
        }
    }

    Ok(())
}
