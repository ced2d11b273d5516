//! muonfit command-line interface.
//!
//! Runs the profile pass that feeds the external tank-length fit, the full
//! reconstruction once fits exist, and inspects fit tables.
#![allow(clippy::uninlined_format_args, clippy::too_many_lines)]

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};
use muonfit_algorithms::{record_outcomes, EventOutcome, RunContext};
use muonfit_core::{
    AngleSource, EventInput, RangeLengthMethod, ReconstructionConfig, RejectReason, RunStatistics,
};
use muonfit_io::{
    read_config, EventReader, ProfileWriter, ResultWriter, SensorTable, TrackFitTable,
};
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    MuonfitIo(#[from] muonfit_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] muonfit_core::Error),
}

/// Range-stage length estimator selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum RangeMethod {
    /// Distance between the fitted stub endpoints
    Stub,
    /// Sum of distances between consecutive hit paddles
    Dots,
    /// Layers crossed times layer thickness
    Layers,
}

impl From<RangeMethod> for RangeLengthMethod {
    fn from(method: RangeMethod) -> Self {
        match method {
            RangeMethod::Stub => Self::StubEndpoints,
            RangeMethod::Dots => Self::ConnectTheDots,
            RangeMethod::Layers => Self::LayerCount,
        }
    }
}

/// Settings shared by the commands that process events.
#[derive(clap::Args)]
struct RunArgs {
    /// Events, one JSON object per line
    #[arg(short, long)]
    events: PathBuf,

    /// Detector description (JSON)
    #[arg(short, long)]
    geometry: PathBuf,

    /// Run configuration (JSON); unset fields keep their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Simulated input: charges are photoelectrons, no trigger delay
    #[arg(long)]
    simulation: bool,

    /// Events processed per parallel batch
    #[arg(long, default_value = "10000")]
    batch_size: usize,
}

/// Two-stage muon track, vertex and energy reconstruction.
#[derive(Parser)]
#[command(name = "muonfit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconstruct vertices and energies
    Reconstruct {
        #[command(flatten)]
        run: RunArgs,

        /// Fitted tank lengths (`event_id,cluster_time,tank_length`)
        #[arg(short, long)]
        fits: Option<PathBuf>,

        /// Result CSV
        #[arg(short, long)]
        output: PathBuf,

        /// Also write photon-density profiles to this CSV
        #[arg(short, long)]
        profiles: Option<PathBuf>,

        /// Range-stage length estimator (overrides the config file)
        #[arg(long, value_enum)]
        range_length: Option<RangeMethod>,

        /// Take the track angle from a principal-direction fit of the paddle hits
        #[arg(long)]
        pca_angle: bool,

        /// Report the energy seed instead of integrating the energy loss
        #[arg(long)]
        simple_energy: bool,
    },

    /// Write photon-density profiles for the external tank-length fit
    Profile {
        #[command(flatten)]
        run: RunArgs,

        /// Profile CSV
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Summarize a tank-length fit table
    Fits {
        /// Fit table
        input: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Loads the configuration and detector description for a run.
fn load_run(run: &RunArgs) -> Result<(ReconstructionConfig, SensorTable)> {
    let mut config = match &run.config {
        Some(path) => read_config(path)?,
        None => ReconstructionConfig::default(),
    };
    if run.simulation {
        config = config.with_simulation_readout();
    }
    let geometry = SensorTable::open(&run.geometry)?;
    if let Some(tank) = geometry.tank() {
        config = config.with_tank(tank.clone());
    }
    info!(
        "{} sensors from {}",
        geometry.len(),
        run.geometry.display()
    );
    Ok((config, geometry))
}

/// Streams events through `context` in batches, handing each batch's
/// outcomes to `sink`.
fn process_events<F>(
    path: &Path,
    batch_size: usize,
    context: &RunContext<'_>,
    mut sink: F,
) -> Result<RunStatistics>
where
    F: FnMut(&[EventOutcome]) -> Result<()>,
{
    let mut stats = RunStatistics::new();
    let mut batch: Vec<EventInput> = Vec::with_capacity(batch_size.min(100_000));
    let mut reader = EventReader::open(path)?;
    loop {
        batch.clear();
        for event in reader.by_ref().take(batch_size.max(1)) {
            batch.push(event?);
        }
        if batch.is_empty() {
            break;
        }
        let outcomes = context.reconstruct_events(&batch);
        let mut batch_stats = RunStatistics::new();
        record_outcomes(&mut batch_stats, &outcomes);
        sink(&outcomes)?;
        stats.merge(&batch_stats);
        info!("{} events processed", stats.events_seen);
    }
    Ok(stats)
}

fn log_summary(stats: &RunStatistics) {
    info!(
        "events: {} seen, {} reconstructed, {} without fit, {} rejected, {} profiles",
        stats.events_seen,
        stats.reconstructed,
        stats.no_fit,
        stats.rejected_total(),
        stats.profiles_built
    );
    for reason in RejectReason::ALL {
        let count = stats.rejected_for(reason);
        if count > 0 {
            info!("  rejected {}: {}", reason.label(), count);
        }
    }
    if let Some(mean) = stats.mean_kinetic_energy() {
        info!("mean reconstructed kinetic energy: {:.1} MeV", mean);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Reconstruct {
            run,
            fits,
            output,
            profiles,
            range_length,
            pca_angle,
            simple_energy,
        } => {
            let start = Instant::now();
            let (mut config, geometry) = load_run(&run)?;
            if let Some(method) = range_length {
                config = config.with_range_length(method.into());
            }
            if pca_angle {
                config = config.with_angle_source(AngleSource::PrincipalDirection);
            }
            if simple_energy {
                config = config.with_simple_energy(true);
            }

            let fits = fits.map(TrackFitTable::open).transpose()?;
            let mut context = RunContext::new(config, &geometry)?;
            match &fits {
                Some(table) => {
                    info!("{} track fits loaded", table.len());
                    context = context.with_fits(table);
                }
                None => warn!("no fit table given, every event will lack a tank length"),
            }

            let mut results = ResultWriter::create(&output)?;
            let mut profile_writer = profiles.as_ref().map(ProfileWriter::create).transpose()?;
            let stats = process_events(&run.events, run.batch_size, &context, |outcomes| {
                results.write_outcomes(outcomes)?;
                if let Some(writer) = profile_writer.as_mut() {
                    writer.write_outcomes(outcomes)?;
                }
                Ok(())
            })?;

            log_summary(&stats);
            println!(
                "Reconstructed {} of {} events in {:.2}s",
                stats.reconstructed,
                stats.events_seen,
                start.elapsed().as_secs_f64()
            );
            println!("Results: {}", output.display());
            if let Some(path) = profiles {
                println!("Profiles: {}", path.display());
            }
        }

        Commands::Profile { run, output } => {
            let start = Instant::now();
            let (config, geometry) = load_run(&run)?;
            let context = RunContext::new(config, &geometry)?;

            let mut writer = ProfileWriter::create(&output)?;
            let stats = process_events(&run.events, run.batch_size, &context, |outcomes| {
                writer.write_outcomes(outcomes)?;
                Ok(())
            })?;

            log_summary(&stats);
            println!(
                "Wrote {} profiles from {} events in {:.2}s",
                stats.profiles_built,
                stats.events_seen,
                start.elapsed().as_secs_f64()
            );
        }

        Commands::Fits { input } => {
            let table = TrackFitTable::open(&input)?;
            let summary = table.summary();

            println!("File: {}", input.display());
            println!("Events: {}", summary.entries);
            println!("Unusable fits: {}", summary.unusable);
            if let (Some(min), Some(max), Some(mean)) =
                (summary.min_length, summary.max_length, summary.mean_length())
            {
                println!("Tank length: min {:.1} cm, max {:.1} cm, mean {:.1} cm", min, max, mean);
            }
        }
    }

    Ok(())
}
