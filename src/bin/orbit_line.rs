use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use stellar_planner::export::orbit_line::{self, ORBIT_RESOLUTION};
use stellar_planner::export::writer_for_path;
use stellar_planner::scenario;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Sample an orbit from a scenario for plotting")]
struct Cli {
    /// Scenario file (YAML or TOML)
    #[arg(long)]
    scenario: PathBuf,

    /// Body or ship whose orbit to sample, case-insensitive
    #[arg(long)]
    name: String,

    /// Number of segments
    #[arg(long, default_value_t = ORBIT_RESOLUTION)]
    resolution: usize,

    #[arg(long, value_enum, default_value_t = Format::Csv)]
    format: Format,

    /// Output path (`-` for stdout)
    #[arg(long, default_value = "-")]
    output: PathBuf,
}

#[derive(Copy, Clone, ValueEnum, Debug)]
enum Format {
    Csv,
    Json,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let loaded = scenario::load(&cli.scenario)
        .with_context(|| format!("loading scenario {}", cli.scenario.display()))?;

    let orbit = loaded.orbit(&cli.name)?;
    let soi = match orbit.reference_body {
        Some(parent) => loaded
            .universe
            .entity(parent)?
            .body
            .map(|body| body.soi)
            .unwrap_or(f64::INFINITY),
        None => f64::INFINITY,
    };

    let points = orbit_line::sample(&orbit, cli.resolution, soi)?;
    info!(name = %cli.name, points = points.len(), soi, "sampled orbit line");

    let writer = writer_for_path(&cli.output)?;
    match cli.format {
        Format::Csv => orbit_line::write_csv(writer, &points)?,
        Format::Json => orbit_line::write_json(writer, &points)?,
    }
    Ok(())
}
