use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use stellar_planner::export::{plan::PlanRecord, plan::write_json, writer_for_path};
use stellar_planner::impulsive::{self, BurnFrame, Maneuver};
use stellar_planner::orbits::BodyId;
use stellar_planner::primitives::time::{seconds_to_days, split_duration};
use stellar_planner::primitives::units::to_radian;
use stellar_planner::scenario;
use stellar_planner::system::{Event, Universe};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Plan impulsive maneuvers for a ship in a scenario")]
struct Cli {
    /// Scenario file (YAML or TOML)
    #[arg(long)]
    scenario: PathBuf,

    /// Ship (or body) to plan for, case-insensitive
    #[arg(long)]
    ship: String,

    /// What to plan
    #[arg(long, value_enum)]
    command: CommandKind,

    /// Radius in km for apsis changes and Hohmann, inclination in degrees for plane changes
    #[arg(long)]
    value: Option<f64>,

    /// Target body for plane matching, intercepts and Lambert transfers
    #[arg(long)]
    target: Option<String>,

    /// Planning time in seconds
    #[arg(long, default_value_t = 0.0)]
    at: f64,

    /// Arrival time in seconds (Lambert only)
    #[arg(long)]
    arrive: Option<f64>,

    /// Write the plan as JSON to this path (`-` for stdout)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Run the scenario's scripted commands for this many seconds instead of planning
    #[arg(long)]
    simulate: Option<f64>,

    /// Tick length in seconds when simulating
    #[arg(long, default_value_t = 60.0)]
    step: f64,
}

#[derive(Copy, Clone, ValueEnum, Debug)]
enum CommandKind {
    CircularizeApoapsis,
    CircularizePeriapsis,
    SetApoapsis,
    SetPeriapsis,
    SetInclination,
    SetCircularInclination,
    MatchPlanes,
    Hohmann,
    CoplanarIntercept,
    Lambert,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut loaded = scenario::load(&cli.scenario)
        .with_context(|| format!("loading scenario {}", cli.scenario.display()))?;

    if let Some(duration) = cli.simulate {
        return simulate(&mut loaded, duration, cli.step);
    }

    let orbit = loaded.orbit(&cli.ship)?;
    let value = || cli.value.context("--value is required for this command");
    let target = || -> anyhow::Result<_> {
        let name = cli.target.as_deref().context("--target is required for this command")?;
        Ok(loaded.orbit(name)?)
    };

    let maneuvers: Vec<Maneuver> = match cli.command {
        CommandKind::CircularizeApoapsis => vec![impulsive::circularize_at_apoapsis(&orbit, cli.at)?],
        CommandKind::CircularizePeriapsis => vec![impulsive::circularize_at_periapsis(&orbit, cli.at)?],
        CommandKind::SetApoapsis => vec![impulsive::set_apoapsis(&orbit, value()?, cli.at)?],
        CommandKind::SetPeriapsis => vec![impulsive::set_periapsis(&orbit, value()?, cli.at)?],
        CommandKind::SetInclination => {
            vec![impulsive::set_inclination(&orbit, to_radian(value()?), cli.at)?]
        }
        CommandKind::SetCircularInclination => {
            vec![impulsive::set_circular_inclination(&orbit, to_radian(value()?), cli.at)?]
        }
        CommandKind::MatchPlanes => vec![impulsive::match_planes(&orbit, &target()?, cli.at)?],
        CommandKind::Hohmann => impulsive::hohmann_transfer(&orbit, value()?, cli.at)?.to_vec(),
        CommandKind::CoplanarIntercept => {
            impulsive::coplanar_intercept(&orbit, &target()?, cli.at)?.to_vec()
        }
        CommandKind::Lambert => {
            let Some(arrive) = cli.arrive else {
                bail!("--arrive is required for lambert");
            };
            impulsive::lambert_intercept(&orbit, &target()?, cli.at, arrive)?.to_vec()
        }
    };

    let command_name = format!("{:?}", cli.command);
    let plan = PlanRecord::build(&cli.ship, &command_name, &orbit, &maneuvers)?;

    println!("=== Maneuver Plan: {} ({}) ===", cli.ship, command_name);
    for (index, maneuver) in maneuvers.iter().enumerate() {
        let (days, hours, minutes) = split_duration(maneuver.time);
        let frame = match maneuver.frame {
            BurnFrame::Orbital => "orbital",
            BurnFrame::Inertial => "inertial",
        };
        println!(
            "Burn {}: t = {:.1} s ({}d{:02}h{:02}m), Δv = {:.4} km/s [{:.4}, {:.4}, {:.4}] {}",
            index + 1,
            maneuver.time,
            days,
            hours,
            minutes,
            maneuver.magnitude(),
            maneuver.delta_v[0],
            maneuver.delta_v[1],
            maneuver.delta_v[2],
            frame
        );
    }
    println!("Total Δv = {:.4} km/s", plan.total_delta_v_km_s);
    let fin = &plan.final_orbit;
    println!(
        "Final orbit: a = {:.1} km, e = {:.6}, i = {:.3} deg",
        fin.semi_major_axis_km, fin.eccentricity, fin.inclination_deg
    );
    if let Some(last) = maneuvers.last() {
        println!("Completes after {:.3} days", seconds_to_days(last.time - cli.at));
    }

    if let Some(path) = &cli.output {
        let writer = writer_for_path(path)?;
        write_json(writer, &plan)?;
    }
    Ok(())
}

fn simulate(loaded: &mut scenario::Scenario, duration: f64, step: f64) -> anyhow::Result<()> {
    if !(step > 0.0) {
        bail!("--step must be positive");
    }
    let universe = &mut loaded.universe;

    let mut elapsed = 0.0;
    while elapsed < duration {
        let dt = step.min(duration - elapsed);
        elapsed += dt;
        for event in universe.tick(dt) {
            let time = universe.time();
            match event {
                Event::ManeuverExecuted { id, maneuver } => println!(
                    "[{time:>12.1}] {} burned {:.4} km/s",
                    name(&*universe, id),
                    maneuver.magnitude()
                ),
                Event::CommandExecuted { id, command, .. } => {
                    println!("[{time:>12.1}] {} planned {}", name(&*universe, id), command.name())
                }
                Event::ExitedSoi { id, from, to } => println!(
                    "[{time:>12.1}] {} left {} for {}",
                    name(&*universe, id),
                    name(&*universe, from),
                    name(&*universe, to)
                ),
                Event::EnteredSoi { id, to, .. } => {
                    println!("[{time:>12.1}] {} entered {}", name(&*universe, id), name(&*universe, to))
                }
                Event::Crashed { id, into } => {
                    println!("[{time:>12.1}] {} crashed into {}", name(&*universe, id), name(&*universe, into))
                }
            }
        }
    }

    for id in &loaded.ships {
        let Some(ship) = loaded.universe.get(*id) else {
            continue;
        };
        match ship.orbit {
            Some(orbit) if !ship.crashed => println!(
                "{}: a = {:.1} km, e = {:.6}, periapsis = {:.1} km",
                ship.name,
                orbit.semi_major_axis,
                orbit.eccentricity,
                orbit.periapsis()
            ),
            _ => println!("{}: lost", ship.name),
        }
    }
    Ok(())
}

fn name(universe: &Universe, id: BodyId) -> String {
    universe.get(id).map(|e| e.name.clone()).unwrap_or_default()
}
