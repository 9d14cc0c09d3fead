//! Turn a [`ScenarioConfig`] into a populated [`Universe`].

use std::path::Path;

use stellar_config::{BodyConfig, CommandConfig, ConfigError, ScenarioConfig, load_scenario};
use stellar_impulsive::Command;
use stellar_orbits::{BodyId, Orbit, OrbitError};
use stellar_system::{Body, SystemError, Universe};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    System(#[from] SystemError),
    #[error(transparent)]
    Orbit(#[from] OrbitError),
    #[error("scenario has no root body")]
    MissingRoot,
    #[error("scenario has more than one root body: {0} and {1}")]
    MultipleRoots(String, String),
    #[error("body or ship `{0}` not found")]
    UnknownName(String),
    #[error("`{0}` needs an orbit")]
    MissingOrbit(String),
}

/// A loaded scenario: the universe plus the ships it placed, in file order.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub universe: Universe,
    pub ships: Vec<BodyId>,
}

impl Scenario {
    pub fn id(&self, name: &str) -> Result<BodyId, ScenarioError> {
        lookup(&self.universe, name)
    }

    /// Current orbit of a named body or ship.
    pub fn orbit(&self, name: &str) -> Result<Orbit, ScenarioError> {
        let id = self.id(name)?;
        self.universe
            .entity(id)?
            .orbit
            .ok_or_else(|| ScenarioError::MissingOrbit(name.to_string()))
    }
}

pub fn load<P: AsRef<Path>>(path: P) -> Result<Scenario, ScenarioError> {
    let config = load_scenario(path)?;
    build(&config)
}

/// Build the body tree parents-first, place the ships and queue their scripted commands.
pub fn build(config: &ScenarioConfig) -> Result<Scenario, ScenarioError> {
    let mut universe = Universe::with_settings(config.solver.kepler_settings());

    let mut roots = config.bodies.iter().filter(|body| body.parent.is_none());
    let root = roots.next().ok_or(ScenarioError::MissingRoot)?;
    if let Some(other) = roots.next() {
        return Err(ScenarioError::MultipleRoots(root.name.clone(), other.name.clone()));
    }
    universe.add_root(root.name.clone(), body_params(root))?;

    let mut pending: Vec<&BodyConfig> = config.bodies.iter().filter(|b| b.parent.is_some()).collect();
    while !pending.is_empty() {
        let ready = pending.iter().position(|body| {
            body.parent
                .as_deref()
                .and_then(|parent| universe.find(parent))
                .is_some()
        });
        let Some(index) = ready else {
            let orphan = pending[0].parent.clone().unwrap_or_default();
            return Err(ScenarioError::UnknownName(orphan));
        };
        let body = pending.remove(index);
        let parent = lookup(&universe, body.parent.as_deref().unwrap_or_default())?;
        let elements = body
            .orbit
            .ok_or_else(|| ScenarioError::MissingOrbit(body.name.clone()))?;
        let orbit = elements.to_orbit(primary_gm(&universe, parent)?)?;
        universe.add_body(parent, body.name.clone(), body_params(body), orbit)?;
    }

    let mut ships = Vec::with_capacity(config.ships.len());
    for ship in &config.ships {
        let parent = lookup(&universe, &ship.parent)?;
        let orbit = ship.orbit.to_orbit(primary_gm(&universe, parent)?)?;
        ships.push(universe.add_vessel(parent, ship.name.clone(), orbit)?);
    }

    for scheduled in &config.commands {
        let ship = lookup(&universe, &scheduled.ship)?;
        match &scheduled.command {
            CommandConfig::TransferTo { target } => {
                let target = lookup(&universe, target)?;
                universe.transfer_to(ship, target)?;
            }
            other => {
                let command = resolve_command(&universe, other)?;
                universe.push_command(ship, command, scheduled.trigger.into())?;
            }
        }
    }

    info!(
        scenario = %config.name,
        bodies = config.bodies.len(),
        ships = ships.len(),
        "scenario loaded"
    );
    Ok(Scenario {
        name: config.name.clone(),
        universe,
        ships,
    })
}

/// Translate a configured command, looking up any target orbit by name.
///
/// `TransferTo` expands to several commands and is handled by [`Universe::transfer_to`].
pub fn resolve_command(universe: &Universe, command: &CommandConfig) -> Result<Command, ScenarioError> {
    let target_orbit = |name: &str| -> Result<Orbit, ScenarioError> {
        let id = lookup(universe, name)?;
        universe
            .entity(id)?
            .orbit
            .ok_or_else(|| ScenarioError::MissingOrbit(name.to_string()))
    };
    Ok(match command {
        CommandConfig::CircularizeAtApoapsis => Command::CircularizeAtApoapsis,
        CommandConfig::CircularizeAtPeriapsis => Command::CircularizeAtPeriapsis,
        CommandConfig::SetApoapsis { radius_km } => Command::SetApoapsis(*radius_km),
        CommandConfig::SetPeriapsis { radius_km } => Command::SetPeriapsis(*radius_km),
        CommandConfig::SetInclination { inclination_deg } => {
            Command::SetInclination(stellar_core::units::to_radian(*inclination_deg))
        }
        CommandConfig::MatchPlanes { target } => Command::MatchPlanes(target_orbit(target)?),
        CommandConfig::CoplanarIntercept { target } => {
            Command::CoplanarIntercept(target_orbit(target)?)
        }
        CommandConfig::CoplanarInterceptAndTransfer { target } | CommandConfig::TransferTo { target } => {
            Command::CoplanarInterceptAndTransfer(target_orbit(target)?)
        }
        CommandConfig::Impulse {
            radial_km_s,
            prograde_km_s,
            normal_km_s,
        } => Command::Impulse([*radial_km_s, *prograde_km_s, *normal_km_s]),
    })
}

fn lookup(universe: &Universe, name: &str) -> Result<BodyId, ScenarioError> {
    universe
        .find(name)
        .ok_or_else(|| ScenarioError::UnknownName(name.to_string()))
}

fn primary_gm(universe: &Universe, id: BodyId) -> Result<f64, ScenarioError> {
    universe
        .entity(id)?
        .body
        .map(|body| body.gm)
        .ok_or(ScenarioError::System(SystemError::NotABody(id)))
}

fn body_params(config: &BodyConfig) -> Body {
    let body = Body::new(config.mu_km3_s2, config.radius_km);
    match config.soi_radius_km {
        Some(soi) => body.with_soi(soi),
        None => body,
    }
}
