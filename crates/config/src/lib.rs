//! Configuration models and loaders for body catalogs, scenarios and solver settings.
//!
//! Angles are written in degrees in every file format and converted on the way in.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use stellar_core::units::to_radian;
use stellar_impulsive::Trigger;
use stellar_orbits::{KeplerSettings, Orbit, OrbitError};
use thiserror::Error;

/// A celestial body in a catalog. Bodies without a parent are the root of the system.
#[derive(Debug, Deserialize, Clone)]
pub struct BodyConfig {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    pub mu_km3_s2: f64,
    pub radius_km: f64,
    /// Computed from the orbit when absent.
    #[serde(default)]
    pub soi_radius_km: Option<f64>,
    #[serde(default)]
    pub orbit: Option<OrbitConfig>,
}

/// Classical elements as written in configuration files.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct OrbitConfig {
    pub semi_major_axis_km: f64,
    #[serde(default)]
    pub eccentricity: f64,
    #[serde(default)]
    pub inclination_deg: f64,
    #[serde(default)]
    pub lan_deg: f64,
    #[serde(default)]
    pub arg_periapsis_deg: f64,
    #[serde(default)]
    pub mean_anomaly_deg: f64,
    #[serde(default)]
    pub epoch_s: f64,
}

impl OrbitConfig {
    /// Build a validated orbit around a primary with gravitational parameter `gm`.
    pub fn to_orbit(&self, gm: f64) -> Result<Orbit, OrbitError> {
        Ok(Orbit::new(
            self.semi_major_axis_km,
            self.eccentricity,
            to_radian(self.inclination_deg),
            to_radian(self.lan_deg),
            to_radian(self.arg_periapsis_deg),
            to_radian(self.mean_anomaly_deg),
            gm,
        )?
        .with_epoch(self.epoch_s))
    }
}

/// A vessel placed in orbit around a named body.
#[derive(Debug, Deserialize, Clone)]
pub struct ShipConfig {
    pub name: String,
    pub parent: String,
    pub orbit: OrbitConfig,
}

/// When a scripted command runs.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TriggerConfig {
    #[default]
    Asap,
    OnManeuver,
    OnEnterSoi,
    OnExitSoi,
    OnCrash,
}

impl From<TriggerConfig> for Trigger {
    fn from(value: TriggerConfig) -> Self {
        match value {
            TriggerConfig::Asap => Trigger::Asap,
            TriggerConfig::OnManeuver => Trigger::OnManeuver,
            TriggerConfig::OnEnterSoi => Trigger::OnEnterSoi,
            TriggerConfig::OnExitSoi => Trigger::OnExitSoi,
            TriggerConfig::OnCrash => Trigger::OnCrash,
        }
    }
}

/// A command as written in a scenario. Targets are referenced by name.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandConfig {
    CircularizeAtApoapsis,
    CircularizeAtPeriapsis,
    SetApoapsis {
        radius_km: f64,
    },
    SetPeriapsis {
        radius_km: f64,
    },
    SetInclination {
        inclination_deg: f64,
    },
    MatchPlanes {
        target: String,
    },
    CoplanarIntercept {
        target: String,
    },
    CoplanarInterceptAndTransfer {
        target: String,
    },
    /// Full transfer sequence onto a sibling body.
    TransferTo {
        target: String,
    },
    Impulse {
        #[serde(default)]
        radial_km_s: f64,
        #[serde(default)]
        prograde_km_s: f64,
        #[serde(default)]
        normal_km_s: f64,
    },
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ScheduledCommand {
    pub ship: String,
    #[serde(default)]
    pub trigger: TriggerConfig,
    pub command: CommandConfig,
}

/// Kepler solver controls.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct SolverConfig {
    pub tolerance: f64,
    pub max_iterations: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        let defaults = KeplerSettings::default();
        Self {
            tolerance: defaults.tolerance,
            max_iterations: defaults.max_iterations,
        }
    }
}

impl SolverConfig {
    pub fn kepler_settings(&self) -> KeplerSettings {
        KeplerSettings {
            tolerance: self.tolerance,
            max_iterations: self.max_iterations,
        }
    }
}

/// A complete scenario: the body tree, the ships in it and their scripted commands.
#[derive(Debug, Deserialize, Clone)]
pub struct ScenarioConfig {
    pub name: String,
    #[serde(default)]
    pub bodies: Vec<BodyConfig>,
    /// Catalog file or directory merged in front of `bodies`, relative to the scenario file.
    #[serde(default)]
    pub catalog: Option<PathBuf>,
    #[serde(default)]
    pub ships: Vec<ShipConfig>,
    #[serde(default)]
    pub commands: Vec<ScheduledCommand>,
    #[serde(default)]
    pub solver: SolverConfig,
}

/// Errors that can occur while loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid solver settings: {0}")]
    Solver(String),
    #[error("body `{0}` is defined more than once")]
    DuplicateBody(String),
}

/// Load a body catalog from a YAML list, a single TOML record or a directory of TOML records.
pub fn load_bodies<P: AsRef<Path>>(path: P) -> Result<Vec<BodyConfig>, ConfigError> {
    let bodies: Vec<BodyConfig> = load_records(path)?;
    check_unique(&bodies)?;
    Ok(bodies)
}

/// Load a scenario from YAML or TOML, pulling in its catalog if it names one.
pub fn load_scenario<P: AsRef<Path>>(path: P) -> Result<ScenarioConfig, ConfigError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)?;
    let mut scenario: ScenarioConfig = if has_extension(path, "toml") {
        toml::from_str(&contents)?
    } else {
        serde_yaml::from_str(&contents)?
    };

    if let Some(catalog) = &scenario.catalog {
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let mut bodies = load_bodies(base.join(catalog))?;
        bodies.append(&mut scenario.bodies);
        scenario.bodies = bodies;
    }
    check_unique(&scenario.bodies)?;

    let solver = scenario.solver;
    if !(solver.tolerance > 0.0 && solver.tolerance.is_finite()) {
        return Err(ConfigError::Solver(format!("tolerance must be positive, got {}", solver.tolerance)));
    }
    if solver.max_iterations == 0 {
        return Err(ConfigError::Solver("max_iterations must be at least 1".into()));
    }
    Ok(scenario)
}

fn check_unique(bodies: &[BodyConfig]) -> Result<(), ConfigError> {
    for (index, body) in bodies.iter().enumerate() {
        if bodies[..index].iter().any(|other| other.name.eq_ignore_ascii_case(&body.name)) {
            return Err(ConfigError::DuplicateBody(body.name.clone()));
        }
    }
    Ok(())
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().map(|ext| ext == extension).unwrap_or(false)
}

fn load_records<T, P>(path: P) -> Result<Vec<T>, ConfigError>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if path.is_dir() {
        read_dir_records(path)
    } else if has_extension(path, "toml") {
        let contents = std::fs::read_to_string(path)?;
        let record: T = toml::from_str(&contents)?;
        Ok(vec![record])
    } else {
        let reader = File::open(path)?;
        Ok(serde_yaml::from_reader(reader)?)
    }
}

fn read_dir_records<T>(dir: &Path) -> Result<Vec<T>, ConfigError>
where
    T: for<'de> Deserialize<'de>,
{
    let mut records = Vec::new();
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| has_extension(path, "toml"))
        .collect();
    entries.sort();
    for path in entries {
        let contents = std::fs::read_to_string(&path)?;
        let record: T = toml::from_str(&contents)?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn orbit_config_converts_degrees() {
        let config = OrbitConfig {
            semi_major_axis_km: 7_000.0,
            eccentricity: 0.1,
            inclination_deg: 90.0,
            lan_deg: 180.0,
            arg_periapsis_deg: 45.0,
            mean_anomaly_deg: 0.0,
            epoch_s: 10.0,
        };
        let orbit = config.to_orbit(398_600.0).unwrap();
        assert!((orbit.inclination - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert!((orbit.lan - std::f64::consts::PI).abs() < 1e-12);
        assert_eq!(orbit.epoch, 10.0);
    }

    #[test]
    fn invalid_elements_are_rejected() {
        let config = OrbitConfig {
            semi_major_axis_km: -7_000.0,
            eccentricity: 0.5,
            inclination_deg: 0.0,
            lan_deg: 0.0,
            arg_periapsis_deg: 0.0,
            mean_anomaly_deg: 0.0,
            epoch_s: 0.0,
        };
        assert!(config.to_orbit(398_600.0).is_err());
    }

    #[test]
    fn commands_parse_from_tagged_yaml() {
        let yaml = "
- ship: Scout
  command: { type: set_apoapsis, radius_km: 20000 }
- ship: Scout
  trigger: on_maneuver
  command: { type: circularize_at_apoapsis }
- ship: Scout
  trigger: on_enter_soi
  command: { type: impulse, prograde_km_s: 0.5 }
";
        let commands: Vec<ScheduledCommand> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(commands[0].trigger, TriggerConfig::Asap);
        assert_eq!(commands[0].command, CommandConfig::SetApoapsis { radius_km: 20_000.0 });
        assert_eq!(Trigger::from(commands[1].trigger), Trigger::OnManeuver);
        assert_eq!(
            commands[2].command,
            CommandConfig::Impulse {
                radial_km_s: 0.0,
                prograde_km_s: 0.5,
                normal_km_s: 0.0
            }
        );
    }

    #[test]
    fn toml_directory_records_load_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        for (file, name) in [("b.toml", "Moon"), ("a.toml", "Earth")] {
            let mut handle = File::create(dir.path().join(file)).unwrap();
            writeln!(handle, "name = \"{name}\"\nmu_km3_s2 = 1.0\nradius_km = 1.0").unwrap();
        }
        let bodies = load_bodies(dir.path()).unwrap();
        let names: Vec<&str> = bodies.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Earth", "Moon"]);
    }

    #[test]
    fn scenario_solver_defaults_and_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.yaml");
        std::fs::write(&path, "name: empty\n").unwrap();
        let scenario = load_scenario(&path).unwrap();
        assert_eq!(scenario.solver, SolverConfig::default());
        assert!(scenario.ships.is_empty());

        std::fs::write(&path, "name: bad\nsolver:\n  max_iterations: 0\n").unwrap();
        assert!(matches!(load_scenario(&path), Err(ConfigError::Solver(_))));
    }

    #[test]
    fn duplicate_bodies_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bodies.yaml");
        std::fs::write(
            &path,
            "- { name: Earth, mu_km3_s2: 1.0, radius_km: 1.0 }\n- { name: earth, mu_km3_s2: 1.0, radius_km: 1.0 }\n",
        )
        .unwrap();
        assert!(matches!(load_bodies(&path), Err(ConfigError::DuplicateBody(_))));
    }
}
