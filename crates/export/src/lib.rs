//! Export helpers for orbit lines and maneuver plans.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use stellar_orbits::OrbitError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to write JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Orbit(#[from] OrbitError),
}

/// Create a writer for the target path, handling stdout (`-`) by convention.
pub fn writer_for_path(path: &Path) -> io::Result<Box<dyn Write>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufWriter::new(io::stdout())));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    Ok(Box::new(BufWriter::new(file)))
}

pub mod orbit_line {
    use std::io::Write;

    use serde::Serialize;
    use stellar_orbits::Orbit;

    use super::ExportError;

    /// Default number of segments in a sampled orbit.
    pub const ORBIT_RESOLUTION: usize = 500;

    /// One vertex of a sampled orbit, relative to the orbited body.
    #[derive(Debug, Clone, Copy, PartialEq, Serialize)]
    pub struct OrbitPoint {
        pub true_anomaly_rad: f64,
        pub x_km: f64,
        pub y_km: f64,
        pub z_km: f64,
        pub radius_km: f64,
    }

    /// Sample `orbit` for drawing.
    ///
    /// Ellipses are swept over a full closed turn. Hyperbolas are swept strictly between their
    /// asymptotes. Points farther out than `soi` are dropped.
    pub fn sample(orbit: &Orbit, resolution: usize, soi: f64) -> Result<Vec<OrbitPoint>, ExportError> {
        let resolution = resolution.max(2);
        let anomalies: Vec<f64> = match orbit.asymptote_anomaly() {
            Some(limit) => (1..resolution)
                .map(|i| -limit + 2.0 * limit * i as f64 / resolution as f64)
                .collect(),
            None => (0..=resolution)
                .map(|i| std::f64::consts::TAU * i as f64 / resolution as f64)
                .collect(),
        };

        let mut points = Vec::with_capacity(anomalies.len());
        for v in anomalies {
            let position = orbit.position_at(v)?;
            let radius = orbit.orbiting_radius(v);
            if radius < soi {
                points.push(OrbitPoint {
                    true_anomaly_rad: v,
                    x_km: position[0],
                    y_km: position[1],
                    z_km: position[2],
                    radius_km: radius,
                });
            }
        }
        Ok(points)
    }

    pub fn write_csv<W: Write>(writer: W, points: &[OrbitPoint]) -> Result<(), ExportError> {
        let mut csv = csv::Writer::from_writer(writer);
        for point in points {
            csv.serialize(point)?;
        }
        csv.flush()?;
        Ok(())
    }

    pub fn write_json<W: Write>(writer: W, points: &[OrbitPoint]) -> Result<(), ExportError> {
        serde_json::to_writer_pretty(writer, points)?;
        Ok(())
    }
}

pub mod plan {
    use std::io::Write;

    use serde::Serialize;
    use stellar_core::units::to_degree;
    use stellar_impulsive::{BurnFrame, Maneuver};
    use stellar_orbits::Orbit;

    use super::ExportError;

    #[derive(Debug, Clone, Serialize)]
    pub struct ManeuverRecord {
        pub time_s: f64,
        pub frame: &'static str,
        pub delta_v_km_s: [f64; 3],
        pub magnitude_km_s: f64,
    }

    impl From<&Maneuver> for ManeuverRecord {
        fn from(maneuver: &Maneuver) -> Self {
            Self {
                time_s: maneuver.time,
                frame: match maneuver.frame {
                    BurnFrame::Orbital => "orbital",
                    BurnFrame::Inertial => "inertial",
                },
                delta_v_km_s: maneuver.delta_v,
                magnitude_km_s: maneuver.magnitude(),
            }
        }
    }

    /// Elements in file-friendly units. Non-finite values serialize as `null`.
    #[derive(Debug, Clone, Serialize)]
    pub struct OrbitRecord {
        pub semi_major_axis_km: f64,
        pub eccentricity: f64,
        pub inclination_deg: f64,
        pub lan_deg: f64,
        pub arg_periapsis_deg: f64,
        pub mean_anomaly_deg: f64,
        pub epoch_s: f64,
        pub periapsis_km: f64,
        pub apoapsis_km: Option<f64>,
        pub period_s: Option<f64>,
    }

    impl From<&Orbit> for OrbitRecord {
        fn from(orbit: &Orbit) -> Self {
            Self {
                semi_major_axis_km: orbit.semi_major_axis,
                eccentricity: orbit.eccentricity,
                inclination_deg: to_degree(orbit.inclination),
                lan_deg: to_degree(orbit.lan),
                arg_periapsis_deg: to_degree(orbit.w),
                mean_anomaly_deg: to_degree(orbit.m0),
                epoch_s: orbit.epoch,
                periapsis_km: orbit.periapsis(),
                apoapsis_km: orbit.is_elliptic().then(|| orbit.apoapsis()),
                period_s: orbit.is_elliptic().then(|| orbit.period()),
            }
        }
    }

    /// A planned command: its burns and the orbits before and after them.
    #[derive(Debug, Clone, Serialize)]
    pub struct PlanRecord {
        pub ship: String,
        pub command: String,
        pub total_delta_v_km_s: f64,
        pub initial_orbit: OrbitRecord,
        pub maneuvers: Vec<ManeuverRecord>,
        pub final_orbit: OrbitRecord,
    }

    impl PlanRecord {
        /// Apply `maneuvers` in order to `initial` and record the outcome.
        pub fn build(
            ship: &str,
            command: &str,
            initial: &Orbit,
            maneuvers: &[Maneuver],
        ) -> Result<Self, ExportError> {
            let mut orbit = *initial;
            for maneuver in maneuvers {
                orbit = maneuver.apply(&orbit)?;
            }
            Ok(Self {
                ship: ship.to_string(),
                command: command.to_string(),
                total_delta_v_km_s: maneuvers.iter().map(Maneuver::magnitude).sum(),
                initial_orbit: initial.into(),
                maneuvers: maneuvers.iter().map(ManeuverRecord::from).collect(),
                final_orbit: (&orbit).into(),
            })
        }
    }

    pub fn write_json<W: Write>(writer: W, plan: &PlanRecord) -> Result<(), ExportError> {
        serde_json::to_writer_pretty(writer, plan)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellar_core::constants::{EARTH_MU_KM3_S2, PI};
    use stellar_orbits::Orbit;

    #[test]
    fn elliptic_line_closes_on_itself() {
        let orbit = Orbit::new(10_000.0, 0.3, 0.2, 0.1, 0.4, 0.0, EARTH_MU_KM3_S2).unwrap();
        let points = orbit_line::sample(&orbit, orbit_line::ORBIT_RESOLUTION, f64::INFINITY).unwrap();
        assert_eq!(points.len(), orbit_line::ORBIT_RESOLUTION + 1);
        let first = points.first().unwrap();
        let last = points.last().unwrap();
        assert!((first.x_km - last.x_km).abs() < 1e-6);
        assert!((first.radius_km - orbit.periapsis()).abs() < 1e-6);
    }

    #[test]
    fn line_is_clipped_to_soi_and_asymptotes() {
        let escape = Orbit::new(-20_000.0, 1.5, 0.0, 0.0, 0.0, 0.0, EARTH_MU_KM3_S2).unwrap();
        let limit = escape.asymptote_anomaly().unwrap();
        let points = orbit_line::sample(&escape, 100, 200_000.0).unwrap();
        assert!(!points.is_empty() && points.len() < 99);
        assert!(points.iter().all(|p| p.true_anomaly_rad.abs() < limit));
        assert!(points.iter().all(|p| p.radius_km < 200_000.0));

        let eccentric = Orbit::new(20_000.0, 0.5, 0.0, 0.0, 0.0, 0.0, EARTH_MU_KM3_S2).unwrap();
        let points = orbit_line::sample(&eccentric, 360, 20_000.0).unwrap();
        assert!(points.iter().all(|p| (p.true_anomaly_rad - PI).abs() > 0.5));
    }

    #[test]
    fn csv_has_header_and_one_row_per_point() {
        let orbit = Orbit::circular(7_000.0, EARTH_MU_KM3_S2).unwrap();
        let points = orbit_line::sample(&orbit, 4, f64::INFINITY).unwrap();
        let mut buffer = Vec::new();
        orbit_line::write_csv(&mut buffer, &points).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("true_anomaly_rad,x_km,y_km,z_km,radius_km"));
        assert_eq!(lines.count(), 5);
    }

    #[test]
    fn plan_record_tracks_the_resulting_orbit() {
        let leo = Orbit::circular(7_000.0, EARTH_MU_KM3_S2).unwrap();
        let burns = stellar_impulsive::hohmann_transfer(&leo, 42_164.0, 0.0).unwrap().to_vec();
        let plan = plan::PlanRecord::build("Scout", "hohmann", &leo, &burns).unwrap();
        assert!((plan.final_orbit.semi_major_axis_km - 42_164.0).abs() < 1e-3);
        assert_eq!(plan.maneuvers.len(), 2);
        assert_eq!(plan.maneuvers[0].frame, "orbital");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/plan.json");
        let writer = writer_for_path(&path).unwrap();
        plan::write_json(writer, &plan).unwrap();
        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["ship"], "Scout");
        assert_eq!(json["maneuvers"].as_array().unwrap().len(), 2);
    }
}
