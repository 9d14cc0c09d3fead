//! Two-impulse intercepts backed by the `lambert-bate` boundary-value solver.

use lambert_bate::get_velocities;
use stellar_core::vector::{self, Vector3};
use stellar_orbits::Orbit;
use thiserror::Error;

use crate::maneuver::{Maneuver, ManeuverError, require_elliptic};
use crate::transfers::TransferPair;

#[derive(Debug, Error)]
pub enum LambertSolverError {
    #[error("lambert solver failed: {0}")]
    Failure(String),
}

impl From<LambertSolverError> for ManeuverError {
    fn from(err: LambertSolverError) -> Self {
        match err {
            LambertSolverError::Failure(msg) => ManeuverError::Lambert(msg),
        }
    }
}

/// Velocities at `r1` and `r2` of the conic connecting them in `time_of_flight_s`.
pub fn solve(
    r1_km: Vector3,
    r2_km: Vector3,
    time_of_flight_s: f64,
    mu_km3_s2: f64,
    short: bool,
) -> Result<(Vector3, Vector3), LambertSolverError> {
    get_velocities(r1_km, r2_km, time_of_flight_s, mu_km3_s2, short, 1e-8, 500)
        .map_err(|e| LambertSolverError::Failure(format!("{e:?}")))
}

/// Leave `start` at `depart` and meet `target`'s position at `arrive`.
///
/// The transfer runs in `start`'s direction of motion. Both burns are inertial: the departure
/// burn moves onto the transfer conic, the arrival burn matches the target's velocity.
pub fn lambert_intercept(
    start: &Orbit,
    target: &Orbit,
    depart: f64,
    arrive: f64,
) -> Result<TransferPair, ManeuverError> {
    require_elliptic(start)?;
    target.validate()?;
    if start.reference_body != target.reference_body {
        return Err(ManeuverError::ReferenceMismatch);
    }
    if !(arrive > depart) {
        return Err(ManeuverError::InvalidTimeOfFlight { depart, arrive });
    }

    let origin = start.state_at(depart)?;
    let destination = target.state_at(arrive)?;
    let sweep = vector::cross(&origin.position, &destination.position);
    let short = vector::dot(&sweep, &start.normal()) >= 0.0;

    let (v1, v2) = solve(
        origin.position,
        destination.position,
        arrive - depart,
        start.gm,
        short,
    )?;

    Ok(TransferPair {
        departure: Maneuver::inertial(vector::sub(&v1, &origin.velocity), depart),
        arrival: Maneuver::inertial(vector::sub(&destination.velocity, &v2), arrive),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellar_core::constants::{AU_KM, EARTH_MU_KM3_S2, PI, SUN_MU_KM3_S2};

    #[test]
    fn lambert_quarter_orbit_matches_expected_velocity() {
        let r1 = [AU_KM, 0.0, 0.0];
        let r2 = [0.0, AU_KM, 0.0];
        let tof = (PI / 2.0) * (AU_KM.powi(3) / SUN_MU_KM3_S2).sqrt();

        let (v1, v2) = solve(r1, r2, tof, SUN_MU_KM3_S2, true).expect("lambert solve");
        let expected_speed = (SUN_MU_KM3_S2 / AU_KM).sqrt();

        assert!(
            (vector::dot(&v1, &[0.0, 1.0, 0.0]) / vector::norm(&v1)).abs() > 0.99,
            "expected near tangential velocity at departure: {:?}",
            v1
        );
        assert!(
            (vector::dot(&v2, &[-1.0, 0.0, 0.0]) / vector::norm(&v2)).abs() > 0.99,
            "expected near tangential velocity at arrival: {:?}",
            v2
        );
        assert!((vector::norm(&v1) - expected_speed).abs() < 0.5);
        assert!((vector::norm(&v2) - expected_speed).abs() < 0.5);
    }

    #[test]
    fn intercept_meets_the_target() {
        let start = Orbit::circular(7_000.0, EARTH_MU_KM3_S2).unwrap();
        let arrive = 2_000.0;
        let probe = Orbit::circular(8_000.0, EARTH_MU_KM3_S2).unwrap();
        let m0 = PI / 2.0 - probe.mean_motion() * arrive;
        let target = Orbit::new(8_000.0, 0.0, 0.0, 0.0, 0.0, m0, EARTH_MU_KM3_S2).unwrap();

        let pair = lambert_intercept(&start, &target, 0.0, arrive).unwrap();
        assert_eq!(pair.departure.frame, crate::maneuver::BurnFrame::Inertial);
        assert_eq!(pair.time_of_flight(), arrive);

        let transfer = pair.departure.apply(&start).unwrap();
        let chaser = transfer.state_at(arrive).unwrap().position;
        let quarry = target.state_at(arrive).unwrap().position;
        let miss = vector::distance(&chaser, &quarry);
        assert!(miss < 1.0, "miss = {miss} km");

        let matched = pair.arrival.apply(&transfer).unwrap();
        assert!((matched.semi_major_axis - 8_000.0).abs() < 1.0);
        assert!(matched.eccentricity < 1e-3);
    }

    #[test]
    fn intercept_needs_positive_time_of_flight() {
        let start = Orbit::circular(7_000.0, EARTH_MU_KM3_S2).unwrap();
        let target = Orbit::circular(8_000.0, EARTH_MU_KM3_S2).unwrap();
        assert_eq!(
            lambert_intercept(&start, &target, 10.0, 10.0),
            Err(ManeuverError::InvalidTimeOfFlight {
                depart: 10.0,
                arrive: 10.0
            })
        );
    }
}
