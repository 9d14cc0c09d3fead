//! Two-burn transfers between coplanar orbits.
//!
//! `hohmann_delta_v` is the closed-form estimate in the circular, coplanar limit; the planners
//! below turn it into timed maneuvers for a concrete orbit.

use stellar_core::constants::{PI, TWO_PI};
use stellar_core::units::normalize_radian;
use stellar_core::vector;
use stellar_orbits::{Orbit, circular_velocity, velocity_at_radius};
use tracing::debug;

use crate::maneuver::{Maneuver, ManeuverError, require_elliptic, require_radius};

/// Orbits more eccentric than this are not treated as circular by the Hohmann planner.
pub const CIRCULAR_EPSILON: f64 = 1.0e-5;

/// Result for a Hohmann transfer between circular, coplanar orbits of radii r1 and r2.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HohmannResult {
    pub dv1_km_s: f64,      // signed: negative for inward (retro) burn
    pub dv2_km_s: f64,      // signed: negative for retro capture when arriving inward
    pub dv_total_km_s: f64, // |dv1| + |dv2|
    pub tof_seconds: f64,
}

/// Closed-form Hohmann transfer between two circular coplanar orbits.
pub fn hohmann_delta_v(r1_km: f64, r2_km: f64, mu_km3_s2: f64) -> Result<HohmannResult, ManeuverError> {
    require_radius(r1_km)?;
    require_radius(r2_km)?;
    if !(mu_km3_s2 > 0.0 && mu_km3_s2.is_finite()) {
        return Err(stellar_orbits::OrbitError::InvalidGravitationalParameter(mu_km3_s2).into());
    }

    let a_t = 0.5 * (r1_km + r2_km);
    let tof = PI * (a_t.powi(3) / mu_km3_s2).sqrt();

    let dv1 = velocity_at_radius(mu_km3_s2, a_t, r1_km) - circular_velocity(mu_km3_s2, r1_km);
    let dv2 = circular_velocity(mu_km3_s2, r2_km) - velocity_at_radius(mu_km3_s2, a_t, r2_km);

    Ok(HohmannResult {
        dv1_km_s: dv1,
        dv2_km_s: dv2,
        dv_total_km_s: dv1.abs() + dv2.abs(),
        tof_seconds: tof,
    })
}

/// Departure and arrival burns of a two-impulse transfer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferPair {
    pub departure: Maneuver,
    pub arrival: Maneuver,
}

impl TransferPair {
    pub fn total_delta_v(&self) -> f64 {
        self.departure.magnitude() + self.arrival.magnitude()
    }

    pub fn time_of_flight(&self) -> f64 {
        self.arrival.time - self.departure.time
    }

    pub fn to_vec(&self) -> Vec<Maneuver> {
        vec![self.departure, self.arrival]
    }
}

/// Hohmann transfer from a circular orbit to a circular orbit of `radius`, departing at `now`.
pub fn hohmann_transfer(orbit: &Orbit, radius: f64, now: f64) -> Result<TransferPair, ManeuverError> {
    require_elliptic(orbit)?;
    if orbit.eccentricity > CIRCULAR_EPSILON {
        return Err(ManeuverError::NotCircular(orbit.eccentricity));
    }
    let estimate = hohmann_delta_v(orbit.semi_major_axis, radius, orbit.gm)?;
    Ok(TransferPair {
        departure: Maneuver::orbital([0.0, estimate.dv1_km_s, 0.0], now),
        arrival: Maneuver::orbital([0.0, estimate.dv2_km_s, 0.0], now + estimate.tof_seconds),
    })
}

/// Angle the target must lead the chaser by at departure for a Hohmann intercept.
pub fn transfer_angle(start: &Orbit, target: &Orbit) -> f64 {
    let a_t = (start.semi_major_axis + target.semi_major_axis) / 2.0;
    let t_transfer = PI * (a_t.powi(3) / start.gm).sqrt();
    PI - t_transfer * target.mean_motion()
}

/// Angle from the chaser to the target at time `t`, measured in the chaser's direction of motion.
pub fn phase_angle(start: &Orbit, target: &Orbit, t: f64) -> Result<f64, ManeuverError> {
    let chaser = start.state_at(t)?.position;
    let quarry = target.state_at(t)?.position;
    let normal = start.normal();
    let angle = vector::dot(&vector::cross(&chaser, &quarry), &normal).atan2(vector::dot(&chaser, &quarry));
    Ok(normalize_radian(angle))
}

/// Wait for the right phase angle, then Hohmann-transfer onto the target's radius.
pub fn coplanar_intercept(start: &Orbit, target: &Orbit, now: f64) -> Result<TransferPair, ManeuverError> {
    require_elliptic(start)?;
    require_elliptic(target)?;
    if start.reference_body != target.reference_body {
        return Err(ManeuverError::ReferenceMismatch);
    }

    let current = phase_angle(start, target, now)?;
    let required = transfer_angle(start, target);
    // the phase angle drifts at n_target - n_start
    let drift = target.mean_motion() - start.mean_motion();
    if drift.abs() < f64::EPSILON * start.mean_motion() {
        return Err(ManeuverError::NoRelativeMotion);
    }
    let wait = if drift < 0.0 {
        normalize_radian(current - required) / -drift
    } else {
        normalize_radian(required - current) / drift
    };
    let synodic = TWO_PI / drift.abs();
    debug!(current, required, wait, synodic, "coplanar intercept phasing");

    hohmann_transfer(start, target.semi_major_axis, now + wait)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellar_core::constants::{AU_KM, EARTH_MU_KM3_S2, SUN_MU_KM3_S2};
    use stellar_core::units::angle_difference;

    #[test]
    fn hohmann_symmetry_and_time_match() {
        let r1 = 1.0 * AU_KM;
        let r2 = 1.524 * AU_KM;
        let h12 = hohmann_delta_v(r1, r2, SUN_MU_KM3_S2).unwrap();
        let h21 = hohmann_delta_v(r2, r1, SUN_MU_KM3_S2).unwrap();

        assert!((h12.dv_total_km_s - h21.dv_total_km_s).abs() < 1e-9);
        assert!((h12.tof_seconds - h21.tof_seconds).abs() < 1e-6);
        assert!(h12.dv1_km_s > 0.0);
        assert!(h21.dv1_km_s < 0.0);
    }

    #[test]
    fn hohmann_earth_mars_reasonable_numbers() {
        let h = hohmann_delta_v(AU_KM, 1.523679 * AU_KM, SUN_MU_KM3_S2).unwrap();
        assert!((h.dv_total_km_s - 5.6).abs() < 0.7, "dv_total = {}", h.dv_total_km_s);
        let days = h.tof_seconds / 86_400.0;
        assert!((200.0..=350.0).contains(&days), "tof_days = {}", days);
    }

    #[test]
    fn hohmann_transfer_requires_circular_start() {
        let orbit = Orbit::new(7_000.0, 0.1, 0.0, 0.0, 0.0, 0.0, EARTH_MU_KM3_S2).unwrap();
        assert_eq!(
            hohmann_transfer(&orbit, 9_000.0, 0.0),
            Err(ManeuverError::NotCircular(0.1))
        );
    }

    #[test]
    fn hohmann_transfer_reaches_target_radius() {
        let orbit = Orbit::circular(7_000.0, EARTH_MU_KM3_S2).unwrap();
        let pair = hohmann_transfer(&orbit, 42_164.0, 100.0).unwrap();
        assert_eq!(pair.departure.time, 100.0);

        let transfer = pair.departure.apply(&orbit).unwrap();
        assert!((transfer.apoapsis() - 42_164.0).abs() < 1e-5);
        assert!((pair.time_of_flight() - transfer.period() / 2.0).abs() < 1e-6);

        let final_orbit = pair.arrival.apply(&transfer).unwrap();
        assert!(final_orbit.eccentricity < 1e-8, "e = {}", final_orbit.eccentricity);
        assert!((final_orbit.semi_major_axis - 42_164.0).abs() < 1e-4);
    }

    #[test]
    fn coplanar_intercept_arrives_next_to_target() {
        let start = Orbit::circular(7_000.0, EARTH_MU_KM3_S2).unwrap();
        let target = Orbit::new(12_000.0, 0.0, 0.0, 0.0, 0.0, 2.0, EARTH_MU_KM3_S2).unwrap();
        let pair = coplanar_intercept(&start, &target, 0.0).unwrap();
        assert!(pair.departure.time >= 0.0);
        let synodic = TWO_PI / (start.mean_motion() - target.mean_motion());
        assert!(pair.departure.time < synodic);

        let phase = phase_angle(&start, &target, pair.departure.time).unwrap();
        assert!(angle_difference(phase, transfer_angle(&start, &target)).abs() < 1e-6);

        let transfer = pair.departure.apply(&start).unwrap();
        let chaser = transfer.state_at(pair.arrival.time).unwrap().position;
        let quarry = target.state_at(pair.arrival.time).unwrap().position;
        assert!(vector::distance(&chaser, &quarry) < 1.0, "miss = {} km", vector::distance(&chaser, &quarry));
    }

    #[test]
    fn outer_chaser_waits_for_the_target_to_come_around() {
        let start = Orbit::circular(12_000.0, EARTH_MU_KM3_S2).unwrap();
        let target = Orbit::new(7_000.0, 0.0, 0.0, 0.0, 0.0, 1.0, EARTH_MU_KM3_S2).unwrap();
        let pair = coplanar_intercept(&start, &target, 0.0).unwrap();

        let transfer = pair.departure.apply(&start).unwrap();
        let chaser = transfer.state_at(pair.arrival.time).unwrap().position;
        let quarry = target.state_at(pair.arrival.time).unwrap().position;
        assert!(vector::distance(&chaser, &quarry) < 1.0);
    }
}
