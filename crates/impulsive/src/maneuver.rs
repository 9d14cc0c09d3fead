//! Single-burn maneuver planners.
//!
//! Every planner is a pure function of an orbit and the current clock. Delta-v is expressed in
//! the local frame at the burn point (x radial-out, y prograde, z normal) unless the returned
//! [`BurnFrame`] says otherwise, and `time` is absolute.

use stellar_core::constants::{DEGENERATE_EPSILON, PI, TWO_PI};
use stellar_core::units::normalize_radian;
use stellar_core::vector::{self, Vector3};
use stellar_orbits::{
    Orbit, OrbitError, circular_velocity, flight_path_angle, velocity_at_radius,
};
use thiserror::Error;

use crate::transfers::CIRCULAR_EPSILON;

/// Planning failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ManeuverError {
    #[error(transparent)]
    Orbit(#[from] OrbitError),
    #[error("maneuver requires an elliptic orbit (e = {0})")]
    NotElliptic(f64),
    #[error("maneuver requires a circular orbit (e = {0})")]
    NotCircular(f64),
    #[error("target radius must be positive and finite (got {0})")]
    InvalidRadius(f64),
    #[error("orbits do not share a reference body")]
    ReferenceMismatch,
    #[error("orbits share the same mean motion; phasing never changes")]
    NoRelativeMotion,
    #[error("arrival time {arrive} is not after departure time {depart}")]
    InvalidTimeOfFlight { depart: f64, arrive: f64 },
    #[error("lambert solver failed: {0}")]
    Lambert(String),
}

/// Frame a maneuver's delta-v is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurnFrame {
    /// Local frame at the burn point: radial-out, prograde, normal.
    Orbital,
    /// The reference body's inertial frame.
    Inertial,
}

/// An impulsive burn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Maneuver {
    pub delta_v: Vector3,
    /// Absolute execution time in seconds.
    pub time: f64,
    pub frame: BurnFrame,
}

impl Maneuver {
    pub fn orbital(delta_v: Vector3, time: f64) -> Self {
        Self {
            delta_v,
            time,
            frame: BurnFrame::Orbital,
        }
    }

    pub fn inertial(delta_v: Vector3, time: f64) -> Self {
        Self {
            delta_v,
            time,
            frame: BurnFrame::Inertial,
        }
    }

    /// Magnitude of the burn in km/s.
    pub fn magnitude(&self) -> f64 {
        vector::norm(&self.delta_v)
    }

    pub fn is_zero(&self) -> bool {
        self.delta_v == vector::ZERO
    }

    /// The same burn moved by `offset` seconds.
    pub fn delayed(mut self, offset: f64) -> Self {
        self.time += offset;
        self
    }

    /// Orbit that results from executing this burn on `orbit` at `self.time`.
    pub fn apply(&self, orbit: &Orbit) -> Result<Orbit, OrbitError> {
        match self.frame {
            BurnFrame::Orbital => orbit.apply_impulse(&self.delta_v, self.time),
            BurnFrame::Inertial => orbit.apply_inertial_impulse(&self.delta_v, self.time),
        }
    }
}

pub(crate) fn require_elliptic(orbit: &Orbit) -> Result<(), ManeuverError> {
    orbit.validate()?;
    if !orbit.is_elliptic() {
        return Err(ManeuverError::NotElliptic(orbit.eccentricity));
    }
    Ok(())
}

pub(crate) fn require_radius(radius: f64) -> Result<(), ManeuverError> {
    if radius > 0.0 && radius.is_finite() {
        Ok(())
    } else {
        Err(ManeuverError::InvalidRadius(radius))
    }
}

fn prograde_burn_at(orbit: &Orbit, v: f64, dv: f64, now: f64) -> Result<Maneuver, ManeuverError> {
    let time = now + orbit.time_to_true_anomaly(v, now)?;
    Ok(Maneuver::orbital([0.0, dv, 0.0], time))
}

/// Prograde burn at apoapsis that makes the orbit circular at the apoapsis radius.
pub fn circularize_at_apoapsis(orbit: &Orbit, now: f64) -> Result<Maneuver, ManeuverError> {
    require_elliptic(orbit)?;
    let radius = orbit.apoapsis();
    let dv = circular_velocity(orbit.gm, radius)
        - velocity_at_radius(orbit.gm, orbit.semi_major_axis, radius);
    prograde_burn_at(orbit, PI, dv, now)
}

/// Retrograde burn at periapsis that makes the orbit circular at the periapsis radius.
pub fn circularize_at_periapsis(orbit: &Orbit, now: f64) -> Result<Maneuver, ManeuverError> {
    require_elliptic(orbit)?;
    let radius = orbit.periapsis();
    let dv = circular_velocity(orbit.gm, radius)
        - velocity_at_radius(orbit.gm, orbit.semi_major_axis, radius);
    prograde_burn_at(orbit, 0.0, dv, now)
}

/// Burn at periapsis that moves the opposite apsis to `radius`.
pub fn set_apoapsis(orbit: &Orbit, radius: f64, now: f64) -> Result<Maneuver, ManeuverError> {
    require_elliptic(orbit)?;
    require_radius(radius)?;
    let periapsis = orbit.periapsis();
    let new_sma = (periapsis + radius) / 2.0;
    let dv = velocity_at_radius(orbit.gm, new_sma, periapsis)
        - velocity_at_radius(orbit.gm, orbit.semi_major_axis, periapsis);
    prograde_burn_at(orbit, 0.0, dv, now)
}

/// Burn at apoapsis that moves the opposite apsis to `radius`.
pub fn set_periapsis(orbit: &Orbit, radius: f64, now: f64) -> Result<Maneuver, ManeuverError> {
    require_elliptic(orbit)?;
    require_radius(radius)?;
    let apoapsis = orbit.apoapsis();
    let new_sma = (apoapsis + radius) / 2.0;
    let dv = velocity_at_radius(orbit.gm, new_sma, apoapsis)
        - velocity_at_radius(orbit.gm, orbit.semi_major_axis, apoapsis);
    prograde_burn_at(orbit, PI, dv, now)
}

fn check_inclination(target: f64) -> Result<(), ManeuverError> {
    if (0.0..=PI).contains(&target) {
        Ok(())
    } else {
        Err(OrbitError::InvalidInclination(target).into())
    }
}

/// Transverse velocity component at anomaly `v`, the part a plane change rotates.
fn transverse_speed(orbit: &Orbit, v: f64) -> Result<f64, ManeuverError> {
    let speed = orbit.speed_at(v)?;
    Ok(speed * flight_path_angle(orbit.eccentricity, v).cos())
}

/// Rotation of a transverse velocity `speed` by `d_inc` about the radial axis.
fn plane_change(speed: f64, d_inc: f64) -> Vector3 {
    [0.0, speed * (d_inc.cos() - 1.0), speed * d_inc.sin()]
}

/// Plane change to `target` inclination at whichever node is cheaper.
///
/// The descending node (`π - ω`) wins ties.
pub fn set_inclination(orbit: &Orbit, target: f64, now: f64) -> Result<Maneuver, ManeuverError> {
    require_elliptic(orbit)?;
    check_inclination(target)?;

    let descending = normalize_radian(PI - orbit.w);
    let ascending = normalize_radian(TWO_PI - orbit.w);
    let change = target - orbit.inclination;
    let cost = |v: f64| -> Result<f64, ManeuverError> {
        Ok((2.0 * transverse_speed(orbit, v)? * (change / 2.0).sin()).abs())
    };

    // rotating about the radial axis tilts the normal the opposite way at the two nodes
    let (node, d_inc) = if cost(descending)? > cost(ascending)? {
        (ascending, change)
    } else {
        (descending, -change)
    };

    let speed = transverse_speed(orbit, node)?;
    let time = now + orbit.time_to_true_anomaly(node, now)?;
    Ok(Maneuver::orbital(plane_change(speed, d_inc), time))
}

/// Plane change for circular orbits using circular speed.
///
/// The node is picked from the current position: if the body is already past the descending
/// node (`π - ω`) the burn waits for the ascending node (`2π - ω`). Orbits with
/// `e > CIRCULAR_EPSILON` are rejected with [`ManeuverError::NotCircular`].
pub fn set_circular_inclination(
    orbit: &Orbit,
    target: f64,
    now: f64,
) -> Result<Maneuver, ManeuverError> {
    require_elliptic(orbit)?;
    if orbit.eccentricity > CIRCULAR_EPSILON {
        return Err(ManeuverError::NotCircular(orbit.eccentricity));
    }
    check_inclination(target)?;

    let change = target - orbit.inclination;
    let descending = normalize_radian(PI - orbit.w);
    let (node, d_inc) = if orbit.true_anomaly_at(now) > descending {
        (normalize_radian(TWO_PI - orbit.w), change)
    } else {
        (descending, -change)
    };
    let speed = circular_velocity(orbit.gm, orbit.semi_major_axis);
    let time = now + orbit.time_to_true_anomaly(node, now)?;
    Ok(Maneuver::orbital(plane_change(speed, d_inc), time))
}

/// Rotate the orbit plane onto `target`'s plane at the node line `n₁ × n₂`.
///
/// The delta-v is returned in the reference body's inertial frame ([`BurnFrame::Inertial`]).
/// It is not converted to the ship's radial/prograde/normal burn frame; callers executing it
/// through [`Maneuver::apply`] get the inertial impulse. Coplanar orbits produce a zero burn at
/// `now`.
pub fn match_planes(orbit: &Orbit, target: &Orbit, now: f64) -> Result<Maneuver, ManeuverError> {
    require_elliptic(orbit)?;
    target.validate()?;

    let Some(v) = orbit.relative_node_anomaly(target) else {
        return Ok(Maneuver::inertial(vector::ZERO, now));
    };

    let state = orbit.to_cartesian(v)?;
    let radial = vector::normalize(&state.position)
        .ok_or(OrbitError::DegenerateState("position coincides with the focus"))?;
    let Some(direction) = vector::normalize(&vector::cross(&target.normal(), &radial)) else {
        return Ok(Maneuver::inertial(vector::ZERO, now));
    };
    let speed = vector::norm(&state.velocity);
    let delta_v = vector::sub(&vector::scale(&direction, speed), &state.velocity);
    let time = now + orbit.time_to_true_anomaly(v, now)?;
    Ok(Maneuver::inertial(delta_v, time))
}

/// True when the two orbit planes coincide within the degeneracy threshold.
pub fn coplanar(a: &Orbit, b: &Orbit) -> bool {
    vector::norm(&vector::cross(&a.normal(), &b.normal())) < DEGENERATE_EPSILON
}
