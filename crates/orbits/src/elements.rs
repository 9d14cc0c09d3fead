//! The `Orbit` value type: classical elements plus time-derived queries.

use stellar_core::constants::{DEGENERATE_EPSILON, PI, TWO_PI};
use stellar_core::units::{angle_difference, normalize_radian};
use stellar_core::vector::{self, Vector3};
use thiserror::Error;

use crate::kepler::{
    self, KeplerSettings, solve_kepler_elliptic, solve_kepler_hyperbolic, true_from_eccentric,
    true_from_hyperbolic,
};
use crate::state::{StateVector, perifocal_to_inertial};

/// Eccentricities this close to 1 are treated as parabolic and rejected.
pub const PARABOLIC_EPSILON: f64 = 1.0e-9;

/// Generational handle to a body stored in an external arena.
///
/// The orbit model only carries it around; it never dereferences it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId {
    pub index: u32,
    pub generation: u32,
}

/// Validation and evaluation failures of the orbit model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrbitError {
    #[error("gravitational parameter must be positive and finite (got {0})")]
    InvalidGravitationalParameter(f64),
    #[error("eccentricity must be finite and non-negative (got {0})")]
    InvalidEccentricity(f64),
    #[error("parabolic orbits (e = 1) are not supported")]
    Parabolic,
    #[error("semi-major axis {semi_major_axis} is inconsistent with eccentricity {eccentricity}")]
    SemiMajorAxisMismatch {
        semi_major_axis: f64,
        eccentricity: f64,
    },
    #[error("inclination {0} rad lies outside [0, π]")]
    InvalidInclination(f64),
    #[error("{0} is not finite")]
    NonFinite(&'static str),
    #[error("true anomaly {anomaly} lies beyond the hyperbolic asymptote ±{limit}")]
    BeyondAsymptote { anomaly: f64, limit: f64 },
    #[error("vis-viva speed undefined at radius {radius} for semi-major axis {semi_major_axis}")]
    NegativeVisViva { radius: f64, semi_major_axis: f64 },
    #[error("true anomaly {0} has already been passed on this hyperbolic trajectory")]
    AnomalyUnreachable(f64),
    #[error("degenerate state vector: {0}")]
    DegenerateState(&'static str),
}

/// Two-body Keplerian orbit.
///
/// Angles are radians, lengths kilometres, times seconds. `semi_major_axis` is negative for
/// hyperbolic orbits. True and eccentric anomalies are never stored: they are derived from
/// `m0`, `epoch` and the caller's clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orbit {
    pub semi_major_axis: f64,
    pub eccentricity: f64,
    pub inclination: f64,
    /// Longitude of the ascending node.
    pub lan: f64,
    /// Argument of periapsis.
    pub w: f64,
    /// Mean anomaly at `epoch`.
    pub m0: f64,
    pub epoch: f64,
    /// Gravitational parameter of the reference body (km³/s²).
    pub gm: f64,
    pub reference_body: Option<BodyId>,
}

impl Orbit {
    /// Build and validate an orbit with epoch zero and no reference body.
    pub fn new(
        semi_major_axis: f64,
        eccentricity: f64,
        inclination: f64,
        lan: f64,
        w: f64,
        m0: f64,
        gm: f64,
    ) -> Result<Self, OrbitError> {
        let orbit = Self {
            semi_major_axis,
            eccentricity,
            inclination,
            lan: normalize_radian(lan),
            w: normalize_radian(w),
            m0,
            epoch: 0.0,
            gm,
            reference_body: None,
        };
        orbit.validate()?;
        Ok(orbit)
    }

    /// Circular, equatorial orbit of radius `radius`.
    pub fn circular(radius: f64, gm: f64) -> Result<Self, OrbitError> {
        Self::new(radius, 0.0, 0.0, 0.0, 0.0, 0.0, gm)
    }

    pub fn with_epoch(mut self, epoch: f64) -> Self {
        self.epoch = epoch;
        self
    }

    pub fn with_reference_body(mut self, body: BodyId) -> Self {
        self.reference_body = Some(body);
        self
    }

    /// Check the element invariants; fails fast instead of letting NaNs through.
    pub fn validate(&self) -> Result<(), OrbitError> {
        if !(self.gm > 0.0 && self.gm.is_finite()) {
            return Err(OrbitError::InvalidGravitationalParameter(self.gm));
        }
        let e = self.eccentricity;
        if !(e >= 0.0 && e.is_finite()) {
            return Err(OrbitError::InvalidEccentricity(e));
        }
        if (e - 1.0).abs() < PARABOLIC_EPSILON {
            return Err(OrbitError::Parabolic);
        }
        let a = self.semi_major_axis;
        let consistent = if e < 1.0 { a > 0.0 } else { a < 0.0 };
        if !a.is_finite() || !consistent {
            return Err(OrbitError::SemiMajorAxisMismatch {
                semi_major_axis: a,
                eccentricity: e,
            });
        }
        if !(0.0..=PI).contains(&self.inclination) {
            return Err(OrbitError::InvalidInclination(self.inclination));
        }
        for (name, value) in [
            ("longitude of the ascending node", self.lan),
            ("argument of periapsis", self.w),
            ("mean anomaly at epoch", self.m0),
            ("epoch", self.epoch),
        ] {
            if !value.is_finite() {
                return Err(OrbitError::NonFinite(name));
            }
        }
        Ok(())
    }

    pub fn is_elliptic(&self) -> bool {
        self.eccentricity < 1.0
    }

    pub fn is_hyperbolic(&self) -> bool {
        self.eccentricity > 1.0
    }

    pub fn is_circular(&self) -> bool {
        self.eccentricity < DEGENERATE_EPSILON
    }

    pub fn is_equatorial(&self) -> bool {
        self.inclination < DEGENERATE_EPSILON || PI - self.inclination < DEGENERATE_EPSILON
    }

    /// `a(1 + e)`; negative (meaningless) for hyperbolic orbits.
    pub fn apoapsis(&self) -> f64 {
        self.semi_major_axis * (1.0 + self.eccentricity)
    }

    /// `a(1 - e)`.
    pub fn periapsis(&self) -> f64 {
        self.semi_major_axis * (1.0 - self.eccentricity)
    }

    pub fn semi_latus_rectum(&self) -> f64 {
        self.semi_major_axis * (1.0 - self.eccentricity * self.eccentricity)
    }

    /// Mean motion `sqrt(GM / |a|³)` in rad/s.
    pub fn mean_motion(&self) -> f64 {
        (self.gm / self.semi_major_axis.abs().powi(3)).sqrt()
    }

    /// Orbital period in seconds; infinite for hyperbolic trajectories.
    pub fn period(&self) -> f64 {
        if self.is_elliptic() {
            TWO_PI / self.mean_motion()
        } else {
            f64::INFINITY
        }
    }

    /// Asymptotic true anomaly `acos(-1/e)` of a hyperbola.
    pub fn asymptote_anomaly(&self) -> Option<f64> {
        self.is_hyperbolic()
            .then(|| (-1.0 / self.eccentricity).acos())
    }

    /// Reject anomalies a hyperbolic trajectory never reaches.
    pub fn check_anomaly(&self, v: f64) -> Result<(), OrbitError> {
        if !v.is_finite() {
            return Err(OrbitError::NonFinite("true anomaly"));
        }
        if let Some(limit) = self.asymptote_anomaly() {
            let anomaly = angle_difference(v, 0.0);
            if anomaly.abs() >= limit {
                return Err(OrbitError::BeyondAsymptote { anomaly, limit });
            }
        }
        Ok(())
    }

    /// Distance from the focus at true anomaly `v`: `a(1 - e²) / (1 + e cos v)`.
    pub fn orbiting_radius(&self, v: f64) -> f64 {
        self.semi_latus_rectum() / (1.0 + self.eccentricity * v.cos())
    }

    /// Position in the reference frame at true anomaly `v`.
    pub fn position_at(&self, v: f64) -> Result<Vector3, OrbitError> {
        self.check_anomaly(v)?;
        let r = self.orbiting_radius(v);
        Ok(perifocal_to_inertial(
            self.lan,
            self.inclination,
            self.w,
            &[r * v.cos(), r * v.sin(), 0.0],
        ))
    }

    /// Vis-viva speed `sqrt(GM (2/r - 1/a))` at true anomaly `v`.
    pub fn speed_at(&self, v: f64) -> Result<f64, OrbitError> {
        self.check_anomaly(v)?;
        let radius = self.orbiting_radius(v);
        let radicand = self.gm * (2.0 / radius - 1.0 / self.semi_major_axis);
        if radicand < 0.0 || !radicand.is_finite() {
            return Err(OrbitError::NegativeVisViva {
                radius,
                semi_major_axis: self.semi_major_axis,
            });
        }
        Ok(radicand.sqrt())
    }

    /// Velocity in the reference frame at true anomaly `v`.
    ///
    /// The vis-viva speed is split into radial and transverse parts by the flight-path angle
    /// and rotated out of the local frame.
    pub fn velocity_at(&self, v: f64) -> Result<Vector3, OrbitError> {
        let speed = self.speed_at(v)?;
        let gamma = flight_path_angle(self.eccentricity, v);
        let local = [speed * gamma.sin(), speed * gamma.cos(), 0.0];
        Ok(self.local_to_inertial(v, &local))
    }

    /// Position and velocity at true anomaly `v`.
    pub fn to_cartesian(&self, v: f64) -> Result<StateVector, OrbitError> {
        Ok(StateVector {
            position: self.position_at(v)?,
            velocity: self.velocity_at(v)?,
        })
    }

    /// Rotate a `(radial, transverse, normal)` vector at anomaly `v` into the reference frame.
    pub fn local_to_inertial(&self, v: f64, local: &Vector3) -> Vector3 {
        perifocal_to_inertial(self.lan, self.inclination, self.w + v, local)
    }

    /// Unit vector from the focus towards anomaly `v`.
    pub fn radial_direction(&self, v: f64) -> Vector3 {
        self.local_to_inertial(v, &[1.0, 0.0, 0.0])
    }

    /// Unit normal of the orbital plane (direction of the angular momentum).
    pub fn normal(&self) -> Vector3 {
        perifocal_to_inertial(self.lan, self.inclination, self.w, &vector::UNIT_Z)
    }

    /// Mean anomaly at time `t`; wrapped into `[0, 2π)` for ellipses.
    pub fn mean_anomaly_at(&self, t: f64) -> f64 {
        let m = self.m0 + (t - self.epoch) * self.mean_motion();
        if self.is_elliptic() {
            normalize_radian(m)
        } else {
            m
        }
    }

    /// Eccentric (elliptic) or hyperbolic anomaly at time `t`.
    pub fn eccentric_anomaly_at(&self, t: f64) -> f64 {
        self.eccentric_anomaly_at_with(t, &KeplerSettings::default())
    }

    pub fn eccentric_anomaly_at_with(&self, t: f64, settings: &KeplerSettings) -> f64 {
        let m = self.mean_anomaly_at(t);
        if self.is_elliptic() {
            solve_kepler_elliptic(m, self.eccentricity, settings).anomaly
        } else {
            solve_kepler_hyperbolic(m, self.eccentricity, settings).anomaly
        }
    }

    /// True anomaly at time `t`: `[0, 2π)` for ellipses, inside the asymptotes for hyperbolas.
    pub fn true_anomaly_at(&self, t: f64) -> f64 {
        self.true_anomaly_at_with(t, &KeplerSettings::default())
    }

    pub fn true_anomaly_at_with(&self, t: f64, settings: &KeplerSettings) -> f64 {
        let anomaly = self.eccentric_anomaly_at_with(t, settings);
        if self.is_elliptic() {
            normalize_radian(true_from_eccentric(self.eccentricity, anomaly))
        } else {
            true_from_hyperbolic(self.eccentricity, anomaly)
        }
    }

    /// Position and velocity at time `t`.
    pub fn state_at(&self, t: f64) -> Result<StateVector, OrbitError> {
        self.to_cartesian(self.true_anomaly_at(t))
    }

    /// Seconds from `now` until the body next reaches true anomaly `target`.
    ///
    /// On an ellipse a target that is behind the current position is reached after
    /// wrapping through one period.
    pub fn time_to_true_anomaly(&self, target: f64, now: f64) -> Result<f64, OrbitError> {
        self.check_anomaly(target)?;
        let n = self.mean_motion();
        let current = self.mean_anomaly_at(now);
        if self.is_elliptic() {
            let goal = normalize_radian(kepler::mean_from_true(self.eccentricity, target));
            let mut dt = (goal - current) / n;
            if dt < 0.0 {
                dt += self.period();
            }
            Ok(dt)
        } else {
            let goal = kepler::mean_from_true(self.eccentricity, angle_difference(target, 0.0));
            let dt = (goal - current) / n;
            if dt < 0.0 {
                return Err(OrbitError::AnomalyUnreachable(target));
            }
            Ok(dt)
        }
    }
}

/// Flight-path angle `atan2(e sin v, 1 + e cos v)` between the velocity and the local horizon.
pub fn flight_path_angle(eccentricity: f64, v: f64) -> f64 {
    (eccentricity * v.sin()).atan2(1.0 + eccentricity * v.cos())
}

/// Speed of a circular orbit of the given radius.
pub fn circular_velocity(gm: f64, radius: f64) -> f64 {
    (gm / radius).sqrt()
}

/// Vis-viva speed at radius `r` on an orbit with semi-major axis `a`.
pub fn velocity_at_radius(gm: f64, a: f64, r: f64) -> f64 {
    (gm * (2.0 / r - 1.0 / a)).sqrt()
}
