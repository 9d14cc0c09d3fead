//! Keplerian orbit model: classical elements, Kepler's equation and state-vector conversion.
//!
//! Orbits are plain values. Position along an orbit is always derived from time through the
//! mean anomaly, so an `Orbit` never needs mutating as the clock advances.

pub mod elements;
pub mod kepler;
pub mod state;

pub use elements::{
    BodyId, Orbit, OrbitError, PARABOLIC_EPSILON, circular_velocity, flight_path_angle,
    velocity_at_radius,
};
pub use kepler::{KeplerSettings, KeplerSolution, solve_kepler_elliptic, solve_kepler_hyperbolic};
pub use state::{StateVector, cartesian_to_orbit, perifocal_to_inertial};

/// Sphere-of-influence radius `a (m / M)^(2/5)` of a body orbiting a much heavier primary.
pub fn sphere_of_influence(semi_major_axis: f64, body_gm: f64, primary_gm: f64) -> f64 {
    semi_major_axis.abs() * (body_gm / primary_gm).powf(0.4)
}
