//! Patched-conic orbit planning: Keplerian orbits, impulsive maneuvers and a body hierarchy
//! that moves vessels between spheres of influence.
//!
//! The heavy lifting lives in the member crates; this crate re-exports them and wires
//! configuration files into a running [`system::Universe`].

pub use stellar_config as config;
pub use stellar_core as primitives;
pub use stellar_export as export;
pub use stellar_impulsive as impulsive;
pub use stellar_orbits as orbits;
pub use stellar_system as system;

pub mod scenario;

/// Returns the version of the library for smoke tests.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
