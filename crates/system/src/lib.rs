//! A tree of bodies and vessels that advances on a shared clock, moving vessels between
//! spheres of influence and executing their queued maneuvers.

pub mod arena;
pub mod universe;

pub use arena::Arena;
pub use universe::{Body, Entity, Event, Kinematics, SystemError, Universe};
