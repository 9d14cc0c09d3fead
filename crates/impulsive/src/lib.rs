//! Impulsive maneuver planning: apsis changes, plane changes, Hohmann and Lambert transfers,
//! and the command queue that sequences them.

pub mod commands;
pub mod lambert;
pub mod maneuver;
pub mod transfers;

pub use commands::{Command, CommandQueue, QueuedCommand, Trigger, plan_command, queue_transfer};
pub use lambert::{LambertSolverError, lambert_intercept, solve as lambert_solve};
pub use maneuver::{
    BurnFrame, Maneuver, ManeuverError, circularize_at_apoapsis, circularize_at_periapsis,
    coplanar, match_planes, set_apoapsis, set_circular_inclination, set_inclination,
    set_periapsis,
};
pub use transfers::{
    CIRCULAR_EPSILON, HohmannResult, TransferPair, coplanar_intercept, hohmann_delta_v,
    hohmann_transfer, phase_angle, transfer_angle,
};
