//! Deferred ship orders: a queue of timed maneuvers plus trigger-gated commands that are turned
//! into maneuvers when their trigger fires.

use std::collections::VecDeque;

use stellar_core::vector::Vector3;
use stellar_orbits::Orbit;
use tracing::debug;

use crate::maneuver::{self, Maneuver, ManeuverError};
use crate::transfers::{self, CIRCULAR_EPSILON};

/// Something a ship can be told to do; planned against its orbit at execution time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    CircularizeAtApoapsis,
    CircularizeAtPeriapsis,
    SetApoapsis(f64),
    SetPeriapsis(f64),
    SetInclination(f64),
    MatchPlanes(Orbit),
    /// Only the departure burn of the intercept.
    CoplanarIntercept(Orbit),
    /// Departure and circularizing arrival burn.
    CoplanarInterceptAndTransfer(Orbit),
    /// Raw orbital-frame impulse executed immediately.
    Impulse(Vector3),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::CircularizeAtApoapsis => "circularize-at-apoapsis",
            Command::CircularizeAtPeriapsis => "circularize-at-periapsis",
            Command::SetApoapsis(_) => "set-apoapsis",
            Command::SetPeriapsis(_) => "set-periapsis",
            Command::SetInclination(_) => "set-inclination",
            Command::MatchPlanes(_) => "match-planes",
            Command::CoplanarIntercept(_) => "coplanar-intercept",
            Command::CoplanarInterceptAndTransfer(_) => "coplanar-intercept-and-transfer",
            Command::Impulse(_) => "impulse",
        }
    }
}

/// When a queued command becomes eligible to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    OnEnterSoi,
    OnExitSoi,
    /// After the previous maneuver has been executed.
    OnManeuver,
    OnCrash,
    Asap,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueuedCommand {
    pub command: Command,
    pub trigger: Trigger,
}

/// Per-ship order book. Both queues are strictly first-in first-out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandQueue {
    maneuvers: VecDeque<Maneuver>,
    commands: VecDeque<QueuedCommand>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_maneuver(&mut self, maneuver: Maneuver) {
        self.maneuvers.push_back(maneuver);
    }

    pub fn push_maneuvers<I: IntoIterator<Item = Maneuver>>(&mut self, maneuvers: I) {
        self.maneuvers.extend(maneuvers);
    }

    pub fn push_command(&mut self, command: Command, trigger: Trigger) {
        self.commands.push_back(QueuedCommand { command, trigger });
    }

    /// The front maneuver, if its time has come.
    pub fn next_due(&self, now: f64) -> Option<&Maneuver> {
        self.maneuvers.front().filter(|m| m.time <= now)
    }

    pub fn pop_maneuver(&mut self) -> Option<Maneuver> {
        self.maneuvers.pop_front()
    }

    /// Pop the front maneuver if it is due at `now`.
    pub fn pop_due(&mut self, now: f64) -> Option<Maneuver> {
        if self.next_due(now).is_some() {
            self.maneuvers.pop_front()
        } else {
            None
        }
    }

    /// Pop the front command if it waits on `trigger`.
    ///
    /// Commands behind a non-matching front command stay queued.
    pub fn take_command_for(&mut self, trigger: Trigger) -> Option<Command> {
        if self.commands.front()?.trigger != trigger {
            return None;
        }
        self.commands.pop_front().map(|queued| queued.command)
    }

    pub fn maneuvers(&self) -> impl Iterator<Item = &Maneuver> {
        self.maneuvers.iter()
    }

    pub fn commands(&self) -> impl Iterator<Item = &QueuedCommand> {
        self.commands.iter()
    }

    pub fn pending_maneuvers(&self) -> usize {
        self.maneuvers.len()
    }

    pub fn pending_commands(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maneuvers.is_empty() && self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.maneuvers.clear();
        self.commands.clear();
    }
}

/// Plan the maneuvers a command expands to for a ship on `orbit` at `now`.
pub fn plan_command(orbit: &Orbit, command: &Command, now: f64) -> Result<Vec<Maneuver>, ManeuverError> {
    let planned = match command {
        Command::CircularizeAtApoapsis => vec![maneuver::circularize_at_apoapsis(orbit, now)?],
        Command::CircularizeAtPeriapsis => vec![maneuver::circularize_at_periapsis(orbit, now)?],
        Command::SetApoapsis(radius) => vec![maneuver::set_apoapsis(orbit, *radius, now)?],
        Command::SetPeriapsis(radius) => vec![maneuver::set_periapsis(orbit, *radius, now)?],
        Command::SetInclination(target) => vec![maneuver::set_inclination(orbit, *target, now)?],
        Command::MatchPlanes(target) => vec![maneuver::match_planes(orbit, target, now)?],
        Command::CoplanarIntercept(target) => {
            vec![transfers::coplanar_intercept(orbit, target, now)?.departure]
        }
        Command::CoplanarInterceptAndTransfer(target) => {
            transfers::coplanar_intercept(orbit, target, now)?.to_vec()
        }
        Command::Impulse(delta_v) => vec![Maneuver::orbital(*delta_v, now)],
    };
    debug!(command = command.name(), burns = planned.len(), "planned command");
    Ok(planned)
}

/// Queue the burn sequence that carries a ship from `current` onto a body on `target`.
///
/// Eccentric starts are circularized first. The plane match, the intercept and the capture
/// circularization then follow as triggered commands.
pub fn queue_transfer(
    queue: &mut CommandQueue,
    current: &Orbit,
    target: &Orbit,
    now: f64,
) -> Result<(), ManeuverError> {
    if current.eccentricity > CIRCULAR_EPSILON {
        queue.push_maneuver(maneuver::circularize_at_periapsis(current, now)?);
        queue.push_command(Command::MatchPlanes(*target), Trigger::OnManeuver);
    } else {
        queue.push_maneuver(maneuver::match_planes(current, target, now)?);
    }
    queue.push_command(Command::CoplanarIntercept(*target), Trigger::OnManeuver);
    queue.push_command(Command::CircularizeAtPeriapsis, Trigger::OnEnterSoi);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellar_core::constants::EARTH_MU_KM3_S2;

    fn leo() -> Orbit {
        Orbit::circular(7_000.0, EARTH_MU_KM3_S2).unwrap()
    }

    #[test]
    fn maneuvers_run_in_queue_order_when_due() {
        let mut queue = CommandQueue::new();
        queue.push_maneuver(Maneuver::orbital([0.0, 1.0, 0.0], 50.0));
        queue.push_maneuver(Maneuver::orbital([0.0, 2.0, 0.0], 10.0));

        assert!(queue.next_due(49.0).is_none());
        assert!(queue.pop_due(49.0).is_none());
        let first = queue.pop_due(50.0).expect("due");
        assert_eq!(first.delta_v[1], 1.0);
        assert_eq!(queue.pop_maneuver().map(|m| m.time), Some(10.0));
        assert!(queue.is_empty());
    }

    #[test]
    fn only_the_front_command_can_fire() {
        let mut queue = CommandQueue::new();
        queue.push_command(Command::CircularizeAtPeriapsis, Trigger::OnEnterSoi);
        queue.push_command(Command::SetApoapsis(9_000.0), Trigger::Asap);

        assert_eq!(queue.take_command_for(Trigger::Asap), None);
        assert_eq!(
            queue.take_command_for(Trigger::OnEnterSoi),
            Some(Command::CircularizeAtPeriapsis)
        );
        assert_eq!(
            queue.take_command_for(Trigger::Asap),
            Some(Command::SetApoapsis(9_000.0))
        );
        assert_eq!(queue.pending_commands(), 0);
    }

    #[test]
    fn commands_expand_to_planned_burns() {
        let orbit = leo();
        let target = Orbit::new(12_000.0, 0.0, 0.0, 0.0, 0.0, 1.0, EARTH_MU_KM3_S2).unwrap();

        let raise = plan_command(&orbit, &Command::SetApoapsis(9_000.0), 5.0).unwrap();
        assert_eq!(raise.len(), 1);
        assert_eq!(raise[0], maneuver::set_apoapsis(&orbit, 9_000.0, 5.0).unwrap());

        let intercept = plan_command(&orbit, &Command::CoplanarIntercept(target), 0.0).unwrap();
        assert_eq!(intercept.len(), 1);
        let full = plan_command(&orbit, &Command::CoplanarInterceptAndTransfer(target), 0.0).unwrap();
        assert_eq!(full.len(), 2);
        assert_eq!(full[0], intercept[0]);
        assert!(full[1].time > full[0].time);

        let kick = plan_command(&orbit, &Command::Impulse([0.0, 0.1, 0.0]), 3.0).unwrap();
        assert_eq!(kick, vec![Maneuver::orbital([0.0, 0.1, 0.0], 3.0)]);
    }

    #[test]
    fn planning_errors_surface() {
        let orbit = leo();
        assert_eq!(
            plan_command(&orbit, &Command::SetPeriapsis(0.0), 0.0),
            Err(ManeuverError::InvalidRadius(0.0))
        );
    }

    #[test]
    fn transfer_from_circular_orbit_matches_planes_first() {
        let mut queue = CommandQueue::new();
        let target = Orbit::new(384_400.0, 0.0, 0.09, 0.0, 0.0, 0.0, EARTH_MU_KM3_S2).unwrap();
        queue_transfer(&mut queue, &leo(), &target, 0.0).unwrap();

        assert_eq!(queue.pending_maneuvers(), 1);
        let triggers: Vec<Trigger> = queue.commands().map(|c| c.trigger).collect();
        assert_eq!(triggers, vec![Trigger::OnManeuver, Trigger::OnEnterSoi]);
    }

    #[test]
    fn transfer_from_eccentric_orbit_circularizes_first() {
        let mut queue = CommandQueue::new();
        let current = Orbit::new(9_000.0, 0.2, 0.0, 0.0, 0.0, 0.0, EARTH_MU_KM3_S2).unwrap();
        let target = Orbit::new(384_400.0, 0.0, 0.09, 0.0, 0.0, 0.0, EARTH_MU_KM3_S2).unwrap();
        queue_transfer(&mut queue, &current, &target, 0.0).unwrap();

        let names: Vec<&str> = queue.commands().map(|c| c.command.name()).collect();
        assert_eq!(
            names,
            vec!["match-planes", "coplanar-intercept", "circularize-at-periapsis"]
        );
    }
}
