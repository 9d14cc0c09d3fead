//! The orbital hierarchy: every entity orbits its parent and sits in that parent's child list.

use std::collections::HashSet;

use stellar_core::vector::{self, Vector3};
use stellar_impulsive::{
    Command, CommandQueue, Maneuver, ManeuverError, Trigger, plan_command, queue_transfer,
};
use stellar_orbits::{
    BodyId, KeplerSettings, Orbit, OrbitError, StateVector, cartesian_to_orbit, sphere_of_influence,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::arena::Arena;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SystemError {
    #[error("unknown or stale handle {0:?}")]
    UnknownBody(BodyId),
    #[error("{0:?} is not a celestial body")]
    NotABody(BodyId),
    #[error("{0:?} does not orbit anything")]
    NoParent(BodyId),
    #[error("{id:?} and {target:?} do not orbit the same parent")]
    NotSiblings { id: BodyId, target: BodyId },
    #[error("{0:?} still has orbiting children")]
    HasChildren(BodyId),
    #[error("the universe already has a root body")]
    RootExists,
    #[error(transparent)]
    Orbit(#[from] OrbitError),
    #[error(transparent)]
    Maneuver(#[from] ManeuverError),
}

/// Physical parameters of a celestial body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub gm: f64,
    pub radius: f64,
    /// Sphere-of-influence radius; infinite for the root.
    pub soi: f64,
}

impl Body {
    pub fn new(gm: f64, radius: f64) -> Self {
        Self {
            gm,
            radius,
            soi: f64::INFINITY,
        }
    }

    pub fn with_soi(mut self, soi: f64) -> Self {
        self.soi = soi;
        self
    }
}

/// Cached state of an entity at the universe clock.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Kinematics {
    /// Relative to the parent.
    pub position: Vector3,
    /// Relative to the parent.
    pub velocity: Vector3,
    /// Absolute position of the parent.
    pub center: Vector3,
}

impl Kinematics {
    pub fn absolute_position(&self) -> Vector3 {
        vector::add(&self.center, &self.position)
    }
}

/// A body or vessel stored in the universe.
#[derive(Debug, Clone)]
pub struct Entity {
    pub name: String,
    /// `None` only for the root.
    pub orbit: Option<Orbit>,
    /// `None` for vessels.
    pub body: Option<Body>,
    pub kinematics: Kinematics,
    pub children: Vec<BodyId>,
    pub queue: CommandQueue,
    pub crashed: bool,
}

impl Entity {
    pub fn is_vessel(&self) -> bool {
        self.body.is_none()
    }

    pub fn parent(&self) -> Option<BodyId> {
        self.orbit.and_then(|orbit| orbit.reference_body)
    }
}

/// Things that happened during a tick or an explicit transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    ManeuverExecuted { id: BodyId, maneuver: Maneuver },
    CommandExecuted { id: BodyId, command: Command, trigger: Trigger },
    ExitedSoi { id: BodyId, from: BodyId, to: BodyId },
    EnteredSoi { id: BodyId, from: BodyId, to: BodyId },
    Crashed { id: BodyId, into: BodyId },
}

#[derive(Debug, Clone)]
pub struct Universe {
    entities: Arena<Entity>,
    root: Option<BodyId>,
    time: f64,
    settings: KeplerSettings,
}

impl Default for Universe {
    fn default() -> Self {
        Self::with_settings(KeplerSettings::default())
    }
}

impl Universe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: KeplerSettings) -> Self {
        Self {
            entities: Arena::new(),
            root: None,
            time: 0.0,
            settings,
        }
    }

    /// Universe clock in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn root(&self) -> Option<BodyId> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, id: BodyId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn entity(&self, id: BodyId) -> Result<&Entity, SystemError> {
        self.entities.get(id).ok_or(SystemError::UnknownBody(id))
    }

    fn entity_mut(&mut self, id: BodyId) -> Result<&mut Entity, SystemError> {
        self.entities.get_mut(id).ok_or(SystemError::UnknownBody(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (BodyId, &Entity)> {
        self.entities.iter()
    }

    /// Look an entity up by name (case-insensitive).
    pub fn find(&self, name: &str) -> Option<BodyId> {
        self.entities
            .iter()
            .find(|(_, entity)| entity.name.eq_ignore_ascii_case(name))
            .map(|(id, _)| id)
    }

    fn body_of(&self, id: BodyId) -> Result<Body, SystemError> {
        self.entity(id)?.body.ok_or(SystemError::NotABody(id))
    }

    pub fn add_root(&mut self, name: impl Into<String>, body: Body) -> Result<BodyId, SystemError> {
        if self.root.is_some() {
            return Err(SystemError::RootExists);
        }
        let id = self.entities.insert(Entity {
            name: name.into(),
            orbit: None,
            body: Some(body),
            kinematics: Kinematics::default(),
            children: Vec::new(),
            queue: CommandQueue::new(),
            crashed: false,
        });
        self.root = Some(id);
        Ok(id)
    }

    /// Add a celestial body orbiting `parent`.
    ///
    /// The orbit's `gm` is taken from the parent. A body without a finite SOI gets the Laplace
    /// sphere of influence for its orbit.
    pub fn add_body(
        &mut self,
        parent: BodyId,
        name: impl Into<String>,
        body: Body,
        orbit: Orbit,
    ) -> Result<BodyId, SystemError> {
        self.attach(parent, name.into(), Some(body), orbit)
    }

    pub fn add_vessel(
        &mut self,
        parent: BodyId,
        name: impl Into<String>,
        orbit: Orbit,
    ) -> Result<BodyId, SystemError> {
        self.attach(parent, name.into(), None, orbit)
    }

    fn attach(
        &mut self,
        parent: BodyId,
        name: String,
        body: Option<Body>,
        mut orbit: Orbit,
    ) -> Result<BodyId, SystemError> {
        let primary = self.body_of(parent)?;
        orbit.gm = primary.gm;
        orbit.reference_body = Some(parent);
        orbit.validate()?;

        let body = body.map(|body| {
            if body.soi.is_finite() {
                body
            } else {
                body.with_soi(sphere_of_influence(orbit.semi_major_axis, body.gm, primary.gm))
            }
        });
        let state = self.state_of(&orbit)?;
        let center = self.entity(parent)?.kinematics.absolute_position();

        let id = self.entities.insert(Entity {
            name,
            orbit: Some(orbit),
            body,
            kinematics: Kinematics {
                position: state.position,
                velocity: state.velocity,
                center,
            },
            children: Vec::new(),
            queue: CommandQueue::new(),
            crashed: false,
        });
        self.entity_mut(parent)?.children.push(id);
        Ok(id)
    }

    /// Remove a leaf entity, detaching it from its parent.
    pub fn remove(&mut self, id: BodyId) -> Result<Entity, SystemError> {
        let entity = self.entity(id)?;
        if !entity.children.is_empty() {
            return Err(SystemError::HasChildren(id));
        }
        if let Some(parent) = entity.parent() {
            if let Some(parent) = self.entities.get_mut(parent) {
                parent.children.retain(|child| *child != id);
            }
        }
        if self.root == Some(id) {
            self.root = None;
        }
        self.entities.remove(id).ok_or(SystemError::UnknownBody(id))
    }

    pub fn children(&self, id: BodyId) -> Result<&[BodyId], SystemError> {
        Ok(&self.entity(id)?.children)
    }

    pub fn parent(&self, id: BodyId) -> Result<Option<BodyId>, SystemError> {
        Ok(self.entity(id)?.parent())
    }

    /// Every SOI `id` is nested in, innermost first.
    pub fn soi_hierarchy(&self, id: BodyId) -> Result<Vec<BodyId>, SystemError> {
        let mut chain = Vec::new();
        let mut current = self.entity(id)?.parent();
        while let Some(parent) = current {
            chain.push(parent);
            current = self.entity(parent)?.parent();
        }
        Ok(chain)
    }

    /// Innermost SOI containing both entities, if they share a tree.
    pub fn common_soi(&self, a: BodyId, b: BodyId) -> Result<Option<BodyId>, SystemError> {
        let left = self.soi_hierarchy(a)?;
        let right: HashSet<BodyId> = self.soi_hierarchy(b)?.into_iter().collect();
        Ok(left.into_iter().find(|id| right.contains(id)))
    }

    fn state_of(&self, orbit: &Orbit) -> Result<StateVector, OrbitError> {
        orbit.to_cartesian(orbit.true_anomaly_at_with(self.time, &self.settings))
    }

    /// State of `id` relative to its parent at the universe clock.
    pub fn relative_state(&self, id: BodyId) -> Result<StateVector, SystemError> {
        match self.entity(id)?.orbit {
            Some(orbit) => Ok(self.state_of(&orbit)?),
            None => Ok(StateVector::default()),
        }
    }

    pub fn command_queue(&self, id: BodyId) -> Result<&CommandQueue, SystemError> {
        Ok(&self.entity(id)?.queue)
    }

    pub fn push_maneuver(&mut self, id: BodyId, maneuver: Maneuver) -> Result<(), SystemError> {
        self.entity_mut(id)?.queue.push_maneuver(maneuver);
        Ok(())
    }

    pub fn push_command(
        &mut self,
        id: BodyId,
        command: Command,
        trigger: Trigger,
    ) -> Result<(), SystemError> {
        self.entity_mut(id)?.queue.push_command(command, trigger);
        Ok(())
    }

    /// Queue the burns that take vessel `id` to the sibling body `target`.
    pub fn transfer_to(&mut self, id: BodyId, target: BodyId) -> Result<(), SystemError> {
        let (orbit, parent) = self.orbit_and_parent(id)?;
        let target_orbit = self
            .entity(target)?
            .orbit
            .filter(|orbit| orbit.reference_body == Some(parent))
            .ok_or(SystemError::NotSiblings { id, target })?;
        let time = self.time;
        queue_transfer(&mut self.entity_mut(id)?.queue, &orbit, &target_orbit, time)?;
        Ok(())
    }

    fn orbit_and_parent(&self, id: BodyId) -> Result<(Orbit, BodyId), SystemError> {
        let orbit = self.entity(id)?.orbit.ok_or(SystemError::NoParent(id))?;
        let parent = orbit.reference_body.ok_or(SystemError::NoParent(id))?;
        Ok((orbit, parent))
    }

    fn reparent(&mut self, id: BodyId, from: BodyId, to: BodyId, orbit: Orbit) -> Result<(), SystemError> {
        self.entity_mut(from)?.children.retain(|child| *child != id);
        self.entity_mut(to)?.children.push(id);
        self.entity_mut(id)?.orbit = Some(orbit);
        self.refresh_kinematics(id)
    }

    /// Move `id` from its parent's SOI into the grandparent's.
    ///
    /// Does nothing when the parent is the root.
    pub fn leave_soi(&mut self, id: BodyId) -> Result<Vec<Event>, SystemError> {
        let (orbit, parent) = self.orbit_and_parent(id)?;
        let Some(parent_orbit) = self.entity(parent)?.orbit else {
            return Ok(Vec::new());
        };
        let grandparent = parent_orbit.reference_body.ok_or(SystemError::NoParent(parent))?;
        let primary = self.body_of(grandparent)?;

        let own = self.state_of(&orbit)?;
        let carrier = self.state_of(&parent_orbit)?;
        let mut next = cartesian_to_orbit(
            &vector::add(&own.position, &carrier.position),
            &vector::add(&own.velocity, &carrier.velocity),
            primary.gm,
            self.time,
        )?;
        next.reference_body = Some(grandparent);
        self.reparent(id, parent, grandparent, next)?;

        info!(
            entity = %self.entity(id)?.name,
            from = %self.entity(parent)?.name,
            to = %self.entity(grandparent)?.name,
            "left sphere of influence"
        );
        let mut events = vec![Event::ExitedSoi {
            id,
            from: parent,
            to: grandparent,
        }];
        self.fire_trigger(id, Trigger::OnExitSoi, self.time, &mut events);
        Ok(events)
    }

    /// Move `id` into the SOI of `target`, a body orbiting the same parent.
    pub fn enter_soi(&mut self, id: BodyId, target: BodyId) -> Result<Vec<Event>, SystemError> {
        let (orbit, parent) = self.orbit_and_parent(id)?;
        let target_entity = self.entity(target)?;
        let body = target_entity.body.ok_or(SystemError::NotABody(target))?;
        let target_orbit = target_entity
            .orbit
            .filter(|orbit| orbit.reference_body == Some(parent) && target != id)
            .ok_or(SystemError::NotSiblings { id, target })?;

        let own = self.state_of(&orbit)?;
        let other = self.state_of(&target_orbit)?;
        let mut next = cartesian_to_orbit(
            &vector::sub(&own.position, &other.position),
            &vector::sub(&own.velocity, &other.velocity),
            body.gm,
            self.time,
        )?;
        next.reference_body = Some(target);
        self.reparent(id, parent, target, next)?;

        info!(
            entity = %self.entity(id)?.name,
            body = %self.entity(target)?.name,
            "entered sphere of influence"
        );
        let mut events = vec![Event::EnteredSoi {
            id,
            from: parent,
            to: target,
        }];
        self.fire_trigger(id, Trigger::OnEnterSoi, self.time, &mut events);
        Ok(events)
    }

    fn refresh_kinematics(&mut self, id: BodyId) -> Result<(), SystemError> {
        let Some(orbit) = self.entity(id)?.orbit else {
            return Ok(());
        };
        let state = self.state_of(&orbit)?;
        let center = match orbit.reference_body {
            Some(parent) => self.entity(parent)?.kinematics.absolute_position(),
            None => vector::ZERO,
        };
        self.entity_mut(id)?.kinematics = Kinematics {
            position: state.position,
            velocity: state.velocity,
            center,
        };
        Ok(())
    }

    /// Plan the front command at `time` if it waits on `trigger`. Returns whether a command
    /// was consumed.
    fn fire_trigger(&mut self, id: BodyId, trigger: Trigger, time: f64, events: &mut Vec<Event>) -> bool {
        let Some(entity) = self.entities.get_mut(id) else {
            return false;
        };
        let Some(orbit) = entity.orbit else {
            return false;
        };
        let Some(command) = entity.queue.take_command_for(trigger) else {
            return false;
        };
        match plan_command(&orbit, &command, time) {
            Ok(maneuvers) => {
                debug!(entity = %entity.name, command = command.name(), ?trigger, "command planned");
                entity.queue.push_maneuvers(maneuvers);
                events.push(Event::CommandExecuted {
                    id,
                    command,
                    trigger,
                });
            }
            Err(err) => {
                warn!(entity = %entity.name, command = command.name(), %err, "dropping command");
            }
        }
        true
    }

    /// Advance the clock by `dt` seconds and update the whole tree top-down.
    pub fn tick(&mut self, dt: f64) -> Vec<Event> {
        self.time += dt;
        let mut events = Vec::new();
        let Some(root) = self.root else {
            return events;
        };

        let mut visited = HashSet::new();
        let mut stack = vec![root];
        while let Some(parent) = stack.pop() {
            let Some(children) = self.entities.get(parent).map(|e| e.children.clone()) else {
                continue;
            };
            let fresh: Vec<BodyId> = children.into_iter().filter(|c| visited.insert(*c)).collect();
            for &child in &fresh {
                self.step(child, &mut events);
            }
            for &child in &fresh {
                self.check_transitions(child, parent, &mut events);
            }
            if let Some(entity) = self.entities.get(parent) {
                stack.extend(entity.children.iter().copied());
            }
        }
        events
    }

    /// Execute due maneuvers and refresh the cached state of one entity.
    fn step(&mut self, id: BodyId, events: &mut Vec<Event>) {
        let time = self.time;
        self.fire_trigger(id, Trigger::Asap, time, events);
        loop {
            let Some(entity) = self.entities.get_mut(id) else {
                return;
            };
            if entity.crashed {
                return;
            }
            let Some(orbit) = entity.orbit else {
                break;
            };
            let Some(maneuver) = entity.queue.pop_due(time) else {
                break;
            };
            match maneuver.apply(&orbit) {
                Ok(next) => {
                    entity.orbit = Some(next);
                    info!(
                        entity = %entity.name,
                        dv = maneuver.magnitude(),
                        at = maneuver.time,
                        "executed maneuver"
                    );
                    events.push(Event::ManeuverExecuted { id, maneuver });
                    // follow-ups are planned from the burn, not from the end of the tick
                    self.fire_trigger(id, Trigger::OnManeuver, maneuver.time, events);
                }
                Err(err) => {
                    warn!(entity = %entity.name, %err, "skipping maneuver that cannot be applied");
                }
            }
        }
        if let Err(err) = self.refresh_kinematics(id) {
            warn!(?id, %err, "could not update kinematics");
        }
    }

    fn check_transitions(&mut self, id: BodyId, parent: BodyId, events: &mut Vec<Event>) {
        let Some(entity) = self.entities.get(id) else {
            return;
        };
        if !entity.is_vessel() || entity.crashed || entity.parent() != Some(parent) {
            return;
        }
        let Some(primary) = self.entities.get(parent).and_then(|p| p.body) else {
            return;
        };
        let position = entity.kinematics.position;
        let distance = vector::norm(&position);

        if distance > primary.soi {
            match self.leave_soi(id) {
                Ok(mut exited) => events.append(&mut exited),
                Err(err) => warn!(?id, %err, "could not leave sphere of influence"),
            }
            return;
        }

        if distance < primary.radius {
            self.crash(id, parent, events);
            return;
        }

        let nearby = self.entity(parent).map(|p| {
            p.children
                .iter()
                .filter(|sibling| **sibling != id)
                .filter_map(|sibling| {
                    let entity = self.entities.get(*sibling)?;
                    let body = entity.body?;
                    let gap = vector::distance(&entity.kinematics.position, &position);
                    (gap < body.soi).then_some(*sibling)
                })
                .next()
        });
        if let Ok(Some(target)) = nearby {
            match self.enter_soi(id, target) {
                Ok(mut entered) => events.append(&mut entered),
                Err(err) => warn!(?id, %err, "could not enter sphere of influence"),
            }
        }
    }

    fn crash(&mut self, id: BodyId, parent: BodyId, events: &mut Vec<Event>) {
        if self.fire_trigger(id, Trigger::OnCrash, self.time, events) {
            info!(?id, "executed command on crash");
            return;
        }
        let parent_name = self
            .entities
            .get(parent)
            .map(|p| p.name.clone())
            .unwrap_or_default();
        if let Some(entity) = self.entities.get_mut(id) {
            entity.crashed = true;
            entity.queue.clear();
            entity.kinematics.position = vector::ZERO;
            info!(entity = %entity.name, body = %parent_name, "collided with the surface");
        }
        if let Some(primary) = self.entities.get_mut(parent) {
            primary.children.retain(|child| *child != id);
        }
        events.push(Event::Crashed { id, into: parent });
    }
}
