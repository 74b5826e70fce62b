use glam::DVec2;

use crate::engine::collision::{find_occupant_near, CollisionEvent, CollisionResolver, Occupancy};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::physics::body::{Body, BodyId, ATTRACTOR_RADIUS};
use crate::engine::physics::constants::PhysicsConstants;
use crate::engine::physics::integrator;
use crate::engine::trajectory::{RandomSource, ShotClass, TrajectorySynthesizer};

/// Extra room kept between a dragged body and the attractor surface
pub const MOVE_CLEARANCE: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellStats {
    pub bodies: usize,
    pub free_bodies: usize,
    pub kinetic_energy: f64,
    pub playing: bool,
}

/// One independent simulation: a single attractor and the bodies it pulls.
///
/// Bodies keep insertion order, which is also id order. The attractor holds no
/// list of its own; every tick hands it the cell's bodies directly.
#[derive(Debug)]
pub struct Cell {
    attractor: Body,
    bodies: Vec<Body>,
    next_body_id: u32,
    playing: bool,
    collision_events: Vec<CollisionEvent>,
}

impl Default for Cell {
    fn default() -> Self {
        Self::new()
    }
}

impl Cell {
    /// Empty cell with the standard attractor at the origin
    pub fn new() -> Self {
        Self::with_attractor(Body::attractor(DVec2::ZERO, ATTRACTOR_RADIUS))
    }

    pub fn with_attractor(mut attractor: Body) -> Self {
        attractor.id = BodyId::ATTRACTOR;
        Self {
            attractor,
            bodies: Vec::new(),
            next_body_id: 1,
            playing: false,
            collision_events: Vec::new(),
        }
    }

    pub fn attractor(&self) -> &Body {
        &self.attractor
    }

    pub fn attractor_mut(&mut self) -> &mut Body {
        &mut self.attractor
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.iter().find(|b| b.id == id)
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.bodies.iter_mut().find(|b| b.id == id)
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Contacts detected during the last physics tick
    pub fn collision_events(&self) -> &[CollisionEvent] {
        &self.collision_events
    }

    /// Add a body without any space check and give it the next id
    pub fn add_body(&mut self, mut body: Body) -> BodyId {
        let id = BodyId(self.next_body_id);
        self.next_body_id += 1;

        body.id = id;
        self.bodies.push(body);
        id
    }

    pub fn remove_body(&mut self, id: BodyId) -> Option<Body> {
        let index = self.bodies.iter().position(|b| b.id == id)?;
        Some(self.bodies.remove(index))
    }

    /// What a new body of `radius` at `point` would run into
    pub fn find_occupant_near(&self, point: DVec2, radius: f64) -> Occupancy {
        find_occupant_near(point, radius, &self.attractor, &self.bodies)
    }

    /// Place a resting body at `position` if there is room for it.
    pub fn place_body(&mut self, position: DVec2, radius: f64) -> EngineResult<BodyId> {
        match self.find_occupant_near(position, radius) {
            Occupancy::Empty => {
                let body = Body::new(position.x, position.y, 0.0, 0.0, radius, None);
                let id = self.add_body(body);
                crate::debug_print!("placed {id:?} at {position} r={radius}");
                Ok(id)
            }
            Occupancy::Existing(other) => {
                log::debug!("placement at {position} rejected: inside {other:?}");
                Err(EngineError::Occupied {
                    x: position.x,
                    y: position.y,
                })
            }
            Occupancy::NearMiss => {
                log::debug!("placement at {position} rejected: too close");
                Err(EngineError::TooClose {
                    x: position.x,
                    y: position.y,
                })
            }
        }
    }

    /// Place a body with the default random radius
    pub fn place_random_body(
        &mut self,
        position: DVec2,
        rng: &mut dyn RandomSource,
    ) -> EngineResult<BodyId> {
        let radius = Body::random_radius(rng);
        self.place_body(position, radius)
    }

    /// Drag a body to a new starting position.
    pub fn move_body(&mut self, id: BodyId, position: DVec2) -> EngineResult<()> {
        let center = self.attractor.position;
        let limit = self.attractor.radius() + MOVE_CLEARANCE;

        let body = self
            .bodies
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(EngineError::UnknownBody(id))?;

        if position.distance(center) < limit + body.radius() {
            return Err(EngineError::TooCloseToAttractor { id });
        }
        body.set_position(position);
        Ok(())
    }

    /// Compute and install a launch velocity for one body.
    ///
    /// Nothing is touched when the shot name is unknown.
    pub fn launch_body(
        &mut self,
        id: BodyId,
        shot: &str,
        synthesizer: &TrajectorySynthesizer,
        rng: &mut dyn RandomSource,
    ) -> EngineResult<DVec2> {
        let shot = shot.parse::<ShotClass>()?;
        let body = self
            .bodies
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(EngineError::UnknownBody(id))?;
        Ok(synthesizer.synthesize(body, &self.attractor, shot, rng))
    }

    /// Returns the new muted state
    pub fn toggle_attractor_mute(&mut self) -> bool {
        self.attractor.flags.muted = !self.attractor.flags.muted;
        self.attractor.flags.muted
    }

    /// Start a new run.
    ///
    /// The attractor and every step-triggered body hit their notes first, then
    /// every body goes back to its initial state.
    pub fn play(&mut self) {
        self.playing = true;
        self.attractor.play_own_note();
        for body in self.bodies.iter_mut().filter(|b| b.flags.step_triggered) {
            body.play_own_note();
        }
        self.reset_bodies();
    }

    pub fn stop(&mut self) {
        self.playing = false;
        self.reset_bodies();
    }

    pub fn reset(&mut self) {
        self.stop();
    }

    fn reset_bodies(&mut self) {
        self.attractor.reset();
        for body in &mut self.bodies {
            body.reset();
        }
        self.collision_events.clear();
    }

    /// One physics tick: integrate, then resolve collisions.
    pub fn tick_physics(&mut self, constants: &PhysicsConstants, resolver: &CollisionResolver) {
        if !self.playing {
            return;
        }
        integrator::step(&mut self.attractor, &mut self.bodies, constants);
        self.collision_events = resolver.check_cell(&mut self.attractor, &mut self.bodies);
    }

    /// One modulation tick: feed distance and angle to every sound module.
    pub fn tick_modulation(&mut self) {
        if !self.playing {
            return;
        }
        let center = self.attractor.position;
        for body in &mut self.bodies {
            body.update_sound_module(center);
        }
    }

    pub fn stats(&self) -> CellStats {
        CellStats {
            bodies: self.bodies.len(),
            free_bodies: self.bodies.iter().filter(|b| b.flags.free).count(),
            kinetic_energy: self.bodies.iter().map(Body::kinetic_energy).sum(),
            playing: self.playing,
        }
    }
}
