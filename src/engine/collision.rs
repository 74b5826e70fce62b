use glam::DVec2;

use crate::engine::debug::debug_flags;
use crate::engine::physics::body::{Body, BodyId};
use crate::engine::physics::world_bounds::{BoundsBehavior, WorldBounds};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionKind {
    /// One of the pair is fixed; the other one bounces off it and plays its note
    WithFixed,
    /// Two movable bodies overlap. Recorded, never resolved.
    BodyBody,
}

#[derive(Debug, Clone)]
pub struct CollisionEvent {
    pub first: BodyId,
    pub second: BodyId,
    pub contact_point: DVec2,
    /// Unit vector from `second` toward `first`
    pub normal: DVec2,
    pub kind: CollisionKind,
    /// Whether a velocity was reflected for this contact
    pub reflected: bool,
}

#[derive(Copy, Clone, Debug)]
pub struct CollisionResult {
    pub collided: bool,
    pub contact_point: DVec2,
}

impl CollisionResult {
    pub fn none() -> Self {
        Self {
            collided: false,
            contact_point: DVec2::ZERO,
        }
    }

    pub fn hit(point: DVec2) -> Self {
        Self {
            collided: true,
            contact_point: point,
        }
    }
}

/// Distance between the surfaces of two bodies. Negative when they overlap.
pub fn gap(a: &Body, b: &Body) -> f64 {
    a.distance_to(b) - a.radius() - b.radius()
}

/// Two bodies collide when they touch and at least one of them is solid.
pub fn collides(a: &Body, b: &Body) -> bool {
    (a.is_solid() || b.is_solid()) && gap(a, b) <= 0.0
}

pub fn check_collision_with_point(a: &Body, b: &Body) -> CollisionResult {
    if !collides(a, b) {
        return CollisionResult::none();
    }

    // Contact point is along the line between centers
    let offset = b.position - a.position;
    let direction = offset.try_normalize().unwrap_or(DVec2::ZERO);
    CollisionResult::hit(a.position + direction * a.radius())
}

/// Reflect `velocity` off a fixed circular obstacle.
///
/// `offset` points from the obstacle's center to the moving body's center.
/// The velocity is split into a radial part along `offset` and a tangential
/// part across it; the radial part is inverted. Returns `None` when the
/// centers coincide and no direction can be defined.
pub fn reflect_off_fixed(velocity: DVec2, offset: DVec2) -> Option<DVec2> {
    let separation = offset.length();
    if separation <= f64::EPSILON {
        return None;
    }
    let speed = velocity.length();
    if speed <= f64::EPSILON {
        return Some(velocity);
    }

    let normal = offset / separation;
    let cos_alpha = (velocity.dot(normal) / speed).clamp(-1.0, 1.0);
    let sin_alpha = (1.0 - cos_alpha * cos_alpha)
        .max(0.0)
        .sqrt()
        .copysign(normal.perp_dot(velocity));

    let radial = -speed * cos_alpha;
    let tangential = speed * sin_alpha;
    Some(normal * radial + normal.perp() * tangential)
}

/// Result of a space check at a candidate placement point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupancy {
    Empty,
    /// Close enough to another body that a new one would overlap it
    NearMiss,
    /// The point lies inside this body
    Existing(BodyId),
}

/// Look for anything at `point` that a body of `radius` would run into.
///
/// A body containing the point wins over a near miss.
pub fn find_occupant_near(point: DVec2, radius: f64, attractor: &Body, bodies: &[Body]) -> Occupancy {
    let mut near = false;
    for body in bodies.iter().chain(std::iter::once(attractor)) {
        let d = body.position.distance(point);
        if d - body.radius() <= 0.0 {
            return Occupancy::Existing(body.id);
        }
        if d - body.radius() - radius <= 0.0 {
            near = true;
        }
    }

    if near {
        Occupancy::NearMiss
    } else {
        Occupancy::Empty
    }
}

/// Pairwise contact handling for one cell.
///
/// Only bodies touching a fixed partner respond: they play their note and
/// bounce off elastically. Contacts between two movable bodies are reported
/// but left alone.
#[derive(Debug, Clone)]
pub struct CollisionResolver {
    pub bounds: WorldBounds,
    pub bounds_behavior: BoundsBehavior,
    /// With the latch on, a body only bounces while approaching its fixed
    /// partner and only plays once per contact. With it off every overlapping
    /// tick reflects and plays.
    pub contact_latch: bool,
}

impl Default for CollisionResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CollisionResolver {
    pub fn new() -> Self {
        Self {
            bounds: WorldBounds::default(),
            bounds_behavior: BoundsBehavior::Ignore,
            contact_latch: true,
        }
    }

    pub fn with_bounds(mut self, bounds: WorldBounds, behavior: BoundsBehavior) -> Self {
        self.bounds = bounds;
        self.bounds_behavior = behavior;
        self
    }

    pub fn with_contact_latch(mut self, enabled: bool) -> Self {
        self.contact_latch = enabled;
        self
    }

    /// Check every unordered pair of the cell, bodies first and attractor
    /// last, then the field edges.
    pub fn check_cell(&self, attractor: &mut Body, bodies: &mut [Body]) -> Vec<CollisionEvent> {
        let count = bodies.len() + 1;
        let mut events = Vec::new();
        let mut touching_fixed = vec![false; count];

        for i in 0..count {
            for j in (i + 1)..count {
                let (a, b) = pair_mut(attractor, bodies, i, j);
                if let Some(event) = self.resolve_pair(a, b) {
                    if event.kind == CollisionKind::WithFixed {
                        touching_fixed[i] |= !a.is_fixed();
                        touching_fixed[j] |= !b.is_fixed();
                    }
                    events.push(event);
                }
            }
        }

        for (body, touching) in bodies.iter_mut().zip(touching_fixed.iter()) {
            body.in_contact = *touching;
        }

        if self.bounds_behavior == BoundsBehavior::Reflect {
            for body in bodies.iter_mut().filter(|b| !b.is_fixed()) {
                self.bounce_off_edges(body);
            }
        }

        if debug_flags().is_collision_enabled() {
            for event in &events {
                log::debug!("collision {:?}", event);
            }
        }

        events
    }

    fn resolve_pair(&self, a: &mut Body, b: &mut Body) -> Option<CollisionEvent> {
        let result = check_collision_with_point(a, b);
        if !result.collided {
            return None;
        }

        let normal = (a.position - b.position).try_normalize().unwrap_or(DVec2::ZERO);
        let kind = if a.is_fixed() || b.is_fixed() {
            CollisionKind::WithFixed
        } else {
            CollisionKind::BodyBody
        };

        let mut reflected = false;
        if kind == CollisionKind::WithFixed {
            if !a.is_fixed() {
                reflected |= self.bounce(a, b);
            }
            if !b.is_fixed() {
                reflected |= self.bounce(b, a);
            }
        }

        Some(CollisionEvent {
            first: a.id,
            second: b.id,
            contact_point: result.contact_point,
            normal,
            kind,
            reflected,
        })
    }

    /// Bounce `body` off the fixed `partner`. Returns whether it was reflected.
    fn bounce(&self, body: &mut Body, partner: &Body) -> bool {
        let offset = body.position - partner.position;

        if self.contact_latch {
            let approaching = body.velocity.dot(offset) < 0.0;
            if !approaching {
                return false;
            }
            if !body.in_contact {
                body.play_own_note();
            }
        } else {
            body.play_own_note();
        }

        match reflect_off_fixed(body.velocity, offset) {
            Some(velocity) => {
                body.velocity = velocity;
                true
            }
            None => {
                log::trace!("body {:?} sits on the center of {:?}", body.id, partner.id);
                false
            }
        }
    }

    fn bounce_off_edges(&self, body: &mut Body) {
        let violation = self.bounds.violation(body.position, body.radius());
        let center = (self.bounds.min + self.bounds.max) * 0.5;
        let outward = body.position - center;

        if violation.x && body.velocity.x * outward.x > 0.0 {
            body.velocity.x = -body.velocity.x;
        }
        if violation.y && body.velocity.y * outward.y > 0.0 {
            body.velocity.y = -body.velocity.y;
        }
    }
}

/// Two distinct mutable entries of the combined list `bodies ++ [attractor]`.
fn pair_mut<'a>(
    attractor: &'a mut Body,
    bodies: &'a mut [Body],
    i: usize,
    j: usize,
) -> (&'a mut Body, &'a mut Body) {
    debug_assert!(i < j);
    if j == bodies.len() {
        (&mut bodies[i], attractor)
    } else {
        let (left, right) = bodies.split_at_mut(j);
        (&mut left[i], &mut right[0])
    }
}
