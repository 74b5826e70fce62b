//! Launch velocities that realize a chosen kind of orbit.
//!
//! All quantities are measured in the integrator's frame: a body's position
//! advances by `velocity * velocity_scale` per tick while gravity changes its
//! velocity by `g * M / r²` per tick. Energies follow the textbook formulas;
//! `unit_scale` converts the resulting speeds into the integrator's velocity
//! unit so that an "escape speed" launch really does escape.
//!
//! Polar velocities are written as `(radial, tangential)` where the radial
//! axis points from the body toward the attractor and the tangential axis is
//! that direction turned a quarter turn counter-clockwise.

use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;
use std::str::FromStr;

use glam::DVec2;
use rand::rngs::ThreadRng;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::physics::body::Body;
use crate::engine::physics::constants::{PhysicsConstants, SharedConstants};
use crate::engine::physics::world_bounds::WorldBounds;

/// Closest distance at which an elliptical launch is attempted
pub const DEFAULT_MIN_ELLIPSE_RADIUS: f64 = 192.0;

/// Source of uniform draws in [0, 1).
///
/// The synthesizer only ever draws through this trait, so tests can script
/// the exact sequence it sees.
pub trait RandomSource {
    fn next_unit(&mut self) -> f64;

    /// +1 or -1 with equal odds
    fn next_sign(&mut self) -> f64 {
        if self.next_unit() < 0.5 {
            1.0
        } else {
            -1.0
        }
    }
}

/// Adapts any `rand` generator.
#[derive(Debug, Clone)]
pub struct RngSource<R: Rng>(pub R);

impl RngSource<ChaCha8Rng> {
    pub fn seeded(seed: u64) -> Self {
        Self(ChaCha8Rng::seed_from_u64(seed))
    }
}

impl RngSource<ThreadRng> {
    pub fn thread() -> Self {
        Self(rand::rng())
    }
}

impl<R: Rng> RandomSource for RngSource<R> {
    fn next_unit(&mut self) -> f64 {
        self.0.random::<f64>()
    }
}

/// Replays a fixed list of draws, wrapping around at the end.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    values: Vec<f64>,
    cursor: usize,
}

impl ScriptedSource {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values, cursor: 0 }
    }
}

impl RandomSource for ScriptedSource {
    fn next_unit(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShotClass {
    HardCollision,
    SoftCollision,
    Hyperbolic,
    Parabolic,
    Elliptical,
    Circular,
    FreeFall,
}

impl ShotClass {
    pub const ALL: [ShotClass; 7] = [
        ShotClass::HardCollision,
        ShotClass::SoftCollision,
        ShotClass::Hyperbolic,
        ShotClass::Parabolic,
        ShotClass::Elliptical,
        ShotClass::Circular,
        ShotClass::FreeFall,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ShotClass::HardCollision => "coll-hard",
            ShotClass::SoftCollision => "coll-soft",
            ShotClass::Hyperbolic => "hyperbole",
            ShotClass::Parabolic => "parabola",
            ShotClass::Elliptical => "ellipsis",
            ShotClass::Circular => "circular",
            ShotClass::FreeFall => "free-fall",
        }
    }

    /// Whether a body launched this way is exempt from friction
    pub fn is_free(&self) -> bool {
        matches!(
            self,
            ShotClass::Hyperbolic | ShotClass::Parabolic | ShotClass::Elliptical | ShotClass::Circular
        )
    }
}

impl fmt::Display for ShotClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ShotClass {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShotClass::ALL
            .into_iter()
            .find(|shot| shot.name() == s)
            .ok_or_else(|| EngineError::UnknownShotClass(s.to_string()))
    }
}

/// Orbital quantities of a body relative to its attractor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitalQuantities {
    /// Distance between the centers
    pub distance: f64,
    /// Angle of the direction from the body to the attractor
    pub bearing: f64,
    pub body_mass: f64,
    /// `-g * m * M / r`
    pub potential_energy: f64,
    /// `sqrt(-2U / m)`
    pub escape_speed: f64,
    /// Converts the speeds above into the integrator's velocity unit
    pub unit_scale: f64,
    /// Half-angle the attractor subtends as seen from the body
    pub theta: f64,
    /// 1 at the attractor, 0 at the edge of the field
    pub intensity: f64,
}

impl OrbitalQuantities {
    /// Measure `body` against `attractor`. `None` when any quantity is
    /// degenerate (zero, negative or not finite).
    pub fn measure(
        body: &Body,
        attractor: &Body,
        constants: &PhysicsConstants,
        bounds: &WorldBounds,
    ) -> Option<Self> {
        let offset = attractor.position - body.position;
        let distance = offset.length();
        let body_mass = body.mass();

        let potential_energy = -constants.g * body_mass * attractor.mass() / distance;
        let escape_speed = (-2.0 * potential_energy / body_mass).sqrt();
        let unit_scale = constants.velocity_scale.sqrt().recip();

        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(distance) || !valid(body_mass) || !valid(escape_speed) || !valid(unit_scale) {
            return None;
        }

        let half_diagonal = bounds.half_diagonal();
        let intensity = if half_diagonal > 0.0 {
            (1.0 - distance / half_diagonal).clamp(0.0, 1.0 - f64::EPSILON)
        } else {
            0.0
        };

        Some(Self {
            distance,
            bearing: offset.y.atan2(offset.x),
            body_mass,
            potential_energy,
            escape_speed,
            unit_scale,
            theta: attractor.radius().atan2(distance),
            intensity,
        })
    }

    /// Speed in the integrator's velocity unit needed to escape from here
    pub fn launch_escape_speed(&self) -> f64 {
        self.escape_speed * self.unit_scale
    }

    /// Speed of a circular orbit at this distance, integrator units
    pub fn launch_circular_speed(&self) -> f64 {
        let kinetic = -self.potential_energy / 2.0;
        (2.0 * kinetic / self.body_mass).sqrt() * self.unit_scale
    }

    /// Rotate a polar `(radial, tangential)` velocity into field coordinates
    pub fn to_field(&self, polar: DVec2) -> DVec2 {
        let radial = DVec2::from_angle(self.bearing);
        radial * polar.x + radial.perp() * polar.y
    }

    /// Split a field velocity into `(radial, tangential)`
    pub fn to_polar(&self, velocity: DVec2) -> DVec2 {
        let radial = DVec2::from_angle(self.bearing);
        DVec2::new(velocity.dot(radial), velocity.dot(radial.perp()))
    }
}

fn polar(speed: f64, angle: f64) -> DVec2 {
    DVec2::new(speed * angle.cos(), speed * angle.sin())
}

/// Computes launch velocities for bodies before their cell starts playing.
///
/// Gravity is read from the shared constants on every launch, so a shot
/// fired after a live change is measured against the new field.
#[derive(Debug, Clone)]
pub struct TrajectorySynthesizer {
    constants: SharedConstants,
    pub bounds: WorldBounds,
    pub min_ellipse_radius: f64,
}

impl TrajectorySynthesizer {
    /// Synthesizer over a private, fixed set of constants
    pub fn new(constants: PhysicsConstants, bounds: WorldBounds) -> Self {
        Self::sharing(SharedConstants::new(constants), bounds)
    }

    pub fn sharing(constants: SharedConstants, bounds: WorldBounds) -> Self {
        Self {
            constants,
            bounds,
            min_ellipse_radius: DEFAULT_MIN_ELLIPSE_RADIUS,
        }
    }

    /// Constants the next launch will use
    pub fn constants(&self) -> PhysicsConstants {
        self.constants.snapshot()
    }

    pub fn shared_constants(&self) -> &SharedConstants {
        &self.constants
    }

    pub fn with_min_ellipse_radius(mut self, radius: f64) -> Self {
        self.min_ellipse_radius = radius;
        self
    }

    /// Same as [`synthesize`](Self::synthesize), with the shot class given by name.
    /// An unknown name leaves the body untouched.
    pub fn synthesize_named(
        &self,
        body: &mut Body,
        attractor: &Body,
        shot: &str,
        rng: &mut dyn RandomSource,
    ) -> EngineResult<DVec2> {
        let shot = shot.parse::<ShotClass>()?;
        Ok(self.synthesize(body, attractor, shot, rng))
    }

    /// Compute and install the launch velocity for `shot`.
    ///
    /// Sets both the live and the initial velocity and the body's `free`
    /// flag. If the geometry is degenerate the body is left at rest and
    /// damped instead.
    pub fn synthesize(
        &self,
        body: &mut Body,
        attractor: &Body,
        shot: ShotClass,
        rng: &mut dyn RandomSource,
    ) -> DVec2 {
        let constants = self.constants.snapshot();
        let Some(q) = OrbitalQuantities::measure(body, attractor, &constants, &self.bounds) else {
            log::warn!("cannot launch body {:?}: degenerate geometry", body.id);
            body.flags.free = false;
            body.set_launch_velocity(DVec2::ZERO);
            return DVec2::ZERO;
        };

        let (free, polar_velocity) = match shot {
            ShotClass::HardCollision => (false, self.hard_collision(&q, rng)),
            ShotClass::SoftCollision => (false, self.soft_collision(&q, rng)),
            ShotClass::Hyperbolic => (true, self.hyperbolic(&q, rng)),
            ShotClass::Parabolic => (true, self.parabolic(&q, rng)),
            ShotClass::Elliptical => (true, self.elliptical(&q, body, attractor, rng)),
            ShotClass::Circular => (true, self.circular(&q, rng)),
            ShotClass::FreeFall => (false, DVec2::ZERO),
        };

        let velocity = q.to_field(polar_velocity);
        if !velocity.is_finite() {
            log::warn!("launch of body {:?} as {shot} produced {velocity}", body.id);
            body.flags.free = false;
            body.set_launch_velocity(DVec2::ZERO);
            return DVec2::ZERO;
        }

        crate::debug_print!(
            "launch {:?} as {shot}: r={:.1} v={:.3e} free={free}",
            body.id,
            q.distance,
            velocity.length()
        );

        body.flags.free = free;
        body.set_launch_velocity(velocity);
        velocity
    }

    /// Fast and inside the cone of certain collision
    fn hard_collision(&self, q: &OrbitalQuantities, rng: &mut dyn RandomSource) -> DVec2 {
        let speed = 2.0 * q.launch_escape_speed() / (q.intensity + 0.7);
        let sign = rng.next_sign();
        let angle = sign * q.theta * 0.9 * rng.next_unit();
        polar(speed, angle)
    }

    /// Slower, aimed anywhere in the half plane facing the attractor
    fn soft_collision(&self, q: &OrbitalQuantities, rng: &mut dyn RandomSource) -> DVec2 {
        let gamma = PI * rng.next_unit() - FRAC_PI_2;
        let kinetic = -q.potential_energy / 4.0;
        // wide angles are slowed down so they still come back in early
        let angular_correction = 1.0 - gamma.abs() / PI;
        let speed = q.intensity
            * angular_correction
            * 0.99
            * (2.0 * kinetic / q.body_mass).sqrt()
            * q.unit_scale;
        polar(speed.min(0.9 * q.launch_escape_speed()), gamma)
    }

    /// Above escape speed, grazing past the edge of the collision cone.
    /// Aimed tangentially and tilted outward by θ/2 rather than just inside
    /// the cone, so light attractors cannot turn the body back.
    fn hyperbolic(&self, q: &OrbitalQuantities, rng: &mut dyn RandomSource) -> DVec2 {
        let speed = q.launch_escape_speed() * (1.1 + 0.2 * q.intensity);
        let sign = rng.next_sign();
        let angle = sign * (FRAC_PI_2 + q.theta * 0.5);
        polar(speed, angle)
    }

    /// Around escape speed, grazing with some jitter. Tilted outward like
    /// the hyperbolic shot.
    fn parabolic(&self, q: &OrbitalQuantities, rng: &mut dyn RandomSource) -> DVec2 {
        let speed = q.launch_escape_speed() * (1.0 + q.intensity / 5.0);
        let sign = rng.next_sign();
        let jitter = q.theta * 0.5 * rng.next_unit() + PI / 32.0;
        polar(speed, sign * (FRAC_PI_2 + jitter))
    }

    /// Tangential launch below circular speed: the body starts at apoapsis
    /// and its periapsis stays clear of the attractor.
    fn elliptical(
        &self,
        q: &OrbitalQuantities,
        body: &Body,
        attractor: &Body,
        rng: &mut dyn RandomSource,
    ) -> DVec2 {
        if q.distance < self.min_ellipse_radius {
            return self.circular(q, rng);
        }

        let clearance = attractor.radius() + body.radius();
        let max_eccentricity = ((q.distance - clearance) / (q.distance + clearance)).max(0.0);
        let eccentricity = max_eccentricity * (0.25 + 0.5 * rng.next_unit());

        // vis-viva at apoapsis with a = r / (1 + e)
        let kinetic = -q.potential_energy / 2.0 * (1.0 - eccentricity);
        let speed = (2.0 * kinetic / q.body_mass).sqrt() * q.unit_scale;
        DVec2::new(0.0, rng.next_sign() * speed)
    }

    /// Exactly tangential at circular speed
    fn circular(&self, q: &OrbitalQuantities, rng: &mut dyn RandomSource) -> DVec2 {
        DVec2::new(0.0, rng.next_sign() * q.launch_circular_speed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::physics::body::ATTRACTOR_RADIUS;
    use approx::assert_relative_eq;

    fn setup(x: f64, y: f64) -> (TrajectorySynthesizer, Body, Body) {
        let synthesizer = TrajectorySynthesizer::new(PhysicsConstants::default(), WorldBounds::default());
        let attractor = Body::attractor(DVec2::ZERO, ATTRACTOR_RADIUS);
        let body = Body::new(x, y, 0.0, 0.0, 20.0, Some("#fff"));
        (synthesizer, body, attractor)
    }

    #[test]
    fn shot_names_parse() {
        for shot in ShotClass::ALL {
            assert_eq!(shot.name().parse::<ShotClass>().unwrap(), shot);
        }
        assert!(matches!(
            "orbit".parse::<ShotClass>(),
            Err(EngineError::UnknownShotClass(name)) if name == "orbit"
        ));
    }

    #[test]
    fn unknown_shot_leaves_body_untouched() {
        let (synthesizer, mut body, attractor) = setup(150.0, 0.0);
        body.set_launch_velocity(DVec2::new(1.0, 2.0));
        let mut rng = ScriptedSource::new(vec![0.3]);

        let result = synthesizer.synthesize_named(&mut body, &attractor, "slingshot", &mut rng);
        assert!(result.is_err());
        assert_eq!(body.velocity, DVec2::new(1.0, 2.0));
        assert!(!body.flags.free);
    }

    #[test]
    fn free_fall_is_at_rest_and_damped() {
        let (synthesizer, mut body, attractor) = setup(150.0, 80.0);
        body.flags.free = true;
        body.set_launch_velocity(DVec2::new(5.0, 5.0));
        let mut rng = RngSource::seeded(7);

        let v = synthesizer.synthesize(&mut body, &attractor, ShotClass::FreeFall, &mut rng);
        assert_eq!(v, DVec2::ZERO);
        assert_eq!(body.velocity, DVec2::ZERO);
        assert_eq!(body.initial_velocity, DVec2::ZERO);
        assert!(!body.flags.free);
    }

    #[test]
    fn circular_launch_is_perpendicular_to_bearing() {
        for seed in 0..16 {
            let (synthesizer, mut body, attractor) = setup(-120.0, 170.0);
            let mut rng = RngSource::seeded(seed);
            let v = synthesizer.synthesize(&mut body, &attractor, ShotClass::Circular, &mut rng);

            let bearing = (attractor.position - body.position).normalize();
            assert!(v.normalize().dot(bearing).abs() < 1e-9);
            assert!(body.flags.free);
            assert_eq!(body.initial_velocity, v);
        }
    }

    #[test]
    fn circular_speed_balances_gravity() {
        let (synthesizer, mut body, attractor) = setup(200.0, 0.0);
        let mut rng = ScriptedSource::new(vec![0.1]);
        let v = synthesizer.synthesize(&mut body, &attractor, ShotClass::Circular, &mut rng);

        // centripetal requirement in position units per tick
        let constants = PhysicsConstants::default();
        let position_speed = v.length() * constants.velocity_scale;
        let pull = constants.g * attractor.mass() / (200.0 * 200.0) * constants.velocity_scale;
        assert_relative_eq!(position_speed * position_speed / 200.0, pull, max_relative = 1e-9);
    }

    #[test]
    fn scripted_draws_give_exact_vectors() {
        let (synthesizer, mut body, attractor) = setup(300.0, 0.0);
        // sign draw 0.2 -> counter-clockwise
        let mut rng = ScriptedSource::new(vec![0.2]);
        let v = synthesizer.synthesize(&mut body, &attractor, ShotClass::Circular, &mut rng);

        let q = OrbitalQuantities::measure(&body, &attractor, &synthesizer.constants(), &synthesizer.bounds)
            .unwrap();
        // bearing points toward -x, its left-hand normal is -y
        assert_relative_eq!(v.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(v.y, -q.launch_circular_speed(), max_relative = 1e-12);
    }

    #[test]
    fn hard_collision_aims_inside_the_cone() {
        for seed in 0..32 {
            let (synthesizer, mut body, attractor) = setup(0.0, 250.0);
            let mut rng = RngSource::seeded(seed);
            synthesizer.synthesize(&mut body, &attractor, ShotClass::HardCollision, &mut rng);

            let q = OrbitalQuantities::measure(&body, &attractor, &synthesizer.constants(), &synthesizer.bounds)
                .unwrap();
            let p = q.to_polar(body.velocity);
            let angle = p.y.atan2(p.x);
            assert!(p.x > 0.0, "must head toward the attractor");
            assert!(angle.abs() <= q.theta);
            assert!(!body.flags.free);
            assert!(body.velocity.length() > q.launch_escape_speed());
        }
    }

    #[test]
    fn soft_collision_stays_below_escape() {
        for seed in 0..32 {
            let (synthesizer, mut body, attractor) = setup(90.0, -90.0);
            let mut rng = RngSource::seeded(seed);
            synthesizer.synthesize(&mut body, &attractor, ShotClass::SoftCollision, &mut rng);

            let q = OrbitalQuantities::measure(&body, &attractor, &synthesizer.constants(), &synthesizer.bounds)
                .unwrap();
            assert!(body.velocity.length() <= 0.9 * q.launch_escape_speed() + 1e-9);
            assert!(q.to_polar(body.velocity).x >= -1e-9);
            assert!(!body.flags.free);
        }
    }

    #[test]
    fn open_orbits_reach_escape_speed() {
        for shot in [ShotClass::Hyperbolic, ShotClass::Parabolic] {
            let (synthesizer, mut body, attractor) = setup(180.0, 40.0);
            let mut rng = RngSource::seeded(3);
            synthesizer.synthesize(&mut body, &attractor, shot, &mut rng);

            let q = OrbitalQuantities::measure(&body, &attractor, &synthesizer.constants(), &synthesizer.bounds)
                .unwrap();
            assert!(body.velocity.length() >= q.launch_escape_speed());
            assert!(body.flags.free);
        }
    }

    #[test]
    fn ellipse_is_bound_and_tangential() {
        let (synthesizer, mut body, attractor) = setup(250.0, 0.0);
        let mut rng = ScriptedSource::new(vec![0.5, 0.9]);
        let v = synthesizer.synthesize(&mut body, &attractor, ShotClass::Elliptical, &mut rng);

        let q = OrbitalQuantities::measure(&body, &attractor, &synthesizer.constants(), &synthesizer.bounds)
            .unwrap();
        assert!(v.length() < q.launch_circular_speed());
        assert!(v.length() > 0.0);
        assert_relative_eq!(v.x, 0.0, epsilon = 1e-9);
        assert!(body.flags.free);
    }

    #[test]
    fn close_ellipse_falls_back_to_circle() {
        let (synthesizer, mut body, attractor) = setup(120.0, 0.0);
        let mut rng = ScriptedSource::new(vec![0.1]);
        let v = synthesizer.synthesize(&mut body, &attractor, ShotClass::Elliptical, &mut rng);

        let q = OrbitalQuantities::measure(&body, &attractor, &synthesizer.constants(), &synthesizer.bounds)
            .unwrap();
        assert_relative_eq!(v.length(), q.launch_circular_speed(), max_relative = 1e-12);
    }

    #[test]
    fn degenerate_geometry_fails_closed() {
        let (synthesizer, mut body, attractor) = setup(0.0, 0.0);
        body.flags.free = true;
        let mut rng = RngSource::seeded(1);

        let v = synthesizer.synthesize(&mut body, &attractor, ShotClass::Hyperbolic, &mut rng);
        assert_eq!(v, DVec2::ZERO);
        assert_eq!(body.velocity, DVec2::ZERO);
        assert!(!body.flags.free);
    }

    #[test]
    fn zero_gravity_fails_closed() {
        let synthesizer =
            TrajectorySynthesizer::new(PhysicsConstants::new(0.0, 0.002), WorldBounds::default());
        let attractor = Body::attractor(DVec2::ZERO, ATTRACTOR_RADIUS);
        let mut body = Body::new(150.0, 0.0, 0.0, 0.0, 20.0, None);
        let mut rng = RngSource::seeded(1);

        let v = synthesizer.synthesize(&mut body, &attractor, ShotClass::Circular, &mut rng);
        assert_eq!(v, DVec2::ZERO);
        assert!(!body.flags.free);
    }

    #[test]
    fn launch_follows_a_live_gravity_change() {
        let shared = SharedConstants::new(PhysicsConstants::default());
        let synthesizer = TrajectorySynthesizer::sharing(shared.clone(), WorldBounds::default());
        let attractor = Body::attractor(DVec2::ZERO, ATTRACTOR_RADIUS);
        let mut before = Body::new(200.0, 0.0, 0.0, 0.0, 20.0, None);
        let mut after = Body::new(200.0, 0.0, 0.0, 0.0, 20.0, None);
        let mut rng = ScriptedSource::new(vec![0.6]);

        let slow = synthesizer.synthesize(&mut before, &attractor, ShotClass::Hyperbolic, &mut rng);
        shared.set_multipliers(4.0, 1.0);
        let fast = synthesizer.synthesize(&mut after, &attractor, ShotClass::Hyperbolic, &mut rng);

        let q = OrbitalQuantities::measure(&after, &attractor, &shared.snapshot(), &synthesizer.bounds)
            .unwrap();
        assert!(fast.length() >= q.launch_escape_speed());
        assert_relative_eq!(fast.length(), 2.0 * slow.length(), max_relative = 1e-9);
    }

    #[test]
    fn intensity_is_one_near_the_attractor_and_zero_at_the_edge() {
        let (synthesizer, body, attractor) = setup(500.0, 0.0);
        let q = OrbitalQuantities::measure(&body, &attractor, &synthesizer.constants(), &synthesizer.bounds)
            .unwrap();
        assert_eq!(q.intensity, 0.0);

        let near = Body::new(1.0, 0.0, 0.0, 0.0, 20.0, None);
        let q = OrbitalQuantities::measure(&near, &attractor, &synthesizer.constants(), &synthesizer.bounds)
            .unwrap();
        assert!(q.intensity > 0.99 && q.intensity < 1.0);
    }
}
