use std::f64::consts::PI;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::engine::sound::{SilentModule, SoundModule};
use crate::engine::trajectory::RandomSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub u32);

impl BodyId {
    /// Every cell's attractor carries this id; placed bodies count up from 1.
    pub const ATTRACTOR: BodyId = BodyId(0);
}

/// Standard density of a placed body
pub const BODY_DENSITY: f64 = 10e1;
/// Standard density of an attractor
pub const ATTRACTOR_DENSITY: f64 = 10e10;
pub const ATTRACTOR_RADIUS: f64 = 50.0;
pub const DEFAULT_NOTE: &str = "C3";
/// Smallest radius a body can have
pub const MIN_RADIUS: f64 = 1e-3;
/// Distance from the attractor that maps to a hard left/right pan
pub const MAX_PAN_DISTANCE: f64 = 200.0;

pub const BODY_COLORS: [&str; 9] = [
    "#55828B", "#E3655B", "#F0A202", "#46237A", "#3BAA4C", "#B79FAD", "#56A05B", "#F39B6D",
    "#6F5060",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// A movable body placed by the user
    Ordinary,
    /// The fixed, solid center of a cell that pulls on every other body
    Attractor,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyFlags {
    /// Takes part in collisions
    pub solid: bool,
    /// Never moves and acts as a reflecting obstacle
    pub fixed: bool,
    /// Exempt from friction
    pub free: bool,
    /// Collision hits are silent
    pub muted: bool,
    /// Fires its note at the start of every run of its cell
    pub step_triggered: bool,
}

#[derive(Debug)]
pub struct Body {
    pub id: BodyId,
    pub kind: BodyKind,

    pub position: DVec2,
    pub velocity: DVec2,
    pub initial_position: DVec2,
    pub initial_velocity: DVec2,

    radius: f64,
    density: f64,

    pub flags: BodyFlags,
    pub note: String,
    pub color: String,

    sound: Box<dyn SoundModule>,

    // Set while the body overlaps a fixed partner
    pub(crate) in_contact: bool,
}

impl Body {
    /// Create an ordinary body. Without a color one is drawn from the palette.
    pub fn new(x: f64, y: f64, vx: f64, vy: f64, radius: f64, color: Option<&str>) -> Self {
        let color = match color {
            Some(c) => c.to_string(),
            None => BODY_COLORS[rand::random_range(0..BODY_COLORS.len())].to_string(),
        };
        let position = DVec2::new(x, y);
        let velocity = DVec2::new(vx, vy);

        Self {
            id: BodyId(0),
            kind: BodyKind::Ordinary,
            position,
            velocity,
            initial_position: position,
            initial_velocity: velocity,
            radius: radius.max(MIN_RADIUS),
            density: BODY_DENSITY,
            flags: BodyFlags::default(),
            note: DEFAULT_NOTE.to_string(),
            color,
            sound: Box::new(SilentModule),
            in_contact: false,
        }
    }

    /// Create the attractor of a cell
    pub fn attractor(position: DVec2, radius: f64) -> Self {
        let mut body = Self::new(position.x, position.y, 0.0, 0.0, radius, Some("#000"));
        body.id = BodyId::ATTRACTOR;
        body.kind = BodyKind::Attractor;
        body.density = ATTRACTOR_DENSITY;
        body.flags.solid = true;
        body.flags.fixed = true;
        body
    }

    /// Radius for a freshly placed body: a whole number in [15, 25]
    pub fn random_radius(rng: &mut dyn RandomSource) -> f64 {
        (rng.next_unit() * 10.0).round() + 15.0
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn density(&self) -> f64 {
        self.density
    }

    pub fn set_radius(&mut self, radius: f64) {
        self.radius = radius.max(MIN_RADIUS);
    }

    pub fn set_density(&mut self, density: f64) {
        self.density = density.max(f64::MIN_POSITIVE);
    }

    pub fn mass(&self) -> f64 {
        self.density * PI * self.radius * self.radius
    }

    pub fn is_attractor(&self) -> bool {
        self.kind == BodyKind::Attractor
    }

    pub fn is_fixed(&self) -> bool {
        self.flags.fixed
    }

    pub fn is_solid(&self) -> bool {
        self.flags.solid
    }

    /// Place the body, both now and for every future run
    pub fn set_position(&mut self, position: DVec2) {
        self.initial_position = position;
        self.position = position;
    }

    /// Launch velocity, both now and for every future run
    pub fn set_launch_velocity(&mut self, velocity: DVec2) {
        self.initial_velocity = velocity;
        self.velocity = velocity;
    }

    /// Restore position and velocity to their initial values
    pub fn reset(&mut self) {
        self.position = self.initial_position;
        self.velocity = self.initial_velocity;
        self.in_contact = false;
    }

    pub fn kinetic_energy(&self) -> f64 {
        if self.flags.fixed {
            0.0
        } else {
            0.5 * self.mass() * self.velocity.length_squared()
        }
    }

    pub fn distance_to(&self, other: &Body) -> f64 {
        self.position.distance(other.position)
    }

    /// Trigger a note on the sound module unless muted
    pub fn play(&mut self, note: &str) {
        if !self.flags.muted {
            self.sound.trigger_note(note);
        }
    }

    /// Trigger this body's own note
    pub fn play_own_note(&mut self) {
        let note = self.note.clone();
        self.play(&note);
    }

    /// Forward the pan derived from the horizontal offset to `center`
    pub fn update_pan(&mut self, center: DVec2) {
        let pan = ((self.position.x - center.x) / MAX_PAN_DISTANCE).clamp(-1.0, 1.0);
        self.sound.set_pan(pan);
    }

    /// Forward distance and angle to `center` to the sound module
    pub fn update_sound_module(&mut self, center: DVec2) {
        let offset = self.position - center;
        let distance = offset.length();
        let initial_distance = self.initial_position.distance(center);
        let angle = offset.y.atan2(offset.x);
        self.sound.update(distance, initial_distance, angle);
    }

    pub fn sound(&self) -> &dyn SoundModule {
        self.sound.as_ref()
    }

    pub fn set_sound(&mut self, sound: Box<dyn SoundModule>) {
        self.sound = sound;
    }

    /// Pull every target toward this body.
    ///
    /// Only an attractor exerts force; for any other body this is a no-op.
    /// Fixed targets are left alone.
    pub fn apply_force_to_targets(&self, targets: &mut [Body], g: f64) {
        if !self.is_attractor() {
            return;
        }
        let mass = self.mass();
        for target in targets.iter_mut().filter(|t| !t.flags.fixed) {
            target.velocity += crate::engine::physics::gravity::velocity_change(
                self.position,
                mass,
                target.position,
                g,
            );
        }
    }
}

/// Builder pattern for useful properties
impl Body {
    pub fn with_density(mut self, density: f64) -> Self {
        self.set_density(density);
        self
    }

    pub fn with_note(mut self, note: &str) -> Self {
        self.note = note.to_string();
        self
    }

    pub fn with_sound(mut self, sound: Box<dyn SoundModule>) -> Self {
        self.sound = sound;
        self
    }

    pub fn with_flags(mut self, flags: BodyFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_solid(mut self, solid: bool) -> Self {
        self.flags.solid = solid;
        self
    }

    pub fn with_fixed(mut self, fixed: bool) -> Self {
        self.flags.fixed = fixed;
        self
    }

    pub fn with_muted(mut self, muted: bool) -> Self {
        self.flags.muted = muted;
        self
    }

    pub fn with_step_triggered(mut self, step_triggered: bool) -> Self {
        self.flags.step_triggered = step_triggered;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::sound::RecordingModule;
    use crate::engine::trajectory::ScriptedSource;

    #[test]
    fn mass_grows_with_radius() {
        let small = Body::new(0.0, 0.0, 0.0, 0.0, 10.0, None);
        let large = Body::new(0.0, 0.0, 0.0, 0.0, 10.5, None);
        assert!(large.mass() > small.mass());
        assert!(small.mass() > 0.0);
    }

    #[test]
    fn radius_never_reaches_zero() {
        let body = Body::new(0.0, 0.0, 0.0, 0.0, 0.0, Some("#fff"));
        assert!(body.radius() > 0.0);
        assert!(body.mass() > 0.0);
    }

    #[test]
    fn attractor_is_fixed_and_solid() {
        let attractor = Body::attractor(DVec2::ZERO, ATTRACTOR_RADIUS);
        assert!(attractor.is_fixed());
        assert!(attractor.is_solid());
        assert_eq!(attractor.id, BodyId::ATTRACTOR);
        assert!(attractor.mass() > Body::new(0.0, 0.0, 0.0, 0.0, 50.0, None).mass());
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut body = Body::new(10.0, 20.0, 1.0, 2.0, 15.0, None);
        body.position = DVec2::new(-5.0, 3.0);
        body.velocity = DVec2::ZERO;
        body.reset();
        assert_eq!(body.position, DVec2::new(10.0, 20.0));
        assert_eq!(body.velocity, DVec2::new(1.0, 2.0));
    }

    #[test]
    fn muted_body_stays_silent() {
        let (module, log) = RecordingModule::new();
        let mut body = Body::new(0.0, 0.0, 0.0, 0.0, 15.0, None)
            .with_sound(Box::new(module))
            .with_muted(true);
        body.play_own_note();
        assert_eq!(log.note_count(), 0);

        body.flags.muted = false;
        body.play_own_note();
        assert_eq!(log.notes(), vec![DEFAULT_NOTE.to_string()]);
    }

    #[test]
    fn pan_is_clamped() {
        let (module, log) = RecordingModule::new();
        let mut body = Body::new(500.0, 0.0, 0.0, 0.0, 15.0, None).with_sound(Box::new(module));
        body.update_pan(DVec2::ZERO);
        assert_eq!(log.last_pan(), Some(1.0));
    }

    #[test]
    fn random_radius_spans_fifteen_to_twenty_five() {
        let mut rng = ScriptedSource::new(vec![0.0, 0.999]);
        assert_eq!(Body::random_radius(&mut rng), 15.0);
        assert_eq!(Body::random_radius(&mut rng), 25.0);
    }

    #[test]
    fn ordinary_body_exerts_no_force() {
        let body = Body::new(0.0, 0.0, 0.0, 0.0, 50.0, None);
        let mut targets = vec![Body::new(100.0, 0.0, 0.0, 0.0, 10.0, None)];
        body.apply_force_to_targets(&mut targets, 1.0);
        assert_eq!(targets[0].velocity, DVec2::ZERO);
    }
}
