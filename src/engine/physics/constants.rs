use std::sync::{Arc, PoisonError, RwLock};

/// Default gravitational constant of the sandbox.
pub const DEFAULT_G: f64 = 6.67e-8;

/// Default per-tick friction coefficient.
pub const DEFAULT_FRICTION: f64 = 0.2e-2;

/// Converts the internal velocity unit to position units per tick.
pub const DEFAULT_VELOCITY_SCALE: f64 = 7e-6;

/// Physical constants read by every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsConstants {
    /// Gravitational constant
    pub g: f64,
    /// Fraction of velocity removed each tick from damped bodies
    pub friction: f64,
    /// Position advance per tick for a unit velocity
    pub velocity_scale: f64,
}

impl Default for PhysicsConstants {
    fn default() -> Self {
        Self {
            g: DEFAULT_G,
            friction: DEFAULT_FRICTION,
            velocity_scale: DEFAULT_VELOCITY_SCALE,
        }
    }
}

impl PhysicsConstants {
    pub fn new(g: f64, friction: f64) -> Self {
        Self {
            g,
            friction,
            ..Self::default()
        }
    }

    /// Build constants from the user-facing multipliers of the defaults.
    pub fn with_multipliers(g_multiplier: f64, friction_multiplier: f64) -> Self {
        Self::new(DEFAULT_G * g_multiplier, DEFAULT_FRICTION * friction_multiplier)
    }

    pub fn with_velocity_scale(mut self, velocity_scale: f64) -> Self {
        self.velocity_scale = velocity_scale;
        self
    }

    pub fn g_multiplier(&self) -> f64 {
        self.g / DEFAULT_G
    }

    pub fn friction_multiplier(&self) -> f64 {
        self.friction / DEFAULT_FRICTION
    }
}

/// Process-wide handle on the live constants.
///
/// Cloning shares the same value. Schedulers take a [`snapshot`] at the start
/// of each tick so a replacement lands on the very next tick.
///
/// [`snapshot`]: SharedConstants::snapshot
#[derive(Debug, Clone, Default)]
pub struct SharedConstants {
    inner: Arc<RwLock<PhysicsConstants>>,
}

impl SharedConstants {
    pub fn new(constants: PhysicsConstants) -> Self {
        Self {
            inner: Arc::new(RwLock::new(constants)),
        }
    }

    pub fn snapshot(&self) -> PhysicsConstants {
        *self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn replace(&self, constants: PhysicsConstants) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = constants;
    }

    pub fn set_multipliers(&self, g_multiplier: f64, friction_multiplier: f64) {
        let velocity_scale = self.snapshot().velocity_scale;
        self.replace(
            PhysicsConstants::with_multipliers(g_multiplier, friction_multiplier)
                .with_velocity_scale(velocity_scale),
        );
    }
}
