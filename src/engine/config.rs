//! Engine settings, loadable from YAML.
//!
//! ```yaml
//! physics:
//!   g_multiplier: 1.0        # relative to the default gravitational constant
//!   friction_multiplier: 1.0 # relative to the default friction
//! field:
//!   width: 800.0
//!   height: 600.0
//!   bounce_on_edges: false
//! timing:
//!   physics_tick_ms: 5.0
//!   modulation_tick_ms: 150.0
//!   bpm: 70.0
//! collision:
//!   contact_latch: true
//! trajectory:
//!   min_ellipse_radius: 192.0
//! seed: 42                   # optional, fixes every random draw
//! ```
//!
//! Every section and every field may be left out.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::collision::CollisionResolver;
use crate::engine::error::EngineResult;
use crate::engine::physics::constants::{PhysicsConstants, SharedConstants};
use crate::engine::physics::world_bounds::{BoundsBehavior, WorldBounds};
use crate::engine::scheduler::{
    CellScheduler, GridScheduler, TickClock, DEFAULT_BPM, DEFAULT_MODULATION_TICK_MS,
    DEFAULT_PHYSICS_TICK_MS,
};
use crate::engine::trajectory::{RandomSource, RngSource, TrajectorySynthesizer, DEFAULT_MIN_ELLIPSE_RADIUS};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub g_multiplier: f64,
    pub friction_multiplier: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            g_multiplier: 1.0,
            friction_multiplier: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    pub width: f64,
    pub height: f64,
    pub bounce_on_edges: bool,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            bounce_on_edges: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub physics_tick_ms: f64,
    pub modulation_tick_ms: f64,
    pub bpm: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            physics_tick_ms: DEFAULT_PHYSICS_TICK_MS,
            modulation_tick_ms: DEFAULT_MODULATION_TICK_MS,
            bpm: DEFAULT_BPM,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    pub contact_latch: bool,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            contact_latch: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrajectoryConfig {
    pub min_ellipse_radius: f64,
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            min_ellipse_radius: DEFAULT_MIN_ELLIPSE_RADIUS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub physics: PhysicsConfig,
    pub field: FieldConfig,
    pub timing: TimingConfig,
    pub collision: CollisionConfig,
    pub trajectory: TrajectoryConfig,
    pub seed: Option<u64>,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml_str(yaml: &str) -> EngineResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&text)?;
        log::info!("loaded engine config from {}", path.display());
        Ok(config)
    }

    pub fn with_multipliers(mut self, g_multiplier: f64, friction_multiplier: f64) -> Self {
        self.physics = PhysicsConfig {
            g_multiplier,
            friction_multiplier,
        };
        self
    }

    pub fn with_field(mut self, width: f64, height: f64) -> Self {
        self.field.width = width;
        self.field.height = height;
        self
    }

    pub fn with_edge_bounce(mut self, enabled: bool) -> Self {
        self.field.bounce_on_edges = enabled;
        self
    }

    pub fn with_bpm(mut self, bpm: f64) -> Self {
        self.timing.bpm = bpm;
        self
    }

    pub fn with_contact_latch(mut self, enabled: bool) -> Self {
        self.collision.contact_latch = enabled;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn constants(&self) -> PhysicsConstants {
        PhysicsConstants::with_multipliers(self.physics.g_multiplier, self.physics.friction_multiplier)
    }

    pub fn bounds(&self) -> WorldBounds {
        WorldBounds::centered(self.field.width, self.field.height)
    }

    pub fn resolver(&self) -> CollisionResolver {
        let behavior = if self.field.bounce_on_edges {
            BoundsBehavior::Reflect
        } else {
            BoundsBehavior::Ignore
        };
        CollisionResolver::new()
            .with_bounds(self.bounds(), behavior)
            .with_contact_latch(self.collision.contact_latch)
    }

    /// Synthesizer reading its gravity from `shared` at every launch
    pub fn synthesizer(&self, shared: SharedConstants) -> TrajectorySynthesizer {
        TrajectorySynthesizer::sharing(shared, self.bounds())
            .with_min_ellipse_radius(self.trajectory.min_ellipse_radius)
    }

    /// Grid scheduler reading its constants from `shared`
    pub fn grid_scheduler(&self, shared: SharedConstants) -> GridScheduler {
        let clock = TickClock::new(self.timing.physics_tick_ms, self.timing.modulation_tick_ms);
        GridScheduler::new(CellScheduler::new(shared, self.resolver()), clock).with_bpm(self.timing.bpm)
    }

    /// Seeded when the config has a seed, otherwise drawn from the thread rng
    pub fn random_source(&self) -> Box<dyn RandomSource> {
        match self.seed {
            Some(seed) => Box::new(RngSource::seeded(seed)),
            None => Box::new(RngSource::thread()),
        }
    }
}
