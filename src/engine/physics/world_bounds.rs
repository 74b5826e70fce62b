use glam::DVec2;

/// Rectangular play field of a cell, in cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldBounds {
    pub min: DVec2,
    pub max: DVec2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundsBehavior {
    /// Bodies may leave the field
    #[default]
    Ignore,
    /// Invert the velocity component that pushes a body past an edge
    Reflect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoundsViolation {
    pub x: bool,
    pub y: bool,
}

impl BoundsViolation {
    pub fn any(&self) -> bool {
        self.x || self.y
    }
}

impl WorldBounds {
    /// Field of the given size centered on the origin
    pub fn centered(width: f64, height: f64) -> Self {
        let half = DVec2::new(width, height) * 0.5;
        Self {
            min: -half,
            max: half,
        }
    }

    pub fn size(&self) -> DVec2 {
        self.max - self.min
    }

    /// Half of the field diagonal; the farthest a body can sit from the center
    pub fn half_diagonal(&self) -> f64 {
        self.size().length() * 0.5
    }

    /// Which axes a circle of `radius` at `position` sticks out of
    pub fn violation(&self, position: DVec2, radius: f64) -> BoundsViolation {
        BoundsViolation {
            x: position.x - radius < self.min.x || position.x + radius > self.max.x,
            y: position.y - radius < self.min.y || position.y + radius > self.max.y,
        }
    }
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self::centered(800.0, 600.0)
    }
}
