//! Exported initial configuration of bodies, cells and the grid.
//!
//! Only what a new run starts from is saved: initial position and velocity,
//! never the live state. Sound modules travel as opaque descriptors and are
//! rebuilt through a caller supplied factory.

use std::fs;
use std::path::Path;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::physics::body::{Body, BodyFlags, BODY_DENSITY};
use crate::engine::physics::cell::Cell;
use crate::engine::scheduler::{Grid, Sequence, TimeDivision};
use crate::engine::sound::{module_from_descriptor, SoundDescriptor, SoundModule};

fn default_density() -> f64 {
    BODY_DENSITY
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyState {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub radius: f64,
    #[serde(default = "default_density")]
    pub density: f64,
    pub color: String,
    pub note: String,
    pub sound: SoundDescriptor,
    pub flags: BodyFlags,
}

impl BodyState {
    fn validate(&self) -> EngineResult<()> {
        let finite = [self.x, self.y, self.vx, self.vy]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(EngineError::InvalidBodyState(
                "position and velocity must be finite".to_string(),
            ));
        }
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(EngineError::InvalidBodyState(format!(
                "radius {} must be positive",
                self.radius
            )));
        }
        if !(self.density.is_finite() && self.density > 0.0) {
            return Err(EngineError::InvalidBodyState(format!(
                "density {} must be positive",
                self.density
            )));
        }
        Ok(())
    }
}

impl Body {
    pub fn export_state(&self) -> BodyState {
        BodyState {
            x: self.initial_position.x,
            y: self.initial_position.y,
            vx: self.initial_velocity.x,
            vy: self.initial_velocity.y,
            radius: self.radius(),
            density: self.density(),
            color: self.color.clone(),
            note: self.note.clone(),
            sound: self.sound().descriptor(),
            flags: self.flags,
        }
    }

    /// Rebuild an ordinary body at its initial state
    pub fn from_state(state: &BodyState, sound: Box<dyn SoundModule>) -> EngineResult<Self> {
        state.validate()?;
        Ok(
            Body::new(state.x, state.y, state.vx, state.vy, state.radius, Some(&state.color))
                .with_density(state.density)
                .with_note(&state.note)
                .with_flags(state.flags)
                .with_sound(sound),
        )
    }

    /// Rebuild an attractor. It stays fixed and solid whatever the state says.
    pub fn attractor_from_state(state: &BodyState, sound: Box<dyn SoundModule>) -> EngineResult<Self> {
        state.validate()?;
        let mut attractor = Body::attractor(DVec2::new(state.x, state.y), state.radius)
            .with_density(state.density)
            .with_note(&state.note)
            .with_sound(sound);
        attractor.color = state.color.clone();
        attractor.flags.muted = state.flags.muted;
        Ok(attractor)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellState {
    pub attractor: BodyState,
    pub bodies: Vec<BodyState>,
}

impl Cell {
    pub fn export_state(&self) -> CellState {
        CellState {
            attractor: self.attractor().export_state(),
            bodies: self.bodies().iter().map(Body::export_state).collect(),
        }
    }

    /// Rebuild a stopped cell. Ids are handed out again in saved order.
    pub fn from_state<F>(state: &CellState, sounds: &mut F) -> EngineResult<Self>
    where
        F: FnMut(&SoundDescriptor) -> EngineResult<Box<dyn SoundModule>>,
    {
        let attractor = Body::attractor_from_state(&state.attractor, sounds(&state.attractor.sound)?)?;
        let mut cell = Cell::with_attractor(attractor);
        for body in &state.bodies {
            cell.add_body(Body::from_state(body, sounds(&body.sound)?)?);
        }
        Ok(cell)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceState {
    pub cells: Vec<CellState>,
    /// `"num/den"`; the numerator always equals the number of cells
    pub time_division: String,
}

fn parse_time_division(division: &str) -> EngineResult<TimeDivision> {
    let invalid = || EngineError::InvalidTimeDivision(division.to_string());
    let (numerator, denominator) = division.split_once('/').ok_or_else(invalid)?;
    let numerator = numerator.trim().parse::<usize>().map_err(|_| invalid())?;
    match denominator.trim().parse::<u32>() {
        Ok(denominator) if denominator > 0 => Ok(TimeDivision {
            numerator,
            denominator,
        }),
        _ => Err(invalid()),
    }
}

impl Sequence {
    pub fn export_state(&self) -> SequenceState {
        SequenceState {
            cells: self.cells().iter().map(Cell::export_state).collect(),
            time_division: self.time_division().to_string(),
        }
    }

    pub fn from_state<F>(state: &SequenceState, sounds: &mut F) -> EngineResult<Self>
    where
        F: FnMut(&SoundDescriptor) -> EngineResult<Box<dyn SoundModule>>,
    {
        let division = parse_time_division(&state.time_division)?;
        if division.numerator != state.cells.len() {
            log::warn!(
                "time division {} does not match {} cells",
                state.time_division,
                state.cells.len()
            );
            return Err(EngineError::InvalidTimeDivision(state.time_division.clone()));
        }
        let cells = state
            .cells
            .iter()
            .map(|cell| Cell::from_state(cell, sounds))
            .collect::<EngineResult<Vec<_>>>()?;
        Ok(Sequence::from_parts(cells, division.denominator))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridState {
    pub sequences: Vec<SequenceState>,
}

impl GridState {
    pub fn from_yaml_str(yaml: &str) -> EngineResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn to_yaml_string(&self) -> EngineResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> EngineResult<()> {
        fs::write(path, self.to_yaml_string()?)?;
        Ok(())
    }
}

impl Grid {
    pub fn export_state(&self) -> GridState {
        GridState {
            sequences: self.sequences().iter().map(Sequence::export_state).collect(),
        }
    }

    pub fn from_state<F>(state: &GridState, sounds: &mut F) -> EngineResult<Self>
    where
        F: FnMut(&SoundDescriptor) -> EngineResult<Box<dyn SoundModule>>,
    {
        let sequences = state
            .sequences
            .iter()
            .map(|sequence| Sequence::from_state(sequence, sounds))
            .collect::<EngineResult<Vec<_>>>()?;
        Ok(Grid::new(sequences))
    }

    /// Rebuild using only the engine's built-in sound modules
    pub fn from_state_builtin(state: &GridState) -> EngineResult<Self> {
        Self::from_state(state, &mut module_from_descriptor)
    }
}
