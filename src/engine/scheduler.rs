//! Driving cells from the host's timers.
//!
//! The engine owns no threads. A host calls [`GridScheduler::advance`] with the
//! time that passed, or calls the tick methods itself from two periodic
//! callbacks plus the beat events of its own sequencer.

use std::fmt;

use crate::engine::collision::CollisionResolver;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::physics::cell::Cell;
use crate::engine::physics::constants::SharedConstants;

pub const DEFAULT_PHYSICS_TICK_MS: f64 = 5.0;
pub const DEFAULT_MODULATION_TICK_MS: f64 = 150.0;
pub const DEFAULT_BPM: f64 = 70.0;
pub const DEFAULT_DENOMINATOR: u32 = 4;

/// Upper bound on ticks of one kind per call to [`TickClock::advance`], so a
/// stalled host does not get a burst of thousands of ticks.
pub const MAX_TICKS_PER_ADVANCE: u32 = 200;

/// Duration of one step of a row divided into `1/denominator` notes.
pub fn step_interval_ms(bpm: f64, denominator: u32) -> f64 {
    240_000.0 / (bpm * denominator.max(1) as f64)
}

/// Drives the two tick kinds of a single cell.
///
/// Physics constants are read from the shared handle at the start of every
/// tick, so a replacement applies from the next tick on.
#[derive(Debug, Clone, Default)]
pub struct CellScheduler {
    constants: SharedConstants,
    resolver: CollisionResolver,
}

impl CellScheduler {
    pub fn new(constants: SharedConstants, resolver: CollisionResolver) -> Self {
        Self {
            constants,
            resolver,
        }
    }

    pub fn constants(&self) -> &SharedConstants {
        &self.constants
    }

    pub fn resolver(&self) -> &CollisionResolver {
        &self.resolver
    }

    pub fn play(&self, cell: &mut Cell) {
        cell.play();
    }

    pub fn stop(&self, cell: &mut Cell) {
        cell.stop();
    }

    pub fn tick_physics(&self, cell: &mut Cell) {
        let constants = self.constants.snapshot();
        cell.tick_physics(&constants, &self.resolver);
    }

    pub fn tick_modulation(&self, cell: &mut Cell) {
        cell.tick_modulation();
    }
}

/// Step length of a row, written `num/den`. The numerator is the number of
/// cells in the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeDivision {
    pub numerator: usize,
    pub denominator: u32,
}

impl fmt::Display for TimeDivision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// One row of the grid: cells played one after the other.
#[derive(Debug)]
pub struct Sequence {
    cells: Vec<Cell>,
    index: usize,
    time_division: TimeDivision,
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Sequence {
    /// Row over `cells`. An empty list gets one fresh cell.
    pub fn new(mut cells: Vec<Cell>) -> Self {
        if cells.is_empty() {
            cells.push(Cell::new());
        }
        let numerator = cells.len();
        Self {
            cells,
            index: 0,
            time_division: TimeDivision {
                numerator,
                denominator: DEFAULT_DENOMINATOR,
            },
        }
    }

    pub fn with_denominator(mut self, denominator: u32) -> Self {
        self.time_division.denominator = denominator.max(1);
        self
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn time_division(&self) -> TimeDivision {
        self.time_division
    }

    pub fn current(&self) -> &Cell {
        &self.cells[self.index]
    }

    pub fn current_mut(&mut self) -> &mut Cell {
        &mut self.cells[self.index]
    }

    /// Rewind to the first cell and start it
    pub fn play(&mut self) {
        self.reset();
        self.cells[self.index].play();
    }

    /// Rewind to the first cell and stop everything
    pub fn reset(&mut self) {
        self.index = 0;
        for cell in &mut self.cells {
            cell.stop();
        }
    }

    /// Step to the next cell. Earlier cells keep playing until the row
    /// wraps around, which restarts the whole row.
    pub fn next(&mut self) {
        self.index = (self.index + 1) % self.cells.len();
        if self.index == 0 {
            self.play();
        } else {
            self.cells[self.index].play();
        }
    }

    /// Jump to `index`; negative values count from the end.
    pub fn change_index(&mut self, index: isize) {
        let len = self.cells.len() as isize;
        self.index = index.rem_euclid(len) as usize;
    }

    /// Change the step length. The row grows or shrinks to `numerator` cells.
    pub fn set_time_division(&mut self, numerator: usize, denominator: u32) {
        let numerator = numerator.max(1);
        self.cells.resize_with(numerator, Cell::new);
        self.time_division = TimeDivision {
            numerator,
            denominator: denominator.max(1),
        };
        if self.index >= numerator {
            self.index = 0;
        }
    }

    /// Build a row from already prepared parts
    pub(crate) fn from_parts(cells: Vec<Cell>, denominator: u32) -> Self {
        Self::new(cells).with_denominator(denominator)
    }
}

/// All rows of the drum machine.
#[derive(Debug, Default)]
pub struct Grid {
    sequences: Vec<Sequence>,
}

impl Grid {
    pub fn new(sequences: Vec<Sequence>) -> Self {
        Self { sequences }
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    pub fn sequence(&self, row: usize) -> EngineResult<&Sequence> {
        self.sequences
            .get(row)
            .ok_or(EngineError::SequenceOutOfRange(row))
    }

    pub fn sequence_mut(&mut self, row: usize) -> EngineResult<&mut Sequence> {
        self.sequences
            .get_mut(row)
            .ok_or(EngineError::SequenceOutOfRange(row))
    }

    /// Append a row with a single empty cell; returns its index
    pub fn add_sequence(&mut self) -> usize {
        self.push_sequence(Sequence::default())
    }

    pub fn push_sequence(&mut self, sequence: Sequence) -> usize {
        self.sequences.push(sequence);
        self.sequences.len() - 1
    }

    pub fn remove_sequence(&mut self, row: usize) -> EngineResult<Sequence> {
        if row >= self.sequences.len() {
            return Err(EngineError::SequenceOutOfRange(row));
        }
        Ok(self.sequences.remove(row))
    }

    pub fn play(&mut self) {
        for sequence in &mut self.sequences {
            sequence.play();
        }
    }

    pub fn stop(&mut self) {
        for sequence in &mut self.sequences {
            sequence.reset();
        }
    }

    pub fn next(&mut self, row: usize) -> EngineResult<()> {
        self.sequence_mut(row)?.next();
        Ok(())
    }

    pub fn cells_mut(&mut self) -> impl Iterator<Item = &mut Cell> {
        self.sequences
            .iter_mut()
            .flat_map(|s| s.cells.iter_mut())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickCount {
    pub physics: u32,
    pub modulation: u32,
}

/// Turns elapsed wall time into whole physics and modulation ticks.
#[derive(Debug, Clone)]
pub struct TickClock {
    physics_step_ms: f64,
    modulation_step_ms: f64,
    physics_elapsed: f64,
    modulation_elapsed: f64,
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new(DEFAULT_PHYSICS_TICK_MS, DEFAULT_MODULATION_TICK_MS)
    }
}

impl TickClock {
    pub fn new(physics_step_ms: f64, modulation_step_ms: f64) -> Self {
        Self {
            physics_step_ms: physics_step_ms.max(f64::EPSILON),
            modulation_step_ms: modulation_step_ms.max(f64::EPSILON),
            physics_elapsed: 0.0,
            modulation_elapsed: 0.0,
        }
    }

    pub fn physics_step_ms(&self) -> f64 {
        self.physics_step_ms
    }

    pub fn modulation_step_ms(&self) -> f64 {
        self.modulation_step_ms
    }

    pub fn advance(&mut self, elapsed_ms: f64) -> TickCount {
        if elapsed_ms.is_nan() || elapsed_ms <= 0.0 {
            return TickCount::default();
        }
        TickCount {
            physics: drain(&mut self.physics_elapsed, elapsed_ms, self.physics_step_ms),
            modulation: drain(&mut self.modulation_elapsed, elapsed_ms, self.modulation_step_ms),
        }
    }

    pub fn reset(&mut self) {
        self.physics_elapsed = 0.0;
        self.modulation_elapsed = 0.0;
    }
}

// keep the remainder to avoid drift
fn drain(accumulator: &mut f64, elapsed_ms: f64, step_ms: f64) -> u32 {
    *accumulator += elapsed_ms;
    let mut ticks = 0;
    while *accumulator >= step_ms {
        *accumulator -= step_ms;
        ticks += 1;
        if ticks == MAX_TICKS_PER_ADVANCE {
            log::warn!("tick clock fell behind, dropping {:.1} ms", *accumulator);
            *accumulator = 0.0;
            break;
        }
    }
    ticks
}

/// Fans the cell ticks out over a whole grid and steps its rows on the beat.
#[derive(Debug, Clone)]
pub struct GridScheduler {
    cell_scheduler: CellScheduler,
    clock: TickClock,
    bpm: f64,
    row_elapsed: Vec<f64>,
}

impl GridScheduler {
    pub fn new(cell_scheduler: CellScheduler, clock: TickClock) -> Self {
        Self {
            cell_scheduler,
            clock,
            bpm: DEFAULT_BPM,
            row_elapsed: Vec::new(),
        }
    }

    pub fn with_bpm(mut self, bpm: f64) -> Self {
        self.set_bpm(bpm);
        self
    }

    pub fn set_bpm(&mut self, bpm: f64) {
        self.bpm = if bpm > 0.0 { bpm } else { DEFAULT_BPM };
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn cell_scheduler(&self) -> &CellScheduler {
        &self.cell_scheduler
    }

    pub fn play(&mut self, grid: &mut Grid) {
        self.clock.reset();
        self.row_elapsed = vec![0.0; grid.len()];
        grid.play();
    }

    pub fn stop(&mut self, grid: &mut Grid) {
        self.clock.reset();
        self.row_elapsed.clear();
        grid.stop();
    }

    pub fn tick_physics(&self, grid: &mut Grid) {
        let constants = self.cell_scheduler.constants.snapshot();
        for cell in grid.cells_mut() {
            cell.tick_physics(&constants, &self.cell_scheduler.resolver);
        }
    }

    pub fn tick_modulation(&self, grid: &mut Grid) {
        for cell in grid.cells_mut() {
            self.cell_scheduler.tick_modulation(cell);
        }
    }

    /// Let `elapsed_ms` of wall time pass: step rows that reached their
    /// next beat, then run the physics and modulation ticks that fell due.
    pub fn advance(&mut self, grid: &mut Grid, elapsed_ms: f64) -> TickCount {
        if !elapsed_ms.is_finite() || elapsed_ms <= 0.0 {
            if !elapsed_ms.is_finite() {
                log::warn!("ignoring non-finite elapsed time {elapsed_ms}");
            }
            return TickCount::default();
        }

        self.row_elapsed.resize(grid.len(), 0.0);
        for (row, sequence) in grid.sequences.iter_mut().enumerate() {
            let interval = step_interval_ms(self.bpm, sequence.time_division.denominator);
            let elapsed = &mut self.row_elapsed[row];
            *elapsed += elapsed_ms;
            let mut steps = 0;
            while *elapsed >= interval {
                *elapsed -= interval;
                sequence.next();
                crate::debug_print!("row {row} stepped to cell {}", sequence.index());
                steps += 1;
                if steps == MAX_TICKS_PER_ADVANCE {
                    log::warn!("row {row} fell behind, dropping {:.1} ms", *elapsed);
                    *elapsed = 0.0;
                    break;
                }
            }
        }

        let ticks = self.clock.advance(elapsed_ms);
        for _ in 0..ticks.physics {
            self.tick_physics(grid);
        }
        for _ in 0..ticks.modulation {
            self.tick_modulation(grid);
        }
        ticks
    }
}
