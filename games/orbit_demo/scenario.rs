use anyhow::{Context, Result};
use glam::DVec2;
use gravdrum::engine::{
    Body, Cell, EngineConfig, Grid, LoggingModule, RandomSource, Sequence, SharedConstants,
    TrajectorySynthesizer,
};
use serde::Deserialize;

fn default_denominator() -> u32 {
    4
}

fn default_shot() -> String {
    "free-fall".to_string()
}

/// Initial state of one body and the way it is launched.
#[derive(Deserialize, Debug, Clone)]
pub struct BodyConfig {
    pub x: f64,
    pub y: f64,
    pub radius: Option<f64>, // random default radius when left out
    #[serde(default = "default_shot")]
    pub shot: String,
    pub note: Option<String>,
    #[serde(default)]
    pub step_triggered: bool,
    #[serde(default)]
    pub muted: bool,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct CellConfig {
    pub attractor_note: Option<String>,
    #[serde(default)]
    pub mute_attractor: bool,
    #[serde(default)]
    pub bodies: Vec<BodyConfig>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RowConfig {
    #[serde(default = "default_denominator")]
    pub denominator: u32,
    pub cells: Vec<CellConfig>,
}

/// Top-level scenario loaded from YAML
#[derive(Deserialize, Debug, Clone)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    pub rows: Vec<RowConfig>,
}

impl ScenarioConfig {
    pub fn build_grid(&self, shared: &SharedConstants, rng: &mut dyn RandomSource) -> Result<Grid> {
        let synthesizer: TrajectorySynthesizer = self.engine.synthesizer(shared.clone());
        let mut grid = Grid::default();

        for (row, row_config) in self.rows.iter().enumerate() {
            let cells = row_config
                .cells
                .iter()
                .enumerate()
                .map(|(index, cell_config)| build_cell(row, index, cell_config, &synthesizer, rng))
                .collect::<Result<Vec<_>>>()?;
            grid.push_sequence(Sequence::new(cells).with_denominator(row_config.denominator));
        }

        Ok(grid)
    }
}

fn build_cell(
    row: usize,
    index: usize,
    config: &CellConfig,
    synthesizer: &TrajectorySynthesizer,
    rng: &mut dyn RandomSource,
) -> Result<Cell> {
    let mut cell = Cell::new();
    let label = format!("row {row} cell {index}");

    let attractor = cell.attractor_mut();
    attractor.set_sound(Box::new(LoggingModule::new(&format!("{label} attractor"))));
    if let Some(note) = &config.attractor_note {
        attractor.note = note.clone();
    }
    if config.mute_attractor {
        cell.toggle_attractor_mute();
    }

    for (n, body_config) in config.bodies.iter().enumerate() {
        let position = DVec2::new(body_config.x, body_config.y);
        let id = match body_config.radius {
            Some(radius) => cell.place_body(position, radius),
            None => cell.place_random_body(position, rng),
        }
        .with_context(|| format!("{label}: cannot place body {n}"))?;

        let body: &mut Body = cell
            .body_mut(id)
            .with_context(|| format!("{label}: body {n} vanished after placement"))?;
        body.set_sound(Box::new(LoggingModule::new(&format!("{label} body {n}"))));
        if let Some(note) = &body_config.note {
            body.note = note.clone();
        }
        body.flags.step_triggered = body_config.step_triggered;
        body.flags.muted = body_config.muted;

        cell.launch_body(id, &body_config.shot, synthesizer, rng)
            .with_context(|| format!("{label}: cannot launch body {n}"))?;
    }

    Ok(cell)
}
