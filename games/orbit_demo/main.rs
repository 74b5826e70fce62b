use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use gravdrum::engine::{toggle_collision_debug, toggle_debug_text, SharedConstants, TickCount};

use crate::scenario::ScenarioConfig;

pub mod scenario;

#[derive(Parser, Debug)]
#[command(about = "Run a gravdrum grid headless and log every hit")]
struct Args {
    /// Scenario file, looked up in `scenarios/` when not found as given
    #[arg(short, long, default_value = "default.yaml")]
    scenario: String,

    /// How much simulated time to run
    #[arg(short, long, default_value_t = 8000.0)]
    duration_ms: f64,

    /// Host frame length fed to the scheduler
    #[arg(long, default_value_t = 16.0)]
    frame_ms: f64,

    /// Gravity multiplier applied halfway through the run
    #[arg(long)]
    late_g: Option<f64>,

    /// Turn on debug text and collision logging
    #[arg(long)]
    debug: bool,

    /// Write the initial grid state to this file
    #[arg(long)]
    export: Option<PathBuf>,
}

fn load_scenario(name: &str) -> Result<ScenarioConfig> {
    let mut path = PathBuf::from(name);
    if !path.exists() {
        path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(name);
    }
    let file = File::open(&path).with_context(|| format!("opening {}", path.display()))?;
    let scenario = serde_yaml::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(scenario)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.debug {
        toggle_debug_text();
        toggle_collision_debug();
    }

    let scenario = load_scenario(&args.scenario)?;
    let config = scenario.engine.clone();
    let shared = SharedConstants::new(config.constants());
    let mut rng = config.random_source();
    let mut grid = scenario.build_grid(&shared, rng.as_mut())?;

    if let Some(path) = &args.export {
        grid.export_state()
            .save(path)
            .with_context(|| format!("exporting to {}", path.display()))?;
        log::info!("exported initial state to {}", path.display());
    }

    let mut scheduler = config.grid_scheduler(shared.clone());
    scheduler.play(&mut grid);

    let mut total = TickCount::default();
    let mut elapsed = 0.0;
    let mut switched = false;
    while elapsed < args.duration_ms {
        if let Some(g) = args.late_g {
            if !switched && elapsed >= args.duration_ms / 2.0 {
                shared.set_multipliers(g, config.physics.friction_multiplier);
                log::info!("gravity multiplier now {g}");
                switched = true;
            }
        }

        let ticks = scheduler.advance(&mut grid, args.frame_ms);
        total.physics += ticks.physics;
        total.modulation += ticks.modulation;
        elapsed += args.frame_ms;
    }

    log::info!(
        "ran {:.0} ms: {} physics ticks, {} modulation ticks",
        elapsed,
        total.physics,
        total.modulation
    );
    for (row, sequence) in grid.sequences().iter().enumerate() {
        for (index, cell) in sequence.cells().iter().enumerate() {
            let stats = cell.stats();
            log::info!(
                "row {row} cell {index}: {} bodies, {} free, kinetic energy {:.3e}{}",
                stats.bodies,
                stats.free_bodies,
                stats.kinetic_energy,
                if stats.playing { " (playing)" } else { "" }
            );
        }
    }

    scheduler.stop(&mut grid);
    Ok(())
}
